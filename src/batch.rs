//! Per-(symbol, timeframe) jobs
//!
//! A job runs the full pipeline on one bar series: swings, optional tuning,
//! scan, optional backtest and optional walk-forward. Jobs share nothing, so
//! [`run_jobs`] fans them out with rayon; results come back in input order.

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::backtest::{run_backtest, BacktestConfig, BacktestReport};
use crate::rank::{rank_results, JobMetrics, RankedItem};
use crate::signals::{generate_signal, Signal};
use crate::swing::SwingSource;
use crate::walkforward::{WalkForwardConfig, WalkForwardResult};
use crate::wave::{tune_wave_options, ScanTrace, TuneGrid, WaveOptions, WavePattern};
use crate::{ImpulseEngine, Result, WaveError, OHLCV};

/// One bar series to process
#[derive(Debug, Clone, Copy)]
pub struct JobSpec<'a, T> {
    pub symbol: &'a str,
    pub timeframe: &'a str,
    pub bars: &'a [T],
}

impl<'a, T> JobSpec<'a, T> {
    pub fn new(symbol: &'a str, timeframe: &'a str, bars: &'a [T]) -> Self {
        Self {
            symbol,
            timeframe,
            bars,
        }
    }
}

/// Optional stages of a job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobOptions {
    pub backtest: Option<BacktestConfig>,
    /// Only runs together with a backtest
    pub walk_forward: Option<WalkForwardConfig>,
    /// Tune wave options on the job's swings before scanning
    pub auto_tune: Option<TuneGrid>,
}

impl JobOptions {
    #[must_use]
    pub fn with_backtest(mut self, cfg: BacktestConfig) -> Self {
        self.backtest = Some(cfg);
        self
    }

    #[must_use]
    pub fn with_walk_forward(mut self, cfg: WalkForwardConfig) -> Self {
        self.walk_forward = Some(cfg);
        self
    }

    #[must_use]
    pub fn with_auto_tune(mut self, grid: TuneGrid) -> Self {
        self.auto_tune = Some(grid);
        self
    }
}

/// Output of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub symbol: String,
    pub timeframe: String,
    pub bars: usize,
    pub swings: usize,
    pub patterns: Vec<WavePattern>,
    pub best_score: f64,
    pub best_conf: f64,
    pub tuned: bool,
    /// Wave options the scan actually used
    pub options: WaveOptions,
    pub trace: ScanTrace,
    pub backtest: Option<BacktestReport>,
    pub walk_forward: Option<WalkForwardResult>,
}

impl JobResult {
    /// Ranker input; backtest fields are zero when no backtest ran.
    pub fn metrics(&self) -> JobMetrics {
        let mut m = self.backtest.as_ref().map(JobMetrics::from).unwrap_or_default();
        m.wf_score = self.walk_forward.as_ref().map(|wf| wf.score);
        m
    }

    pub fn signal(&self, min_score: f64) -> Signal {
        generate_signal(&self.patterns, min_score)
    }
}

/// Failed job
#[derive(Debug, Clone)]
pub struct JobError {
    pub symbol: String,
    pub timeframe: String,
    pub error: WaveError,
}

/// Run the pipeline for one job.
pub fn run_job<S, T>(engine: &ImpulseEngine<S>, job: &JobSpec<'_, T>, opts: &JobOptions) -> Result<JobResult>
where
    S: SwingSource + Clone,
    T: OHLCV,
{
    debug!(
        symbol = job.symbol,
        timeframe = job.timeframe,
        bars = job.bars.len(),
        auto_tune = opts.auto_tune.is_some(),
        backtest = opts.backtest.is_some(),
        walk_forward = opts.walk_forward.is_some(),
        "job start"
    );

    if engine.config().validate_data {
        engine.validate_bars(job.bars)?;
    }
    let swings = engine.swings(job.bars);

    let engine = match &opts.auto_tune {
        Some(grid) => {
            let tuned = tune_wave_options(&swings, engine.options(), grid)?;
            engine.with_options(tuned.options)?
        }
        None => engine.clone(),
    };

    let outcome = engine.scan_swings(&swings);
    let (best_score, best_conf) = outcome.best_score_conf();

    let backtest = match &opts.backtest {
        Some(cfg) => {
            cfg.validate()?;
            Some(run_backtest(&outcome.patterns, job.bars, cfg).report)
        }
        None => None,
    };

    let walk_forward = match (&opts.backtest, &opts.walk_forward) {
        (Some(bt), Some(wf)) => Some(engine.walk_forward(job.bars, bt, wf)?),
        _ => None,
    };

    debug!(
        symbol = job.symbol,
        timeframe = job.timeframe,
        swings = swings.len(),
        patterns = outcome.patterns.len(),
        best_score,
        best_conf,
        wf_score = walk_forward.as_ref().map_or(0.0, |wf| wf.score),
        "job done"
    );

    Ok(JobResult {
        symbol: job.symbol.to_string(),
        timeframe: job.timeframe.to_string(),
        bars: job.bars.len(),
        swings: swings.len(),
        patterns: outcome.patterns,
        best_score,
        best_conf,
        tuned: opts.auto_tune.is_some(),
        options: *engine.options(),
        trace: outcome.trace,
        backtest,
        walk_forward,
    })
}

/// Run jobs in parallel.
///
/// Successes and failures are each returned in input order.
pub fn run_jobs<S, T>(
    engine: &ImpulseEngine<S>,
    jobs: &[JobSpec<'_, T>],
    opts: &JobOptions,
) -> (Vec<JobResult>, Vec<JobError>)
where
    S: SwingSource + Clone,
    T: OHLCV + Sync,
{
    let results: Vec<_> = jobs
        .par_iter()
        .map(|job| {
            run_job(engine, job, opts).map_err(|error| JobError {
                symbol: job.symbol.to_string(),
                timeframe: job.timeframe.to_string(),
                error,
            })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

/// Rank finished jobs by composite score.
pub fn rank_jobs(results: &[JobResult], top: usize, oos_weight: f64) -> Vec<RankedItem> {
    rank_results(
        results
            .iter()
            .map(|r| (r.symbol.as_str(), r.timeframe.as_str(), r.metrics())),
        top,
        oos_weight,
    )
}
