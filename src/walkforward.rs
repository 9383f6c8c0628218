//! Walk-forward robustness evaluation
//!
//! The same rule set is rerun on several sub-windows of a series and the
//! per-window returns are aggregated into one robustness score. Nothing is
//! fitted: train windows are reported for each out-of-sample fold but do not
//! feed the pipeline.
//!
//! # Modes
//!
//! - `Stability`: contiguous, non-overlapping segments covering the series
//! - `Expanding`: fixed-size test windows after a train window anchored at 0
//! - `Rolling`: fixed-size test windows after a fixed-size train window

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::wave::helpers::logistic;

const MIN_SPLITS: usize = 2;
const MAX_SPLITS: usize = 20;

// ============================================================
// CONFIG
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum WalkForwardMode {
    #[default]
    Stability,
    Expanding,
    Rolling,
}

impl From<&str> for WalkForwardMode {
    /// Unknown modes fall back to `Stability`.
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "expanding" => WalkForwardMode::Expanding,
            "rolling" => WalkForwardMode::Rolling,
            _ => WalkForwardMode::Stability,
        }
    }
}

impl From<String> for WalkForwardMode {
    fn from(s: String) -> Self {
        WalkForwardMode::from(s.as_str())
    }
}

/// Walk-forward settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    pub mode: WalkForwardMode,
    /// Requested fold count, clamped to 2..=20
    pub splits: usize,
    /// Minimum bars per fold
    pub min_bars: usize,
    pub train_bars: Option<usize>,
    pub test_bars: Option<usize>,
    pub step_bars: Option<usize>,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            mode: WalkForwardMode::Stability,
            splits: 3,
            min_bars: 200,
            train_bars: None,
            test_bars: None,
            step_bars: None,
        }
    }
}

impl WalkForwardConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: WalkForwardMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_splits(mut self, splits: usize) -> Self {
        self.splits = splits;
        self
    }

    #[must_use]
    pub fn with_min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = min_bars;
        self
    }

    /// Explicit train/test/step sizes for the out-of-sample modes
    #[must_use]
    pub fn with_windows(mut self, train: Option<usize>, test: Option<usize>, step: Option<usize>) -> Self {
        self.train_bars = train;
        self.test_bars = test;
        self.step_bars = step;
        self
    }
}

// ============================================================
// RESULTS
// ============================================================

/// One evaluated window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fold {
    pub start_idx: usize,
    pub end_idx: usize,
    pub ret: f64,
    /// Train window preceding the fold (out-of-sample modes only)
    pub train: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub mode: WalkForwardMode,
    /// Folds actually evaluated
    pub splits: usize,
    pub pos_frac: f64,
    pub ret_mean: f64,
    /// Population standard deviation of fold returns
    pub ret_std: f64,
    pub score: f64,
    pub folds: Vec<Fold>,
    pub test_bars: usize,
    pub train_bars: usize,
    pub step_bars: usize,
}

impl WalkForwardResult {
    pub fn fold_returns(&self) -> Vec<f64> {
        self.folds.iter().map(|f| f.ret).collect()
    }
}

// ============================================================
// PLANNING
// ============================================================

/// Window to evaluate, before it has a return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldWindow {
    pub test: Range<usize>,
    pub train: Option<Range<usize>>,
}

/// Windows and resolved sizes for a series of `n` bars
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldPlan {
    pub mode: WalkForwardMode,
    pub windows: Vec<FoldWindow>,
    pub test_bars: usize,
    pub train_bars: usize,
    pub step_bars: usize,
}

/// Lay out the folds for a series of `n` bars.
pub fn plan_folds(n: usize, cfg: &WalkForwardConfig) -> FoldPlan {
    if n == 0 {
        return FoldPlan {
            mode: cfg.mode,
            ..FoldPlan::default()
        };
    }

    let splits = cfg.splits.clamp(MIN_SPLITS, MAX_SPLITS);
    let min_bars = cfg.min_bars;
    let test_bars = cfg.test_bars.unwrap_or((n / splits).max(min_bars)).max(1);
    let step_bars = cfg.step_bars.unwrap_or(test_bars).max(1);
    let train_bars = cfg.train_bars.unwrap_or(min_bars.max(test_bars.saturating_mul(2)));

    let mut windows = Vec::new();
    match cfg.mode {
        WalkForwardMode::Stability => {
            let seg = (n / splits).max(min_bars).max(1);
            let count = (n / seg).clamp(MIN_SPLITS, MAX_SPLITS);
            for k in 0..count {
                let start = k * seg;
                let end = n.min((k + 1) * seg);
                if end <= start || end - start < min_bars {
                    continue;
                }
                windows.push(FoldWindow {
                    test: start..end,
                    train: None,
                });
            }
        },
        WalkForwardMode::Expanding | WalkForwardMode::Rolling => {
            let mut train_end = train_bars.max(min_bars);
            loop {
                let test_end = train_end.saturating_add(test_bars);
                if test_end > n {
                    break;
                }
                let train_start = match cfg.mode {
                    WalkForwardMode::Rolling => train_end.saturating_sub(train_bars),
                    _ => 0,
                };
                windows.push(FoldWindow {
                    test: train_end..test_end,
                    train: Some(train_start..train_end),
                });
                train_end += step_bars;
            }
        },
    }

    FoldPlan {
        mode: cfg.mode,
        windows,
        test_bars,
        train_bars,
        step_bars,
    }
}

// ============================================================
// EVALUATION
// ============================================================

/// `0.55 * logistic(3 (p - 0.5)) + 0.45 * logistic(1.5 mu / max(sd, 1e-9))`
pub fn robustness_score(pos_frac: f64, ret_mean: f64, ret_std: f64) -> f64 {
    let sharpe_like = ret_mean / ret_std.max(1e-9);
    0.55 * logistic(3.0 * (pos_frac - 0.5)) + 0.45 * logistic(1.5 * sharpe_like)
}

/// Evaluate every planned fold with `run`, which receives the fold's bar
/// range and returns its total return.
pub fn walk_forward_with<F>(n: usize, cfg: &WalkForwardConfig, mut run: F) -> WalkForwardResult
where
    F: FnMut(Range<usize>) -> f64,
{
    let plan = plan_folds(n, cfg);
    debug!(n, mode = ?plan.mode, folds = plan.windows.len(), test_bars = plan.test_bars, "walk-forward start");

    let folds: Vec<Fold> = plan
        .windows
        .iter()
        .map(|w| {
            let ret = run(w.test.clone());
            debug!(start = w.test.start, end = w.test.end, ret, "walk-forward fold");
            Fold {
                start_idx: w.test.start,
                end_idx: w.test.end,
                ret,
                train: w.train.as_ref().map(|t| (t.start, t.end)),
            }
        })
        .collect();

    let mut result = WalkForwardResult {
        mode: plan.mode,
        test_bars: plan.test_bars,
        train_bars: plan.train_bars,
        step_bars: plan.step_bars,
        ..WalkForwardResult::default()
    };
    if folds.is_empty() {
        return result;
    }

    let k = folds.len() as f64;
    let mu = folds.iter().map(|f| f.ret).sum::<f64>() / k;
    let sd = (folds.iter().map(|f| (f.ret - mu).powi(2)).sum::<f64>() / k).sqrt();
    let pos = folds.iter().filter(|f| f.ret > 0.0).count() as f64 / k;

    result.splits = folds.len();
    result.pos_frac = pos;
    result.ret_mean = mu;
    result.ret_std = sd;
    result.score = robustness_score(pos, mu, sd);
    result.folds = folds;

    debug!(splits = result.splits, score = result.score, "walk-forward done");
    result
}

// ============================================================
// TESTS
// ============================================================
