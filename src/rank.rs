//! Composite ranking of (symbol, timeframe) jobs
//!
//! Each job gets an in-sample score from its backtest and, when available, is
//! blended with its walk-forward score. Both parts live in `0.0..=1.0`.

use serde::{Deserialize, Serialize};

use crate::backtest::BacktestReport;
use crate::wave::helpers::logistic;

/// Default weight of the walk-forward score in the blend
pub const DEFAULT_OOS_WEIGHT: f64 = 0.60;

/// Profit factor above this adds nothing
const PF_CAP: f64 = 40.0;

/// Metrics the ranker reads from one job
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    #[serde(with = "crate::float_serde")]
    pub profit_factor: f64,
    #[serde(with = "crate::float_serde")]
    pub sharpe_like: f64,
    /// Walk-forward robustness score, when walk-forward ran
    pub wf_score: Option<f64>,
}

impl From<&BacktestReport> for JobMetrics {
    fn from(r: &BacktestReport) -> Self {
        Self {
            total_return: r.total_return,
            max_drawdown: r.max_drawdown,
            profit_factor: r.profit_factor,
            sharpe_like: r.sharpe_like,
            wf_score: None,
        }
    }
}

impl JobMetrics {
    #[must_use]
    pub fn with_wf_score(mut self, score: f64) -> Self {
        self.wf_score = Some(score);
        self
    }
}

/// Backtest-only part of the composite score
pub fn in_sample_score(m: &JobMetrics) -> f64 {
    let ret = m.total_return.max(0.0);
    let mdd = m.max_drawdown.max(0.0);
    let pf = m.profit_factor.max(0.0).min(PF_CAP);

    let s_ret = 1.0 - (-2.0 * ret).exp();
    let s_mdd = 1.0 / (1.0 + 10.0 * mdd);
    let s_pf = 1.0 - (-0.15 * pf).exp();
    let s_sh = logistic(1.2 * m.sharpe_like);

    0.35 * s_ret + 0.25 * s_mdd + 0.25 * s_pf + 0.15 * s_sh
}

/// In-sample score, blended with the walk-forward score when present.
///
/// Both the walk-forward score and `oos_weight` are clamped to `0.0..=1.0`.
pub fn composite_score(m: &JobMetrics, oos_weight: f64) -> f64 {
    let in_sample = in_sample_score(m);
    match m.wf_score {
        None => in_sample,
        Some(wf) => {
            let wf = wf.clamp(0.0, 1.0);
            let w = oos_weight.clamp(0.0, 1.0);
            (1.0 - w) * in_sample + w * wf
        }
    }
}

/// Ranked job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub symbol: String,
    pub timeframe: String,
    pub score: f64,
    pub metrics: JobMetrics,
}

/// Score every job and keep the best `top`, best first.
///
/// Equal scores keep input order.
pub fn rank_results<I, S, T>(results: I, top: usize, oos_weight: f64) -> Vec<RankedItem>
where
    I: IntoIterator<Item = (S, T, JobMetrics)>,
    S: Into<String>,
    T: Into<String>,
{
    let mut items: Vec<RankedItem> = results
        .into_iter()
        .map(|(symbol, timeframe, metrics)| RankedItem {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            score: composite_score(&metrics, oos_weight),
            metrics,
        })
        .collect();
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items.truncate(top);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(ret: f64, mdd: f64, pf: f64, sharpe: f64) -> JobMetrics {
        JobMetrics {
            total_return: ret,
            max_drawdown: mdd,
            profit_factor: pf,
            sharpe_like: sharpe,
            wf_score: None,
        }
    }

    #[test]
    fn test_in_sample_zero_metrics() {
        // only the drawdown (1.0) and sharpe (0.5) terms contribute
        let s = in_sample_score(&JobMetrics::default());
        assert!((s - (0.25 + 0.15 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_in_sample_clamps_inputs() {
        let negative = in_sample_score(&metrics(-0.5, -0.1, -3.0, 0.0));
        assert!((negative - in_sample_score(&JobMetrics::default())).abs() < 1e-12);

        let capped = in_sample_score(&metrics(0.0, 0.0, f64::INFINITY, 0.0));
        let at_cap = in_sample_score(&metrics(0.0, 0.0, 40.0, 0.0));
        assert_eq!(capped, at_cap);
    }

    #[test]
    fn test_in_sample_bounds() {
        let best = in_sample_score(&metrics(100.0, 0.0, f64::INFINITY, f64::INFINITY));
        assert!(best <= 1.0 && best > 0.99);
    }

    #[test]
    fn test_composite_blend() {
        let m = metrics(0.2, 0.1, 2.0, 1.0);
        let is = in_sample_score(&m);

        assert_eq!(composite_score(&m, DEFAULT_OOS_WEIGHT), is);
        let blended = composite_score(&m.with_wf_score(0.8), DEFAULT_OOS_WEIGHT);
        assert!((blended - (0.4 * is + 0.6 * 0.8)).abs() < 1e-12);
        // wf score and weight are clamped
        assert_eq!(composite_score(&m.with_wf_score(3.0), 2.0), 1.0);
    }

    #[test]
    fn test_rank_results_sorted_and_truncated() {
        let jobs = vec![
            ("AAA", "1h", metrics(0.0, 0.5, 0.0, -1.0)),
            ("BBB", "1h", metrics(0.5, 0.05, 3.0, 2.0)),
            ("CCC", "4h", metrics(0.1, 0.1, 1.5, 0.5)),
        ];
        let ranked = rank_results(jobs, 2, DEFAULT_OOS_WEIGHT);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].symbol, "BBB");
        assert_eq!(ranked[1].symbol, "CCC");
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let m = metrics(0.1, 0.1, 1.0, 0.0);
        let jobs = vec![("X", "1d", m), ("Y", "1d", m), ("Z", "1d", m)];
        let ranked = rank_results(jobs, 10, DEFAULT_OOS_WEIGHT);
        let order: Vec<&str> = ranked.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["X", "Y", "Z"]);
        assert!(rank_results(Vec::<(String, String, JobMetrics)>::new(), 5, 0.6).is_empty());
    }

    #[test]
    fn test_ranked_item_json_keeps_infinite_profit_factor() {
        let ranked = rank_results(vec![("AAA", "1h", metrics(0.2, 0.0, f64::INFINITY, 1.0))], 1, 0.0);

        let json = serde_json::to_value(&ranked[0]).unwrap();
        assert_eq!(json["metrics"]["profit_factor"], "inf");
        assert_eq!(json["metrics"]["sharpe_like"], 1.0);

        let back: RankedItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, ranked[0]);
    }
}
