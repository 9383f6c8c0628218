//! Backtest, walk-forward and ranking on hand-built inputs.

use ewscan::backtest::{max_drawdown, profit_factor};
use ewscan::prelude::*;
use ewscan::walkforward::{plan_folds, robustness_score, walk_forward_with};
use ewscan::wave::IMPULSE;

/// Up-leg-first pattern from 100 to `end` over bars 0..50
fn pattern(end: f64, confidence: f64) -> WavePattern {
    let prices = [100.0, 110.0, 105.0, 120.0, 115.0, end];
    WavePattern {
        kind: IMPULSE,
        legs: std::array::from_fn(|i| Leg::new(i * 10, (i + 1) * 10, prices[i], prices[i + 1])),
        meta: PatternMeta {
            score: 5.0,
            confidence,
            w4_overlap: false,
        },
    }
}

fn metrics(ret: f64, mdd: f64, pf: f64, sharpe: f64) -> JobMetrics {
    JobMetrics {
        total_return: ret,
        max_drawdown: mdd,
        profit_factor: pf,
        sharpe_like: sharpe,
        wf_score: None,
    }
}

// ============================================================
// BACKTEST
// ============================================================

#[test]
fn test_win_then_loss() {
    let patterns = [pattern(160.0, 0.9), pattern(90.0, 0.9)];
    let bars: Vec<Bar> = Vec::new();
    let out = run_backtest(&patterns, &bars, &BacktestConfig::default());
    let r = &out.report;

    assert_eq!(r.trades, 2);
    assert_eq!(r.wins, 1);
    assert_eq!(r.winrate, 0.5);
    assert!((r.final_equity - 14_400.0).abs() < 1e-6);
    assert!((r.total_return - 0.44).abs() < 1e-12);
    assert!((r.max_drawdown - 0.1).abs() < 1e-12);
    assert!((r.profit_factor - 6.0).abs() < 1e-9);
    assert!((r.avg_return - 0.25).abs() < 1e-12);
    assert_eq!(r.expectancy, r.avg_return);
    let expected = [10_000.0, 16_000.0, 14_400.0];
    assert_eq!(r.equity_curve.len(), expected.len());
    for (got, want) in r.equity_curve.iter().zip(expected) {
        assert!((got - want).abs() < 1e-6);
    }
}

#[test]
fn test_min_confidence_skips_patterns() {
    let patterns = [pattern(160.0, 0.2), pattern(130.0, 0.8)];
    let bars: Vec<Bar> = Vec::new();
    let cfg = BacktestConfig::default().with_min_confidence(0.5);
    let out = run_backtest(&patterns, &bars, &cfg);

    assert_eq!(out.trades.len(), 1);
    assert_eq!(out.trades[0].pattern_idx, 1);
    assert!((out.report.total_return - 0.3).abs() < 1e-12);
}

#[test]
fn test_no_patterns_keeps_cash() {
    let bars: Vec<Bar> = Vec::new();
    let out = run_backtest(&[], &bars, &BacktestConfig::default().with_initial_cash(500.0));

    assert_eq!(out.report.trades, 0);
    assert_eq!(out.report.final_equity, 500.0);
    assert_eq!(out.report.equity_curve, vec![500.0]);
    assert_eq!(out.report.max_drawdown, 0.0);
    assert_eq!(out.report.profit_factor, 0.0);
    assert_eq!(out.report.sharpe_like, 0.0);
}

#[test]
fn test_metric_helpers() {
    assert_eq!(max_drawdown(&[]), 0.0);
    assert!((max_drawdown(&[100.0, 120.0, 90.0, 130.0]) - 0.25).abs() < 1e-12);
    assert_eq!(profit_factor(&[0.1, 0.2]), f64::INFINITY);
    assert_eq!(profit_factor(&[-0.1, -0.2]), 0.0);
    assert!((profit_factor(&[0.3, -0.1, -0.05]) - 2.0).abs() < 1e-9);
}

#[test]
fn test_invalid_backtest_config_rejected() {
    let engine = EngineBuilder::new().build().unwrap();
    let bars = vec![Bar::flat(0, 100.0)];
    assert!(engine
        .backtest(&bars, &BacktestConfig::default().with_risk_fraction(0.0))
        .is_err());
    assert!(engine
        .backtest(&bars, &BacktestConfig::default().with_costs(-1.0, 0.0))
        .is_err());
}

// ============================================================
// WALK-FORWARD
// ============================================================

#[test]
fn test_short_series_has_no_folds() {
    let engine = EngineBuilder::new().build().unwrap();
    let bars: Vec<Bar> = (0..50).map(|i| Bar::flat(i, 100.0 + i as f64)).collect();
    let wf = engine
        .walk_forward(&bars, &BacktestConfig::default(), &WalkForwardConfig::default())
        .unwrap();

    assert_eq!(wf.splits, 0);
    assert_eq!(wf.score, 0.0);
    assert!(wf.folds.is_empty());
}

#[test]
fn test_stability_folds_are_disjoint() {
    let cfg = WalkForwardConfig::default().with_splits(4).with_min_bars(100);
    let mut seen = Vec::new();
    let result = walk_forward_with(1000, &cfg, |range| {
        seen.push(range.clone());
        0.01
    });

    assert_eq!(result.splits, 4);
    assert_eq!(seen, vec![0..250, 250..500, 500..750, 750..1000]);
    assert_eq!(result.pos_frac, 1.0);
    assert!((result.ret_mean - 0.01).abs() < 1e-15);
    assert_eq!(result.score, robustness_score(1.0, result.ret_mean, result.ret_std));
}

#[test]
fn test_mixed_fold_returns() {
    let cfg = WalkForwardConfig::default().with_splits(4).with_min_bars(10);
    let rets = [0.1, -0.1, 0.1, -0.1];
    let mut k = 0;
    let result = walk_forward_with(400, &cfg, |_| {
        k += 1;
        rets[k - 1]
    });

    assert_eq!(result.fold_returns(), rets.to_vec());
    assert_eq!(result.pos_frac, 0.5);
    assert!(result.ret_mean.abs() < 1e-15);
    assert!((result.ret_std - 0.1).abs() < 1e-12);
    // both logistic terms sit at 0.5
    assert!((result.score - 0.5).abs() < 1e-9);
}

#[test]
fn test_rolling_and_expanding_windows() {
    let cfg = WalkForwardConfig::default()
        .with_mode(WalkForwardMode::Rolling)
        .with_min_bars(200)
        .with_windows(None, Some(100), None);
    let plan = plan_folds(1000, &cfg);

    assert_eq!(plan.windows.len(), 8);
    assert_eq!(plan.windows[0].test, 200..300);
    assert_eq!(plan.windows[0].train, Some(0..200));
    assert_eq!(plan.windows[7].test, 900..1000);
    assert_eq!(plan.windows[7].train, Some(700..900));

    let expanding = plan_folds(1000, &cfg.clone().with_mode(WalkForwardMode::Expanding));
    assert_eq!(expanding.windows[7].train, Some(0..900));

    let result = walk_forward_with(1000, &cfg, |r| if r.start % 200 == 0 { 0.02 } else { -0.01 });
    assert_eq!(result.folds[0].train, Some((0, 200)));
    assert_eq!(result.splits, 8);
    assert_eq!(result.pos_frac, 0.5);
}

// ============================================================
// RANKING
// ============================================================

#[test]
fn test_walk_forward_weight_reorders() {
    let strong_is = metrics(0.5, 0.05, 3.0, 2.0).with_wf_score(0.1);
    let strong_oos = metrics(0.05, 0.2, 1.1, 0.2).with_wf_score(0.9);
    let jobs = || vec![("AAA", "1h", strong_is), ("BBB", "1h", strong_oos)];

    let blended = rank_results(jobs(), 2, 0.6);
    assert_eq!(blended[0].symbol, "BBB");

    let in_sample_only = rank_results(jobs(), 2, 0.0);
    assert_eq!(in_sample_only[0].symbol, "AAA");
    assert_eq!(in_sample_only[0].score, composite_score(&strong_is, 0.0));
}

#[test]
fn test_rank_from_backtest_reports() {
    let bars: Vec<Bar> = Vec::new();
    let good = run_backtest(&[pattern(130.0, 0.9)], &bars, &BacktestConfig::default()).report;
    let bad = run_backtest(&[pattern(80.0, 0.9)], &bars, &BacktestConfig::default()).report;

    let ranked = rank_results(
        vec![
            ("LOSS", "1d", JobMetrics::from(&bad)),
            ("GAIN", "1d", JobMetrics::from(&good)),
        ],
        1,
        0.6,
    );
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].symbol, "GAIN");
    assert_eq!(ranked[0].metrics.total_return, good.total_return);
}
