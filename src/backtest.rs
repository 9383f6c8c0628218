//! Pattern backtest simulator
//!
//! Each accepted pattern becomes one trade from the start of its first leg to
//! the end of its last leg, in the direction of the first leg. Trades are
//! sized off the running equity and taken in the order the patterns are given.
//!
//! # Costs
//!
//! Fees and slippage are charged on entry and exit, so the round-trip cost
//! fraction is `2 * (fee_bps + slippage_bps) / 10_000`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::wave::WavePattern;
use crate::{Ratio, Result, WaveError, OHLCV};

/// Loss sums and deviations below this count as zero
const EPS: f64 = 1e-12;

// ============================================================
// CONFIG
// ============================================================

/// Where trade prices come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum EntryMode {
    /// Leg boundary prices
    #[default]
    Pattern,
    /// Bar closes at the pattern's first and last index
    Bar,
}

impl From<&str> for EntryMode {
    /// Unknown modes fall back to `Pattern`.
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => EntryMode::Bar,
            _ => EntryMode::Pattern,
        }
    }
}

impl From<String> for EntryMode {
    fn from(s: String) -> Self {
        EntryMode::from(s.as_str())
    }
}

/// Backtest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    /// Fraction of equity staked per trade, in (0, 1]
    pub risk_fraction: f64,
    /// Patterns below this confidence are skipped
    pub min_confidence: f64,
    pub entry_mode: EntryMode,
    pub fee_bps: f64,
    pub slippage_bps: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_cash: 10_000.0,
            risk_fraction: 1.0,
            min_confidence: 0.0,
            entry_mode: EntryMode::Pattern,
            fee_bps: 0.0,
            slippage_bps: 0.0,
        }
    }
}

impl BacktestConfig {
    #[must_use]
    pub fn with_initial_cash(mut self, cash: f64) -> Self {
        self.initial_cash = cash;
        self
    }

    #[must_use]
    pub fn with_risk_fraction(mut self, fraction: f64) -> Self {
        self.risk_fraction = fraction;
        self
    }

    #[must_use]
    pub fn with_min_confidence(mut self, confidence: f64) -> Self {
        self.min_confidence = confidence;
        self
    }

    #[must_use]
    pub fn with_entry_mode(mut self, mode: EntryMode) -> Self {
        self.entry_mode = mode;
        self
    }

    /// Set fee and slippage, both in basis points.
    #[must_use]
    pub fn with_costs(mut self, fee_bps: f64, slippage_bps: f64) -> Self {
        self.fee_bps = fee_bps;
        self.slippage_bps = slippage_bps;
        self
    }

    /// Round-trip cost as a fraction of the stake
    #[inline]
    pub fn cost_fraction(&self) -> f64 {
        2.0 * (self.fee_bps + self.slippage_bps) / 10_000.0
    }

    pub fn validate(&self) -> Result<()> {
        if !self.initial_cash.is_finite() || self.initial_cash < 0.0 {
            return Err(WaveError::OutOfRange {
                field: "initial_cash",
                value: self.initial_cash,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        let fraction = Ratio::new(self.risk_fraction)?;
        if fraction.get() <= 0.0 {
            return Err(WaveError::InvalidValue("risk_fraction must be > 0"));
        }
        Ratio::new(self.min_confidence)?;
        for (field, value) in [("fee_bps", self.fee_bps), ("slippage_bps", self.slippage_bps)] {
            if !value.is_finite() || value < 0.0 {
                return Err(WaveError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: f64::INFINITY,
                });
            }
        }
        Ok(())
    }
}

// ============================================================
// RESULTS
// ============================================================

/// One simulated trade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Position of the pattern in the input list
    pub pattern_idx: usize,
    /// +1 long, -1 short
    pub direction: i8,
    pub entry_px: f64,
    pub exit_px: f64,
    /// Signed return after costs
    pub net_return: f64,
    pub pnl: f64,
    pub equity_after: f64,
    pub fees: f64,
    pub slippage: f64,
}

/// Aggregate backtest metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub initial_cash: f64,
    pub final_equity: f64,
    pub trades: usize,
    pub wins: usize,
    pub winrate: f64,
    pub avg_return: f64,
    pub total_return: f64,
    /// Largest fractional decline from a running peak
    pub max_drawdown: f64,
    /// Equity after each trade, starting with `initial_cash`
    pub equity_curve: Vec<f64>,
    /// `inf` when there are gains and no losses
    #[serde(with = "crate::float_serde")]
    pub profit_factor: f64,
    pub expectancy: f64,
    #[serde(with = "crate::float_serde")]
    pub sharpe_like: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub trades: Vec<Trade>,
    pub report: BacktestReport,
}

// ============================================================
// SIMULATION
// ============================================================

/// Close at `idx`, clamped into the series; `None` for an empty series.
fn close_at<T: OHLCV>(bars: &[T], idx: usize) -> Option<f64> {
    let last = bars.len().checked_sub(1)?;
    bars.get(idx.min(last)).map(OHLCV::close)
}

/// Entry and exit price of `pattern` under `mode`
fn trade_prices<T: OHLCV>(pattern: &WavePattern, bars: &[T], mode: EntryMode) -> (f64, f64) {
    let legs = (pattern.start_px(), pattern.end_px());
    match mode {
        EntryMode::Pattern => legs,
        EntryMode::Bar => match (close_at(bars, pattern.start_idx()), close_at(bars, pattern.end_idx())) {
            (Some(entry), Some(exit)) if entry.is_finite() && exit.is_finite() => (entry, exit),
            _ => legs,
        },
    }
}

/// Simulate one trade per accepted pattern.
///
/// Patterns below `min_confidence` or with a non-positive entry or exit price
/// are skipped. `bars` is only read in [`EntryMode::Bar`].
pub fn run_backtest<T: OHLCV>(patterns: &[WavePattern], bars: &[T], cfg: &BacktestConfig) -> BacktestOutcome {
    debug!(
        patterns = patterns.len(),
        bars = bars.len(),
        fee_bps = cfg.fee_bps,
        slippage_bps = cfg.slippage_bps,
        entry_mode = ?cfg.entry_mode,
        "backtest start"
    );

    let fb = cfg.fee_bps / 10_000.0;
    let sb = cfg.slippage_bps / 10_000.0;
    let cost = cfg.cost_fraction();

    let mut equity = cfg.initial_cash;
    let mut curve = vec![equity];
    let mut trades: Vec<Trade> = Vec::new();
    let mut rets: Vec<f64> = Vec::new();
    let mut wins = 0usize;

    for (i, p) in patterns.iter().enumerate() {
        if p.meta.confidence < cfg.min_confidence {
            continue;
        }
        let direction: i8 = if p.legs[0].end_px - p.legs[0].start_px >= 0.0 { 1 } else { -1 };

        let (entry, exit) = trade_prices(p, bars, cfg.entry_mode);
        if !(entry > 0.0 && exit > 0.0) {
            continue;
        }

        let gross = (exit - entry) / entry * f64::from(direction);
        let net = gross - cost;
        let stake = equity * cfg.risk_fraction;
        let pnl = stake * net;
        equity += pnl;

        trades.push(Trade {
            pattern_idx: i,
            direction,
            entry_px: entry,
            exit_px: exit,
            net_return: net,
            pnl,
            equity_after: equity,
            fees: stake * 2.0 * fb,
            slippage: stake * 2.0 * sb,
        });
        curve.push(equity);
        rets.push(net);
        if net > 0.0 {
            wins += 1;
        }
    }

    let avg_return = mean(&rets);
    let report = BacktestReport {
        initial_cash: cfg.initial_cash,
        final_equity: equity,
        trades: trades.len(),
        wins,
        winrate: if trades.is_empty() { 0.0 } else { wins as f64 / trades.len() as f64 },
        avg_return,
        total_return: if cfg.initial_cash > 0.0 {
            (equity - cfg.initial_cash) / cfg.initial_cash
        } else {
            0.0
        },
        max_drawdown: max_drawdown(&curve),
        equity_curve: curve,
        profit_factor: profit_factor(&rets),
        expectancy: avg_return,
        sharpe_like: sharpe_like(&rets),
    };

    debug!(
        trades = report.trades,
        final_equity = report.final_equity,
        max_drawdown = report.max_drawdown,
        "backtest done"
    );

    BacktestOutcome { trades, report }
}

// ============================================================
// METRICS
// ============================================================

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

/// Largest peak-to-point fractional decline along `curve`
pub fn max_drawdown(curve: &[f64]) -> f64 {
    let Some(&first) = curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut mdd = 0.0f64;
    for &x in curve {
        peak = peak.max(x);
        let dd = if peak > 0.0 { (peak - x) / peak } else { 0.0 };
        mdd = mdd.max(dd);
    }
    mdd
}

/// Summed winning returns over summed losing returns.
///
/// `+inf` with wins and no losses, 0 with neither.
pub fn profit_factor(rets: &[f64]) -> f64 {
    let (gains, losses) = rets.iter().fold((0.0, 0.0), |(g, l), &r| {
        if r > 0.0 {
            (g + r, l)
        } else {
            (g, l - r)
        }
    });
    if losses > EPS {
        gains / losses
    } else if gains > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Mean over sample standard deviation of per-trade returns (not annualized).
///
/// 0 with fewer than two returns; `+inf` or 0 when the deviation vanishes,
/// depending on the sign of the mean.
pub fn sharpe_like(rets: &[f64]) -> f64 {
    if rets.len() < 2 {
        return 0.0;
    }
    let mu = mean(rets);
    let var = rets.iter().map(|r| (r - mu).powi(2)).sum::<f64>() / (rets.len() - 1) as f64;
    let sd = if var > 0.0 { var.sqrt() } else { 0.0 };
    if sd > EPS {
        mu / sd
    } else if mu > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

// ============================================================
// TESTS
// ============================================================
