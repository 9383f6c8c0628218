//! # ewscan - Elliott-style impulse scanner
//!
//! Detects five-leg directional price patterns ("impulses") in OHLC bar series,
//! scores them, simulates trading them and measures how robust the rule set is
//! across disjoint windows of history.
//!
//! ## Quick Start
//!
//! ```rust
//! use ewscan::prelude::*;
//!
//! let bars: Vec<Bar> = (0..60)
//!     .map(|i| Bar::flat(i as i64, 100.0 + (i as f64 * 0.7).sin() * 5.0))
//!     .collect();
//!
//! let engine = EngineBuilder::new()
//!     .zigzag_pct(2.0)
//!     .monowave_skip(0)
//!     .build()
//!     .unwrap();
//!
//! let outcome = engine.scan(&bars).unwrap();
//! let backtest = engine.backtest(&bars, &BacktestConfig::default()).unwrap();
//! assert_eq!(backtest.report.trades, backtest.trades.len());
//! # let _ = outcome;
//! ```

pub mod backtest;
pub mod batch;
pub mod config;
pub mod float_serde;
pub mod params;
pub mod rank;
pub mod signals;
pub mod swing;
pub mod walkforward;
pub mod wave;

pub mod prelude {
    pub use crate::{
        // Evaluation
        backtest::{run_backtest, BacktestConfig, BacktestOutcome, BacktestReport, EntryMode, Trade},
        batch::{run_job, run_jobs, JobError, JobOptions, JobResult, JobSpec},
        // Configuration
        config::{ConfigLoader, PipelineConfig},
        params::{ParamMeta, ParamType, Tunable},
        rank::{composite_score, rank_results, JobMetrics, RankedItem},
        signals::{generate_signal, Side, Signal},
        // Swings
        swing::{SwingKind, SwingPoint, SwingSource, ZigZag, ZigZagMode},
        walkforward::{Fold, WalkForwardConfig, WalkForwardMode, WalkForwardResult},
        // Wave search
        wave::{
            scan_impulses, Leg, PatternMeta, ScanOutcome, ScanTrace, WaveOptions, WavePattern,
        },
        // Core
        Bar,
        Count,
        Direction,
        EngineBuilder,
        EngineConfig,
        ImpulseEngine,
        OHLCVExt,
        PatternId,
        Ratio,
        Result,
        WaveError,
        OHLCV,
    };
}

use serde::{Deserialize, Serialize};

use backtest::{run_backtest, BacktestConfig, BacktestOutcome};
use swing::{normalize_swings, SwingPoint, SwingSource, ZigZag, ZigZagMode};
use walkforward::{WalkForwardConfig, WalkForwardResult};
use wave::{Leg, ScanOutcome, WaveOptions};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, WaveError>;

/// Errors raised at the edges of the pipeline (configuration and input data).
///
/// The search, scoring and evaluation stages themselves never fail; they
/// degrade to empty results instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WaveError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(WaveError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(WaveError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Strictly positive count (beam width, candidate budget, split count)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Count(usize);

impl Count {
    /// Create a new Count, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(WaveError::InvalidValue("Count must be > 0"));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Count {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Count {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Count::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait. The pipeline only ever reads bars.
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Extension trait with consistency checks for OHLCV data
pub trait OHLCVExt: OHLCV {
    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let values = [self.open(), self.high(), self.low(), self.close()];
        if values.iter().any(|v| v.is_nan()) {
            return Err(WaveError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(WaveError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(WaveError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Plain OHLCV bar; `ts` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    pub fn new(ts: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Bar whose four prices are all `price` (useful for close-only series)
    pub fn flat(ts: i64, price: f64) -> Self {
        Self::new(ts, price, price, price, price, 0.0)
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

// ============================================================
// PATTERN IDENTITY
// ============================================================

/// Unique identifier for a pattern type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternId(pub &'static str);

impl PatternId {
    /// Returns the string identifier
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl serde::Serialize for PatternId {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.0)
    }
}

/// Direction of a price move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    /// Direction of a signed price change; exactly zero is `Neutral`.
    #[inline]
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Direction::Bullish
        } else if delta < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Neutral => Direction::Neutral,
            Direction::Bearish => Direction::Bullish,
        }
    }

    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }
}

// ============================================================
// IMPULSE ENGINE
// ============================================================

/// Engine configuration that is not part of the wave search itself
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Percentage threshold handed to the swing source
    pub zigzag_pct: f64,
    /// Reject bar series containing NaN/infinite prices or high < low
    pub validate_data: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zigzag_pct: 1.0,
            validate_data: false,
        }
    }
}

/// Main impulse detection engine: swing source + wave search options.
#[derive(Debug, Clone)]
pub struct ImpulseEngine<S: SwingSource = ZigZag> {
    source: S,
    options: WaveOptions,
    config: EngineConfig,
}

impl<S: SwingSource> ImpulseEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            options: WaveOptions::default(),
            config: EngineConfig::default(),
        }
    }

    #[inline]
    pub fn options(&self) -> &WaveOptions {
        &self.options
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Same swing source and engine config, different wave options.
    pub fn with_options(&self, options: WaveOptions) -> Result<Self>
    where
        S: Clone,
    {
        options.validate()?;
        Ok(Self {
            source: self.source.clone(),
            options,
            config: self.config,
        })
    }

    // ===========================================
    // LOW-LEVEL: Stages
    // ===========================================

    /// Swing points of `bars` from the configured source, normalized so they
    /// ascend by index and alternate in kind.
    #[inline]
    pub fn swings<T: OHLCV>(&self, bars: &[T]) -> Vec<SwingPoint> {
        normalize_swings(self.source.swings(bars, self.config.zigzag_pct))
    }

    /// Legs built from `swings` with the engine's skip / minimum-move settings.
    #[inline]
    pub fn legs(&self, swings: &[SwingPoint]) -> Vec<Leg> {
        wave::legs::build_legs(
            swings,
            self.options.monowave_skip,
            self.options.min_leg_abs_move,
        )
    }

    // ===========================================
    // MID-LEVEL: Swings in, patterns out
    // ===========================================

    /// Run the wave search on already extracted swing points.
    #[inline]
    pub fn scan_swings(&self, swings: &[SwingPoint]) -> ScanOutcome {
        wave::scan_impulses(swings, &self.options)
    }

    // ===========================================
    // HIGH-LEVEL: Bars in
    // ===========================================

    /// Extract swings and scan them for impulse patterns.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<ScanOutcome> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }
        Ok(self.scan_unchecked(bars))
    }

    /// Scan `bars` and simulate trading every surviving pattern.
    pub fn backtest<T: OHLCV>(&self, bars: &[T], cfg: &BacktestConfig) -> Result<BacktestOutcome> {
        cfg.validate()?;
        let outcome = self.scan(bars)?;
        Ok(run_backtest(&outcome.patterns, bars, cfg))
    }

    /// Rerun scan + backtest on sub-windows of `bars` and aggregate fold returns.
    pub fn walk_forward<T: OHLCV>(
        &self,
        bars: &[T],
        backtest: &BacktestConfig,
        cfg: &WalkForwardConfig,
    ) -> Result<WalkForwardResult> {
        backtest.validate()?;
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }
        Ok(walkforward::walk_forward_with(bars.len(), cfg, |window| {
            let slice = &bars[window];
            let outcome = self.scan_unchecked(slice);
            run_backtest(&outcome.patterns, slice, backtest)
                .report
                .total_return
        }))
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    pub(crate) fn scan_unchecked<T: OHLCV>(&self, bars: &[T]) -> ScanOutcome {
        let swings = self.swings(bars);
        self.scan_swings(&swings)
    }

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                WaveError::InvalidOHLCV { reason, .. } => WaveError::InvalidOHLCV { index: i, reason },
                other => other,
            })?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating ImpulseEngine instances
pub struct EngineBuilder<S: SwingSource = ZigZag> {
    source: S,
    options: WaveOptions,
    config: EngineConfig,
}

impl Default for EngineBuilder<ZigZag> {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder<ZigZag> {
    pub fn new() -> Self {
        Self {
            source: ZigZag::default(),
            options: WaveOptions::default(),
            config: EngineConfig::default(),
        }
    }

    /// Switch the built-in zigzag between close-only and high/low pivots
    pub fn zigzag_mode(mut self, mode: ZigZagMode) -> Self {
        self.source = ZigZag::new(mode);
        self
    }
}

impl<S: SwingSource> EngineBuilder<S> {
    /// Change swing source
    pub fn swing_source<S2: SwingSource>(self, source: S2) -> EngineBuilder<S2> {
        EngineBuilder {
            source,
            options: self.options,
            config: self.config,
        }
    }

    /// Replace all wave options at once
    pub fn options(mut self, options: WaveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn zigzag_pct(mut self, pct: f64) -> Self {
        self.config.zigzag_pct = pct;
        self
    }

    pub fn monowave_skip(mut self, skip: usize) -> Self {
        self.options.monowave_skip = skip;
        self
    }

    pub fn min_leg_abs_move(mut self, min_move: f64) -> Self {
        self.options.min_leg_abs_move = min_move;
        self
    }

    pub fn max_gap(mut self, max_gap: usize) -> Self {
        self.options.max_gap = max_gap;
        self
    }

    pub fn beam_width(mut self, width: usize) -> Self {
        self.options.beam_width = width;
        self
    }

    pub fn max_candidates(mut self, budget: usize) -> Self {
        self.options.max_candidates = budget;
        self
    }

    pub fn max_patterns(mut self, keep: usize) -> Self {
        self.options.max_patterns = keep;
        self
    }

    pub fn nms_overlap(mut self, overlap: f64) -> Self {
        self.options.nms_overlap = overlap;
        self
    }

    /// Reject wave-4 overlap outright instead of penalizing it
    pub fn strict_wave4(mut self, strict: bool) -> Self {
        self.options.strict_wave4 = strict;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<ImpulseEngine<S>> {
        self.options.validate()?;
        if !self.config.zigzag_pct.is_finite() || self.config.zigzag_pct < 0.0 {
            return Err(WaveError::OutOfRange {
                field: "zigzag_pct",
                value: self.config.zigzag_pct,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Ok(ImpulseEngine {
            source: self.source,
            options: self.options,
            config: self.config,
        })
    }
}

// ============================================================
// TESTS
// ============================================================
