//! Layered pipeline configuration
//!
//! Defaults, then an optional TOML file, then `EW_`-prefixed environment
//! variables; later layers win.
//!
//! ```toml
//! zigzag_pct = 2.5
//! monowave_skip = 0
//! fee_bps = 10
//! entry_mode = "bar"
//! wf_mode = "rolling"
//! wf_test_bars = 300
//! ```

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::{Figment, Provider};
use serde::{Deserialize, Serialize};

use crate::backtest::{BacktestConfig, EntryMode};
use crate::batch::JobOptions;
use crate::rank::DEFAULT_OOS_WEIGHT;
use crate::swing::ZigZagMode;
use crate::walkforward::{WalkForwardConfig, WalkForwardMode};
use crate::wave::{TuneGrid, WaveOptions};
use crate::{EngineBuilder, ImpulseEngine, Ratio, Result, WaveError};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "EW_";

/// Every option the pipeline reads, flat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // Swings
    pub zigzag_pct: f64,
    pub zigzag_mode: ZigZagMode,
    pub validate_data: bool,

    // Wave search
    pub monowave_skip: usize,
    pub min_leg_abs_move: f64,
    pub max_gap: usize,
    pub beam_width: usize,
    pub max_candidates: usize,
    pub max_patterns: usize,
    pub nms_overlap: f64,
    pub strict_wave4: bool,
    pub auto_tune: bool,

    // Backtest
    pub initial_cash: f64,
    pub fee_bps: f64,
    pub slippage_bps: f64,
    pub risk_fraction: f64,
    pub min_confidence: f64,
    pub entry_mode: EntryMode,

    // Walk-forward
    pub wf_mode: WalkForwardMode,
    pub wf_splits: usize,
    pub wf_min_bars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wf_train_bars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wf_test_bars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wf_step_bars: Option<usize>,

    // Ranking
    pub rank_oos_weight: f64,
    pub rank_top: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let wave = WaveOptions::default();
        let bt = BacktestConfig::default();
        let wf = WalkForwardConfig::default();
        Self {
            zigzag_pct: 1.0,
            zigzag_mode: ZigZagMode::HighLow,
            validate_data: false,
            monowave_skip: wave.monowave_skip,
            min_leg_abs_move: wave.min_leg_abs_move,
            max_gap: wave.max_gap,
            beam_width: wave.beam_width,
            max_candidates: wave.max_candidates,
            max_patterns: wave.max_patterns,
            nms_overlap: wave.nms_overlap,
            strict_wave4: wave.strict_wave4,
            auto_tune: false,
            initial_cash: bt.initial_cash,
            fee_bps: bt.fee_bps,
            slippage_bps: bt.slippage_bps,
            risk_fraction: bt.risk_fraction,
            min_confidence: bt.min_confidence,
            entry_mode: bt.entry_mode,
            wf_mode: wf.mode,
            wf_splits: wf.splits,
            wf_min_bars: wf.min_bars,
            wf_train_bars: wf.train_bars,
            wf_test_bars: wf.test_bars,
            wf_step_bars: wf.step_bars,
            rank_oos_weight: DEFAULT_OOS_WEIGHT,
            rank_top: 5,
        }
    }
}

impl PipelineConfig {
    pub fn wave_options(&self) -> WaveOptions {
        WaveOptions {
            monowave_skip: self.monowave_skip,
            min_leg_abs_move: self.min_leg_abs_move,
            max_gap: self.max_gap,
            beam_width: self.beam_width,
            max_candidates: self.max_candidates,
            max_patterns: self.max_patterns,
            nms_overlap: self.nms_overlap,
            strict_wave4: self.strict_wave4,
        }
    }

    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            initial_cash: self.initial_cash,
            risk_fraction: self.risk_fraction,
            min_confidence: self.min_confidence,
            entry_mode: self.entry_mode,
            fee_bps: self.fee_bps,
            slippage_bps: self.slippage_bps,
        }
    }

    pub fn walk_forward_config(&self) -> WalkForwardConfig {
        WalkForwardConfig {
            mode: self.wf_mode,
            splits: self.wf_splits,
            min_bars: self.wf_min_bars,
            train_bars: self.wf_train_bars,
            test_bars: self.wf_test_bars,
            step_bars: self.wf_step_bars,
        }
    }

    /// Job stages: always a backtest, walk-forward on request, tuning per `auto_tune`
    pub fn job_options(&self, walk_forward: bool) -> JobOptions {
        JobOptions {
            backtest: Some(self.backtest_config()),
            walk_forward: walk_forward.then(|| self.walk_forward_config()),
            auto_tune: self.auto_tune.then(TuneGrid::default),
        }
    }

    /// Default engine (zigzag swings) built from this configuration
    pub fn engine(&self) -> Result<ImpulseEngine> {
        EngineBuilder::new()
            .zigzag_mode(self.zigzag_mode)
            .zigzag_pct(self.zigzag_pct)
            .options(self.wave_options())
            .validate_data(self.validate_data)
            .build()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.zigzag_pct.is_finite() || self.zigzag_pct < 0.0 {
            return Err(WaveError::OutOfRange {
                field: "zigzag_pct",
                value: self.zigzag_pct,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        self.wave_options().validate()?;
        self.backtest_config().validate()?;
        if self.wf_splits == 0 {
            return Err(WaveError::InvalidValue("wf_splits must be >= 1"));
        }
        Ratio::new(self.rank_oos_weight)?;
        Ok(())
    }
}

/// Builds a [`PipelineConfig`] from layered sources
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    figment: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Start from the built-in defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::from(Serialized::defaults(PipelineConfig::default())),
        }
    }

    /// Merge a TOML file; a missing file is skipped.
    #[must_use]
    pub fn file(self, path: impl AsRef<Path>) -> Self {
        self.merge(Toml::file(path.as_ref()))
    }

    /// Merge `EW_*` environment variables (`__` separates nested keys).
    #[must_use]
    pub fn env(self) -> Self {
        self.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Merge any other figment provider.
    #[must_use]
    pub fn merge(self, provider: impl Provider) -> Self {
        Self {
            figment: self.figment.merge(provider),
        }
    }

    /// Extract and validate.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when a layer cannot be parsed, or the validation error.
    pub fn load(self) -> Result<PipelineConfig> {
        let config: PipelineConfig = self
            .figment
            .extract()
            .map_err(|e| WaveError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then `path` when given, then the environment.
    pub fn load_from(path: Option<&Path>) -> Result<PipelineConfig> {
        let loader = Self::new();
        let loader = match path {
            Some(p) => loader.file(p),
            None => loader,
        };
        loader.env().load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_round_trip() {
        let cfg = ConfigLoader::new().load().unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.wave_options(), WaveOptions::default());
        assert_eq!(cfg.backtest_config(), BacktestConfig::default());
        assert_eq!(cfg.walk_forward_config(), WalkForwardConfig::default());
        assert_eq!(cfg.rank_top, 5);
    }

    #[test]
    fn test_file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "ew.toml",
                r#"
                zigzag_pct = 2.5
                beam_width = 64
                entry_mode = "bar"
                wf_mode = "rolling"
                wf_test_bars = 300
                "#,
            )?;
            jail.set_env("EW_BEAM_WIDTH", "32");
            jail.set_env("EW_FEE_BPS", "7.5");

            let cfg = ConfigLoader::new()
                .file("ew.toml")
                .env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(cfg.zigzag_pct, 2.5);
            assert_eq!(cfg.beam_width, 32);
            assert_eq!(cfg.fee_bps, 7.5);
            assert_eq!(cfg.entry_mode, EntryMode::Bar);
            assert_eq!(cfg.wf_mode, WalkForwardMode::Rolling);
            assert_eq!(cfg.wf_test_bars, Some(300));
            assert_eq!(cfg.max_gap, 1);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_modes_fall_back() {
        Jail::expect_with(|jail| {
            jail.set_env("EW_WF_MODE", "sideways");
            jail.set_env("EW_ENTRY_MODE", "limit");

            let cfg = ConfigLoader::load_from(None).map_err(|e| e.to_string())?;
            assert_eq!(cfg.wf_mode, WalkForwardMode::Stability);
            assert_eq!(cfg.entry_mode, EntryMode::Pattern);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_is_skipped() {
        Jail::expect_with(|_| {
            let cfg = ConfigLoader::load_from(Some(Path::new("absent.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(cfg, PipelineConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "risk_fraction = 1.5")?;
            let err = ConfigLoader::new().file("bad.toml").load();
            assert!(err.is_err());

            jail.create_file("garbled.toml", "beam_width = \"wide\"")?;
            let err = ConfigLoader::new().file("garbled.toml").load();
            assert!(matches!(err, Err(WaveError::InvalidConfig(_))));
            Ok(())
        });
    }

    #[test]
    fn test_engine_and_job_options() {
        let cfg = PipelineConfig {
            monowave_skip: 0,
            auto_tune: true,
            ..PipelineConfig::default()
        };
        let engine = cfg.engine().unwrap();
        assert_eq!(engine.options().monowave_skip, 0);

        let opts = cfg.job_options(false);
        assert!(opts.backtest.is_some());
        assert!(opts.walk_forward.is_none());
        assert_eq!(opts.auto_tune, Some(TuneGrid::default()));
        assert!(cfg.job_options(true).walk_forward.is_some());
    }
}
