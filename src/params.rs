//! Parameter metadata for the wave search
//!
//! This module provides metadata about search parameters, enabling:
//! - Grid search (auto-tuning)
//! - Parameter documentation
//! - Building options from plain name/value maps
//!
//! # Example
//!
//! ```rust
//! use ewscan::params::Tunable;
//! use ewscan::prelude::*;
//!
//! for param in WaveOptions::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::wave::WaveOptions;
use crate::{Count, Ratio, Result, WaveError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Value in 0.0..=1.0
  Ratio,
  /// Positive integer
  Count,
  /// Non-negative integer
  Integer,
  /// Non-negative price amount
  Amount,
}

/// Metadata for a single search parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "max_gap")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for tuning: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  pub const fn integer(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Integer, default, range, description }
  }

  pub const fn amount(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Amount, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 || !step.is_finite() {
      return vec![min];
    }
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value against the tuning range and the parameter type
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(WaveError::OutOfRange { field: self.name, value, min, max });
    }
    check_type(self.param_type, value)
  }
}

fn check_type(param_type: ParamType, value: f64) -> Result<()> {
  match param_type {
    ParamType::Ratio => Ratio::new(value).map(|_| ()),
    ParamType::Count => {
      if value < 1.0 || value.fract() != 0.0 {
        return Err(WaveError::InvalidValue("Count must be a positive integer"));
      }
      Ok(())
    },
    ParamType::Integer => {
      if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(WaveError::InvalidValue("Integer must be a non-negative whole number"));
      }
      Ok(())
    },
    ParamType::Amount => {
      if !value.is_finite() || value < 0.0 {
        return Err(WaveError::InvalidValue("Amount must be finite and non-negative"));
      }
      Ok(())
    },
  }
}

// ============================================================
// TUNABLE TRAIT
// ============================================================

/// Option sets that can be described, rebuilt and grid-searched by name
pub trait Tunable: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Builds an option set from a name/value map.
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Current values by parameter name
  fn to_params(&self) -> HashMap<&'static str, f64>;

  /// Metadata of one parameter
  fn meta(name: &str) -> Option<&'static ParamMeta> {
    Self::param_meta().iter().find(|m| m.name == name)
  }
}

const WAVE_PARAMS: &[ParamMeta] = &[
  ParamMeta::integer("monowave_skip", 1.0, (1.0, 2.0, 1.0), "Swing points skipped between leg endpoints"),
  ParamMeta::amount("min_leg_abs_move", 0.0, (0.0, 0.0, 1.0), "Minimum absolute price move of a leg"),
  ParamMeta::integer("max_gap", 1.0, (1.0, 2.0, 1.0), "Legs that may be skipped between pattern legs"),
  ParamMeta::count("beam_width", 256.0, (128.0, 256.0, 128.0), "Prefixes kept per beam layer"),
  ParamMeta::count("max_candidates", 5000.0, (1000.0, 10000.0, 1000.0), "Global budget of scored prefixes"),
  ParamMeta::count("max_patterns", 50.0, (10.0, 100.0, 10.0), "Patterns kept after NMS"),
  ParamMeta::ratio("nms_overlap", 0.70, (0.5, 0.9, 0.1), "Span overlap ratio that suppresses a pattern"),
];

impl Tunable for WaveOptions {
  fn param_meta() -> &'static [ParamMeta] {
    WAVE_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let d = WaveOptions::default();
    let opts = WaveOptions {
      monowave_skip: get_integer(params, "monowave_skip", d.monowave_skip)?,
      min_leg_abs_move: get_amount(params, "min_leg_abs_move", d.min_leg_abs_move)?,
      max_gap: get_integer(params, "max_gap", d.max_gap)?,
      beam_width: get_count(params, "beam_width", d.beam_width)?.get(),
      max_candidates: get_count(params, "max_candidates", d.max_candidates)?.get(),
      max_patterns: get_count(params, "max_patterns", d.max_patterns)?.get(),
      nms_overlap: get_ratio(params, "nms_overlap", d.nms_overlap)?.get(),
      strict_wave4: d.strict_wave4,
    };
    opts.validate()?;
    Ok(opts)
  }

  fn to_params(&self) -> HashMap<&'static str, f64> {
    HashMap::from([
      ("monowave_skip", self.monowave_skip as f64),
      ("min_leg_abs_move", self.min_leg_abs_move),
      ("max_gap", self.max_gap as f64),
      ("beam_width", self.beam_width as f64),
      ("max_candidates", self.max_candidates as f64),
      ("max_patterns", self.max_patterns as f64),
      ("nms_overlap", self.nms_overlap),
    ])
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Count from params with default fallback
pub fn get_count(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Count> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  check_type(ParamType::Count, value)?;
  Count::new(value as usize)
}

/// Helper to get a non-negative integer from params with default fallback
pub fn get_integer(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<usize> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  check_type(ParamType::Integer, value)?;
  Ok(value as usize)
}

/// Helper to get a non-negative amount from params with default fallback
pub fn get_amount(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
  let value = params.get(key).copied().unwrap_or(default);
  check_type(ParamType::Amount, value)?;
  Ok(value)
}

// ============================================================
// TESTS
// ============================================================
