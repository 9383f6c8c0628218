//! Grid auto-tuning of [`WaveOptions`]
//!
//! Tries every combination of a small grid and keeps the one whose best
//! pattern has the highest confidence, preferring fewer patterns and then a
//! higher best score. The first combination wins exact ties.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use super::{scan_impulses, WaveOptions};
use crate::params::Tunable;
use crate::swing::SwingPoint;
use crate::{Result, WaveError};

/// Values tried per tuned parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuneGrid {
    pub monowave_skips: Vec<usize>,
    pub min_moves: Vec<f64>,
    pub max_gaps: Vec<usize>,
    pub beam_widths: Vec<usize>,
}

impl Default for TuneGrid {
    /// Grid from the tuning ranges in [`WaveOptions::param_meta`]
    fn default() -> Self {
        let values = |name: &str| -> Vec<f64> {
            WaveOptions::meta(name)
                .map(|m| m.generate_grid())
                .unwrap_or_default()
        };
        let whole = |name: &str| -> Vec<usize> { values(name).into_iter().map(|v| v as usize).collect() };

        Self {
            monowave_skips: whole("monowave_skip"),
            min_moves: values("min_leg_abs_move"),
            max_gaps: whole("max_gap"),
            beam_widths: whole("beam_width"),
        }
    }
}

impl TuneGrid {
    pub fn size(&self) -> usize {
        self.monowave_skips.len() * self.min_moves.len() * self.max_gaps.len() * self.beam_widths.len()
    }
}

/// Winning option set and the summary it was chosen on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuneResult {
    pub options: WaveOptions,
    pub patterns: usize,
    pub best_score: f64,
    pub best_conf: f64,
    /// Combinations evaluated
    pub checked: usize,
}

impl TuneResult {
    /// Selection order: confidence, then fewer patterns, then score
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.best_conf
            .total_cmp(&other.best_conf)
            .then_with(|| other.patterns.cmp(&self.patterns))
            .then_with(|| self.best_score.total_cmp(&other.best_score))
    }
}

/// Grid-search wave options on `swings`.
///
/// `max_candidates`, `max_patterns`, `nms_overlap` and `strict_wave4` come
/// from `base`. Fails on an empty grid or a grid value the options reject.
pub fn tune_wave_options(swings: &[SwingPoint], base: &WaveOptions, grid: &TuneGrid) -> Result<TuneResult> {
    debug!(grid = grid.size(), max_patterns = base.max_patterns, nms_overlap = base.nms_overlap, "tune start");

    let mut params = base.to_params();
    let mut best: Option<TuneResult> = None;
    let mut checked = 0usize;

    for &skip in &grid.monowave_skips {
        for &min_move in &grid.min_moves {
            for &gap in &grid.max_gaps {
                for &width in &grid.beam_widths {
                    params.insert("monowave_skip", skip as f64);
                    params.insert("min_leg_abs_move", min_move);
                    params.insert("max_gap", gap as f64);
                    params.insert("beam_width", width as f64);
                    let options = WaveOptions {
                        strict_wave4: base.strict_wave4,
                        ..WaveOptions::with_params(&params)?
                    };

                    let outcome = scan_impulses(swings, &options);
                    let (best_score, best_conf) = outcome.best_score_conf();
                    checked += 1;
                    let result = TuneResult {
                        options,
                        patterns: outcome.patterns.len(),
                        best_score,
                        best_conf,
                        checked,
                    };

                    if checked % 25 == 0 {
                        debug!(checked, "tune progress");
                    }
                    let better = best
                        .as_ref()
                        .map_or(true, |b| result.rank_cmp(b) == Ordering::Greater);
                    if better {
                        debug!(checked, best_conf, best_score, patterns = result.patterns, "tune best");
                        best = Some(result);
                    }
                }
            }
        }
    }

    let mut best = best.ok_or(WaveError::InvalidValue("empty tuning grid"))?;
    best.checked = checked;
    debug!(checked, best_conf = best.best_conf, patterns = best.patterns, "tune done");
    Ok(best)
}
