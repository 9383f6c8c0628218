//! Impulse wave search
//!
//! Swing points are coalesced into legs ([`legs`]), five-leg candidates are
//! generated by a budgeted beam search ([`beam`]), checked against the impulse
//! rules ([`rules`]), scored ([`scorer`]) and deduplicated ([`nms`]).
//!
//! # Pipeline
//!
//! ```text
//! swings -> legs -> beam search -> rule check -> score/confidence -> NMS
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::swing::SwingPoint;
use crate::{Count, Direction, PatternId, Ratio, Result, WaveError};

pub mod beam;
pub mod helpers;
pub mod legs;
pub mod nms;
pub mod rules;
pub mod scorer;
pub mod tuner;

pub use beam::{beam_search, generate_candidates, BeamConfig, BeamOutcome, Candidate, CandidateSearch};
pub use legs::build_legs;
pub use nms::{dedupe_patterns, nms_by_span, overlap_ratio};
pub use rules::{check_impulse, RuleFlags};
pub use scorer::{confidence_from_score, score_impulse, ScoreConfig};
pub use tuner::{tune_wave_options, TuneGrid, TuneResult};

/// Tag of the only pattern kind produced by the search
pub const IMPULSE: PatternId = PatternId("IMPULSE_1_5");

// ============================================================
// LEG
// ============================================================

/// Directional move between two swing points (a "monowave")
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub start_idx: usize,
    pub end_idx: usize,
    pub start_px: f64,
    pub end_px: f64,
}

impl Leg {
    pub fn new(start_idx: usize, end_idx: usize, start_px: f64, end_px: f64) -> Self {
        Self {
            start_idx,
            end_idx,
            start_px,
            end_px,
        }
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        Direction::from_delta(self.end_px - self.start_px)
    }

    #[inline]
    pub fn magnitude(&self) -> f64 {
        (self.end_px - self.start_px).abs()
    }
}

// ============================================================
// PATTERN
// ============================================================

/// Scoring metadata attached to a pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PatternMeta {
    pub score: f64,
    /// Calibrated confidence 0.0..=1.0
    pub confidence: f64,
    /// Wave 4 retraced into wave 1 territory (penalized, not rejected)
    pub w4_overlap: bool,
}

/// Five consecutive-or-gapped legs forming an impulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WavePattern {
    pub kind: PatternId,
    pub legs: [Leg; 5],
    pub meta: PatternMeta,
}

impl WavePattern {
    /// Score `legs` and attach confidence. The legs are assumed to have passed
    /// [`check_impulse`], which produced `flags`.
    pub fn scored(legs: [Leg; 5], flags: RuleFlags, cfg: &ScoreConfig) -> Self {
        let score = score_impulse(&legs, flags.w4_overlap, cfg);
        Self {
            kind: IMPULSE,
            legs,
            meta: PatternMeta {
                score,
                confidence: confidence_from_score(score),
                w4_overlap: flags.w4_overlap,
            },
        }
    }

    #[inline]
    pub fn start_idx(&self) -> usize {
        self.legs[0].start_idx
    }

    #[inline]
    pub fn end_idx(&self) -> usize {
        self.legs[4].end_idx
    }

    #[inline]
    pub fn start_px(&self) -> f64 {
        self.legs[0].start_px
    }

    #[inline]
    pub fn end_px(&self) -> f64 {
        self.legs[4].end_px
    }

    /// Bar span `[start, end)` used for overlap tests
    #[inline]
    pub fn span(&self) -> (usize, usize) {
        (self.start_idx(), self.end_idx())
    }

    /// Trend direction (direction of the first leg)
    #[inline]
    pub fn direction(&self) -> Direction {
        self.legs[0].direction()
    }
}

// ============================================================
// OPTIONS
// ============================================================

/// Search knobs for the wave scanner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveOptions {
    /// Keep every (skip+1)-th swing point when building legs
    pub monowave_skip: usize,
    /// Drop legs smaller than this absolute price move
    pub min_leg_abs_move: f64,
    /// Largest number of legs that may be skipped between pattern legs
    pub max_gap: usize,
    pub beam_width: usize,
    /// Global budget of scored prefixes
    pub max_candidates: usize,
    pub max_patterns: usize,
    /// NMS threshold on span overlap ratio
    pub nms_overlap: f64,
    /// Reject wave-4 overlap instead of penalizing it
    pub strict_wave4: bool,
}

impl Default for WaveOptions {
    fn default() -> Self {
        Self {
            monowave_skip: 1,
            min_leg_abs_move: 0.0,
            max_gap: 1,
            beam_width: 256,
            max_candidates: 5000,
            max_patterns: 50,
            nms_overlap: 0.70,
            strict_wave4: false,
        }
    }
}

impl WaveOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.min_leg_abs_move.is_finite() || self.min_leg_abs_move < 0.0 {
            return Err(WaveError::OutOfRange {
                field: "min_leg_abs_move",
                value: self.min_leg_abs_move,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Count::new(self.beam_width)?;
        Count::new(self.max_candidates)?;
        Ratio::new(self.nms_overlap)?;
        Ok(())
    }

    pub fn beam_config(&self) -> BeamConfig {
        BeamConfig {
            beam_width: self.beam_width,
            max_candidates: self.max_candidates,
            max_patterns: self.max_patterns,
        }
    }
}

// ============================================================
// SCAN
// ============================================================

/// Counters describing one scan, returned alongside the patterns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanTrace {
    pub swings: usize,
    pub legs: usize,
    /// Prefixes scored by the beam search
    pub generated: usize,
    pub budget_exhausted: bool,
    pub beam_kept: usize,
    /// Full five-leg tuples that came out of the beam
    pub candidates: usize,
    pub patterns: usize,
}

/// Patterns of one scan plus its trace
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    pub patterns: Vec<WavePattern>,
    pub trace: ScanTrace,
}

impl ScanOutcome {
    /// Highest-scoring pattern
    pub fn best(&self) -> Option<&WavePattern> {
        self.patterns
            .iter()
            .max_by(|a, b| a.meta.score.total_cmp(&b.meta.score))
    }

    /// (score, confidence) of the best pattern, zeros when empty
    pub fn best_score_conf(&self) -> (f64, f64) {
        self.best()
            .map(|p| (p.meta.score, p.meta.confidence))
            .unwrap_or((0.0, 0.0))
    }
}

/// Run the full wave search over `swings`.
///
/// Too few swings or legs is not an error; the outcome is simply empty.
pub fn scan_impulses(swings: &[SwingPoint], opts: &WaveOptions) -> ScanOutcome {
    let legs = build_legs(swings, opts.monowave_skip, opts.min_leg_abs_move);
    let mut trace = ScanTrace {
        swings: swings.len(),
        legs: legs.len(),
        ..ScanTrace::default()
    };

    if legs.len() < 5 {
        debug!(swings = trace.swings, legs = trace.legs, "scan skipped: fewer than 5 legs");
        return ScanOutcome {
            patterns: Vec::new(),
            trace,
        };
    }

    let score_cfg = ScoreConfig::default();
    let search = generate_candidates(&legs, opts.max_gap, &opts.beam_config(), &score_cfg, opts.strict_wave4);
    trace.generated = search.generated;
    trace.budget_exhausted = search.budget_exhausted;
    trace.beam_kept = search.beam_kept;
    trace.candidates = search.candidates.len();

    let patterns: Vec<WavePattern> = search
        .candidates
        .iter()
        .filter_map(|c| {
            let window = c.legs.map(|i| legs[i]);
            check_impulse(&window, opts.strict_wave4).map(|flags| WavePattern::scored(window, flags, &score_cfg))
        })
        .collect();

    let kept = dedupe_patterns(patterns, opts.nms_overlap, opts.max_patterns);
    trace.patterns = kept.len();

    debug!(
        swings = trace.swings,
        legs = trace.legs,
        generated = trace.generated,
        budget_exhausted = trace.budget_exhausted,
        candidates = trace.candidates,
        patterns = trace.patterns,
        "scan done"
    );

    ScanOutcome {
        patterns: kept,
        trace,
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Alternating swings through `prices`, starting with a low
    fn swings_from(prices: &[f64]) -> Vec<SwingPoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                if i % 2 == 0 {
                    SwingPoint::low(i * 10, p)
                } else {
                    SwingPoint::high(i * 10, p)
                }
            })
            .collect()
    }

    fn opts() -> WaveOptions {
        WaveOptions {
            monowave_skip: 0,
            ..WaveOptions::default()
        }
    }

    #[test]
    fn test_leg_direction_and_magnitude() {
        let up = Leg::new(0, 5, 10.0, 14.0);
        let down = Leg::new(5, 9, 14.0, 11.5);
        let flat = Leg::new(9, 12, 11.5, 11.5);

        assert_eq!(up.direction(), Direction::Bullish);
        assert_eq!(down.direction(), Direction::Bearish);
        assert_eq!(flat.direction(), Direction::Neutral);
        assert_eq!(down.magnitude(), 2.5);
    }

    #[test]
    fn test_scan_single_impulse() {
        let swings = swings_from(&[100.0, 120.0, 110.0, 145.0, 133.0, 160.0]);
        let outcome = scan_impulses(&swings, &opts());

        assert_eq!(outcome.trace.legs, 5);
        assert_eq!(outcome.patterns.len(), 1);
        assert_eq!(outcome.patterns[0].kind, IMPULSE);
        assert_eq!(outcome.patterns[0].span(), (0, 50));
        assert_eq!(outcome.patterns[0].direction(), Direction::Bullish);
    }

    #[test]
    fn test_scan_bearish_impulse() {
        let mut swings = swings_from(&[160.0, 140.0, 150.0, 115.0, 127.0, 100.0]);
        for s in &mut swings {
            s.kind = s.kind.opposite();
        }
        let outcome = scan_impulses(&swings, &opts());

        assert_eq!(outcome.patterns.len(), 1);
        assert_eq!(outcome.patterns[0].direction(), Direction::Bearish);
    }

    #[test]
    fn test_scan_too_few_legs() {
        let swings = swings_from(&[100.0, 120.0, 110.0, 145.0]);
        let outcome = scan_impulses(&swings, &opts());

        assert!(outcome.patterns.is_empty());
        assert_eq!(outcome.trace.generated, 0);
        assert_eq!(outcome.best_score_conf(), (0.0, 0.0));
    }

    #[test]
    fn test_scan_w4_overlap_penalized_or_rejected() {
        // Wave 4 low (115) dips below the wave 1 high (120)
        let swings = swings_from(&[100.0, 120.0, 110.0, 145.0, 115.0, 160.0]);

        let soft = scan_impulses(&swings, &opts());
        assert_eq!(soft.patterns.len(), 1);
        assert!(soft.patterns[0].meta.w4_overlap);

        let strict = scan_impulses(
            &swings,
            &WaveOptions {
                strict_wave4: true,
                ..opts()
            },
        );
        assert!(strict.patterns.is_empty());
    }

    #[test]
    fn test_scan_trace_counts_budget() {
        let prices: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 100.0 + i as f64 } else { 110.0 + i as f64 * 1.5 })
            .collect();
        let swings = swings_from(&prices);
        let outcome = scan_impulses(
            &swings,
            &WaveOptions {
                max_candidates: 25,
                max_gap: 2,
                ..opts()
            },
        );

        assert_eq!(outcome.trace.generated, 25);
        assert!(outcome.trace.budget_exhausted);
    }

    #[test]
    fn test_scan_huge_max_gap_is_bounded() {
        let swings = swings_from(&[100.0, 120.0, 110.0, 145.0, 133.0, 160.0]);
        let wide = WaveOptions {
            max_gap: usize::MAX / 2,
            max_candidates: 10,
            ..opts()
        };
        assert!(wide.validate().is_ok());

        let outcome = scan_impulses(&swings, &wide);
        assert_eq!(outcome.trace.generated, 10);
        assert!(outcome.trace.budget_exhausted);

        // with room to finish, the oversized gap finds the same impulse
        let outcome = scan_impulses(
            &swings,
            &WaveOptions {
                max_gap: usize::MAX,
                ..opts()
            },
        );
        assert_eq!(outcome.patterns.len(), 1);
        assert_eq!(outcome.patterns[0].span(), (0, 50));
    }

    #[test]
    fn test_options_validate() {
        assert!(WaveOptions::default().validate().is_ok());
        assert!(WaveOptions {
            max_candidates: 0,
            ..WaveOptions::default()
        }
        .validate()
        .is_err());
        assert!(WaveOptions {
            min_leg_abs_move: -1.0,
            ..WaveOptions::default()
        }
        .validate()
        .is_err());
    }
}
