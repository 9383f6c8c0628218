//! Fibonacci-ratio scoring and confidence calibration

use super::helpers::{
    closeness, logistic, CONFIDENCE_PIVOT, EXTREME_PENALTY, EXTREME_RATIO, FIB_W2, FIB_W3, FIB_W4,
    OVERLAP_PENALTY, SPAN_BONUS_CAP, SPAN_DIVISOR,
};
use super::Leg;

/// Ratio bands and penalties used by [`score_impulse`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreConfig {
    pub fib_w2: (f64, f64),
    pub fib_w3: (f64, f64),
    pub fib_w4: (f64, f64),
    pub overlap_penalty: f64,
    pub extreme_penalty: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            fib_w2: FIB_W2,
            fib_w3: FIB_W3,
            fib_w4: FIB_W4,
            overlap_penalty: OVERLAP_PENALTY,
            extreme_penalty: EXTREME_PENALTY,
        }
    }
}

/// Quality score of a validated five-leg impulse.
///
/// Any flat leg scores 0.
pub fn score_impulse(legs: &[Leg; 5], w4_overlap: bool, cfg: &ScoreConfig) -> f64 {
    let m = legs.map(|l| l.magnitude());
    let mn = m.iter().copied().fold(f64::INFINITY, f64::min);
    let mx = m.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if mn.is_nan() || mn <= 0.0 {
        return 0.0;
    }
    let [w1, w2, w3, w4, w5] = m;

    let r2 = w2 / w1;
    let r3 = w3 / w1;
    let r4 = w4 / w3;

    let mut score = 2.0 * closeness(r2, cfg.fib_w2.0, cfg.fib_w2.1)
        + 2.0 * closeness(r3, cfg.fib_w3.0, cfg.fib_w3.1)
        + 1.5 * closeness(r4, cfg.fib_w4.0, cfg.fib_w4.1);

    if w3 > w1.min(w5) {
        score += 1.0;
    }
    if w4_overlap {
        score -= cfg.overlap_penalty;
    }
    if mx / mn > EXTREME_RATIO {
        score -= cfg.extreme_penalty;
    }

    let span = legs[4].end_idx.saturating_sub(legs[0].start_idx) as f64;
    score + (span / SPAN_DIVISOR).clamp(0.0, SPAN_BONUS_CAP)
}

/// Logistic map of score to `0.0..=1.0`, 0.5 at the pivot score
#[inline]
pub fn confidence_from_score(score: f64) -> f64 {
    logistic(score - CONFIDENCE_PIVOT)
}
