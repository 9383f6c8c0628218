//! Shared constants and numeric helpers for the wave search

// ============================================================
// SEARCH SENTINELS
// ============================================================

/// Prefix whose leg index runs off the end, or contains a flat leg
pub const SCORE_OVERFLOW: f64 = -1e9;
/// Prefix whose directions already fail to alternate
pub const SCORE_MISALIGNED: f64 = -1e3;
/// Full tuple rejected by the rule check
pub const SCORE_INVALID: f64 = -1e6;

/// Beam-only penalty per skipped leg between pattern legs
pub const GAP_PENALTY: f64 = 0.05;

// ============================================================
// SCORING CONSTANTS
// ============================================================

/// Wave 2 retracement of wave 1
pub const FIB_W2: (f64, f64) = (0.236, 0.786);
/// Wave 3 extension of wave 1
pub const FIB_W3: (f64, f64) = (1.0, 2.618);
/// Wave 4 retracement of wave 3
pub const FIB_W4: (f64, f64) = (0.236, 0.786);

pub const OVERLAP_PENALTY: f64 = 2.5;
pub const EXTREME_PENALTY: f64 = 1.0;
/// Largest/smallest leg ratio above which the extreme penalty applies
pub const EXTREME_RATIO: f64 = 10.0;
/// Bars per unit of span bonus
pub const SPAN_DIVISOR: f64 = 500.0;
pub const SPAN_BONUS_CAP: f64 = 0.5;
/// Score mapped to confidence 0.5
pub const CONFIDENCE_PIVOT: f64 = 2.5;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// 1.0 inside `[lo, hi]`, exponential decay with distance outside.
///
/// The decay is relative to the violated bound, so a bound `<= 0` yields 0.
#[inline]
pub fn closeness(x: f64, lo: f64, hi: f64) -> f64 {
    if (lo..=hi).contains(&x) {
        1.0
    } else if x < lo {
        if lo > 0.0 {
            (-2.0 * (lo - x) / lo).exp()
        } else {
            0.0
        }
    } else if hi > 0.0 {
        (-2.0 * (x - hi) / hi).exp()
    } else {
        0.0
    }
}

#[inline]
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
