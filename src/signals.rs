//! Trade signal from the best pattern of a scan

use serde::Serialize;

use crate::wave::WavePattern;
use crate::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub side: Side,
    pub confidence: f64,
    /// Short machine-readable reason, e.g. `impulse_up`
    pub reason: &'static str,
    /// Pattern the signal was derived from
    pub pattern: Option<WavePattern>,
}

impl Signal {
    fn flat(reason: &'static str, pattern: Option<WavePattern>) -> Self {
        Self {
            side: Side::Flat,
            confidence: 0.0,
            reason,
            pattern,
        }
    }
}

/// Signal in the direction of the highest-scoring pattern.
///
/// Flat when there are no patterns or the best score is below `min_score`.
pub fn generate_signal(patterns: &[WavePattern], min_score: f64) -> Signal {
    let Some(best) = patterns.iter().max_by(|a, b| a.meta.score.total_cmp(&b.meta.score)) else {
        return Signal::flat("no_patterns", None);
    };
    if best.meta.score < min_score {
        return Signal::flat("low_score", Some(*best));
    }

    let (side, reason) = match best.direction() {
        Direction::Bullish => (Side::Buy, "impulse_up"),
        Direction::Bearish => (Side::Sell, "impulse_down"),
        Direction::Neutral => return Signal::flat("no_direction", Some(*best)),
    };
    Signal {
        side,
        confidence: best.meta.confidence,
        reason,
        pattern: Some(*best),
    }
}
