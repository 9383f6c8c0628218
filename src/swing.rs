//! Swing point extraction
//!
//! A swing source turns a bar series into alternating local extrema. The wave
//! search treats it as a black box: any [`SwingSource`] whose output is sorted
//! by bar index with alternating kinds can be plugged into the engine. The
//! built-in [`ZigZag`] confirms a pivot once price retraces a percentage
//! threshold from the running extreme.

use serde::{Deserialize, Serialize};

use crate::OHLCV;

/// Kind of local extremum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

impl SwingKind {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            SwingKind::High => SwingKind::Low,
            SwingKind::Low => SwingKind::High,
        }
    }
}

/// Local price extremum at a bar position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub price: f64,
    pub kind: SwingKind,
}

impl SwingPoint {
    pub fn new(index: usize, price: f64, kind: SwingKind) -> Self {
        Self { index, price, kind }
    }

    pub fn high(index: usize, price: f64) -> Self {
        Self::new(index, price, SwingKind::High)
    }

    pub fn low(index: usize, price: f64) -> Self {
        Self::new(index, price, SwingKind::Low)
    }
}

/// Producer of swing points for a bar series.
///
/// `pct` is a percentage threshold whose meaning belongs to the implementation.
pub trait SwingSource: Send + Sync {
    fn swings<T: OHLCV>(&self, bars: &[T], pct: f64) -> Vec<SwingPoint>;
}

/// Bring externally produced swing points into canonical shape.
///
/// Drops non-finite prices, sorts by index and merges runs of the same kind
/// (or the same index), keeping the more extreme point of each run, so the
/// result alternates strictly.
pub fn normalize_swings(points: impl IntoIterator<Item = SwingPoint>) -> Vec<SwingPoint> {
    let mut pts: Vec<SwingPoint> = points.into_iter().filter(|p| p.price.is_finite()).collect();
    pts.sort_by_key(|p| p.index);

    let mut out: Vec<SwingPoint> = Vec::with_capacity(pts.len());
    for p in pts {
        match out.last_mut() {
            Some(last) if last.kind == p.kind => {
                let more_extreme = match p.kind {
                    SwingKind::High => p.price > last.price,
                    SwingKind::Low => p.price < last.price,
                };
                if more_extreme {
                    *last = p;
                }
            }
            Some(last) if last.index == p.index => {}
            _ => out.push(p),
        }
    }
    out
}

// ============================================================
// ZIGZAG
// ============================================================

/// Which prices the zigzag pivots on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZigZagMode {
    /// Closing prices only
    Close,
    /// Highs form tops, lows form bottoms
    #[default]
    HighLow,
}

/// Percentage-reversal zigzag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZigZag {
    pub mode: ZigZagMode,
}

impl ZigZag {
    pub fn new(mode: ZigZagMode) -> Self {
        Self { mode }
    }
}

impl SwingSource for ZigZag {
    fn swings<T: OHLCV>(&self, bars: &[T], pct: f64) -> Vec<SwingPoint> {
        match self.mode {
            ZigZagMode::Close => zigzag(bars.len(), |i| bars[i].close(), |i| bars[i].close(), pct),
            ZigZagMode::HighLow => zigzag(bars.len(), |i| bars[i].high(), |i| bars[i].low(), pct),
        }
    }
}

fn zigzag(
    n: usize,
    hi: impl Fn(usize) -> f64,
    lo: impl Fn(usize) -> f64,
    pct: f64,
) -> Vec<SwingPoint> {
    if n == 0 || !pct.is_finite() || pct < 0.0 {
        return Vec::new();
    }
    let t = pct / 100.0;
    let mut out = Vec::new();

    // Before the first reversal both extremes are candidates.
    let (mut max_i, mut max_p) = (0, hi(0));
    let (mut min_i, mut min_p) = (0, lo(0));
    // Kind of the extreme currently being extended, and where it is.
    let mut tracking: Option<SwingKind> = None;
    let (mut ext_i, mut ext_p) = (0, 0.0);

    for i in 1..n {
        let (h, l) = (hi(i), lo(i));
        match tracking {
            None => {
                if h >= min_p * (1.0 + t) {
                    out.push(SwingPoint::low(min_i, min_p));
                    tracking = Some(SwingKind::High);
                    (ext_i, ext_p) = (i, h);
                } else if l <= max_p * (1.0 - t) {
                    out.push(SwingPoint::high(max_i, max_p));
                    tracking = Some(SwingKind::Low);
                    (ext_i, ext_p) = (i, l);
                } else {
                    if h > max_p {
                        (max_i, max_p) = (i, h);
                    }
                    if l < min_p {
                        (min_i, min_p) = (i, l);
                    }
                }
            }
            Some(SwingKind::High) => {
                if h > ext_p {
                    (ext_i, ext_p) = (i, h);
                } else if l <= ext_p * (1.0 - t) {
                    out.push(SwingPoint::high(ext_i, ext_p));
                    tracking = Some(SwingKind::Low);
                    (ext_i, ext_p) = (i, l);
                }
            }
            Some(SwingKind::Low) => {
                if l < ext_p {
                    (ext_i, ext_p) = (i, l);
                } else if h >= ext_p * (1.0 + t) {
                    out.push(SwingPoint::low(ext_i, ext_p));
                    tracking = Some(SwingKind::High);
                    (ext_i, ext_p) = (i, h);
                }
            }
        }
    }

    // Last, still unconfirmed extreme
    if let Some(kind) = tracking {
        out.push(SwingPoint::new(ext_i, ext_p, kind));
    }
    out
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn closes(prices: &[f64]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Bar::flat(i as i64, p))
            .collect()
    }

    #[test]
    fn test_zigzag_close_basic() {
        let bars = closes(&[100.0, 102.0, 105.0, 100.0, 98.0, 103.0]);
        let swings = ZigZag::new(ZigZagMode::Close).swings(&bars, 3.0);

        assert_eq!(
            swings,
            vec![
                SwingPoint::low(0, 100.0),
                SwingPoint::high(2, 105.0),
                SwingPoint::low(4, 98.0),
                SwingPoint::high(5, 103.0),
            ]
        );
    }

    #[test]
    fn test_zigzag_high_low_uses_wicks() {
        let bars = vec![
            Bar::new(0, 100.0, 101.0, 99.0, 100.0, 0.0),
            Bar::new(1, 100.0, 110.0, 100.0, 104.0, 0.0),
            Bar::new(2, 104.0, 105.0, 95.0, 96.0, 0.0),
        ];
        let swings = ZigZag::default().swings(&bars, 5.0);

        assert_eq!(swings[0], SwingPoint::low(0, 99.0));
        assert_eq!(swings[1], SwingPoint::high(1, 110.0));
        assert_eq!(swings[2], SwingPoint::low(2, 95.0));
    }

    #[test]
    fn test_zigzag_flat_series_has_no_swings() {
        let bars = closes(&[100.0; 20]);
        assert!(ZigZag::new(ZigZagMode::Close).swings(&bars, 1.0).is_empty());
        assert!(ZigZag::default().swings(&closes(&[]), 1.0).is_empty());
    }

    #[test]
    fn test_zigzag_output_alternates() {
        let prices: Vec<f64> = (0..300)
            .map(|i| 100.0 + (i as f64 * 0.21).sin() * 8.0 + (i as f64 * 0.05).cos() * 3.0)
            .collect();
        let swings = ZigZag::new(ZigZagMode::Close).swings(&closes(&prices), 2.0);

        assert!(swings.len() > 4);
        for w in swings.windows(2) {
            assert!(w[0].index < w[1].index);
            assert_ne!(w[0].kind, w[1].kind);
        }
    }

    #[test]
    fn test_normalize_merges_same_kind_runs() {
        let raw = vec![
            SwingPoint::high(5, 12.0),
            SwingPoint::low(0, 10.0),
            SwingPoint::high(3, 13.0),
            SwingPoint::low(8, f64::NAN),
            SwingPoint::low(9, 9.0),
        ];
        let swings = normalize_swings(raw);

        assert_eq!(
            swings,
            vec![
                SwingPoint::low(0, 10.0),
                SwingPoint::high(3, 13.0),
                SwingPoint::low(9, 9.0),
            ]
        );
    }
}
