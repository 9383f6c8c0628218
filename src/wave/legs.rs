//! Leg builder: swing points to monowaves

use crate::swing::SwingPoint;

use super::Leg;

/// Coalesce swing points into legs.
///
/// Points are sorted by index and downsampled to every `skip + 1`-th point;
/// the final point is always kept. Legs moving less than `min_abs_move` are
/// dropped when `min_abs_move > 0`. Fewer than two usable points yield no legs.
pub fn build_legs(points: &[SwingPoint], skip: usize, min_abs_move: f64) -> Vec<Leg> {
    let mut pts: Vec<(usize, f64)> = points
        .iter()
        .filter(|p| p.price.is_finite())
        .map(|p| (p.index, p.price))
        .collect();
    if pts.len() < 2 {
        return Vec::new();
    }
    pts.sort_by_key(|&(idx, _)| idx);

    let step = skip.saturating_add(1);
    let mut kept: Vec<(usize, f64)> = pts.iter().copied().step_by(step).collect();
    if let (Some(&last_kept), Some(&last)) = (kept.last(), pts.last()) {
        if last_kept != last {
            kept.push(last);
        }
    }

    kept.windows(2)
        .filter(|w| w[1].0 > w[0].0)
        .map(|w| Leg::new(w[0].0, w[1].0, w[0].1, w[1].1))
        .filter(|leg| !(min_abs_move > 0.0 && leg.magnitude() < min_abs_move))
        .collect()
}
