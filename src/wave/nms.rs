//! Non-maximum suppression over bar spans

use tracing::debug;

use super::WavePattern;

/// Intersection over hull of two `[start, end)` spans.
///
/// Disjoint or degenerate spans give 0.
#[inline]
pub fn overlap_ratio(a: (usize, usize), b: (usize, usize)) -> f64 {
    let (a0, a1) = a;
    let (b0, b1) = b;
    let inter = a1.min(b1).saturating_sub(a0.max(b0));
    let union = a1.max(b1).saturating_sub(a0.min(b0));
    if union == 0 {
        return 0.0;
    }
    inter as f64 / union as f64
}

/// Keep the best-scoring items whose spans overlap every kept item by less
/// than `overlap_thresh`, at most `max_keep` of them.
pub fn nms_by_span<T>(
    items: Vec<T>,
    span: impl Fn(&T) -> (usize, usize),
    score: impl Fn(&T) -> f64,
    overlap_thresh: f64,
    max_keep: usize,
) -> Vec<T> {
    debug!(items = items.len(), overlap_thresh, max_keep, "nms start");

    let mut ordered = items;
    ordered.sort_by(|a, b| score(b).total_cmp(&score(a)));

    let mut kept: Vec<T> = Vec::new();
    for it in ordered {
        if kept.len() >= max_keep {
            break;
        }
        let sp = span(&it);
        if kept.iter().all(|k| overlap_ratio(sp, span(k)) < overlap_thresh) {
            kept.push(it);
        }
    }

    debug!(kept = kept.len(), "nms done");
    kept
}

/// NMS over patterns by `meta.score`
pub fn dedupe_patterns(patterns: Vec<WavePattern>, overlap_thresh: f64, max_keep: usize) -> Vec<WavePattern> {
    nms_by_span(patterns, WavePattern::span, |p| p.meta.score, overlap_thresh, max_keep)
}
