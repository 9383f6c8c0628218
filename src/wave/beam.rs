//! Budgeted beam search and the five-leg candidate generator

use tracing::debug;

use super::helpers::{GAP_PENALTY, SCORE_INVALID, SCORE_MISALIGNED, SCORE_OVERFLOW};
use super::rules::check_impulse;
use super::scorer::{score_impulse, ScoreConfig};
use super::Leg;
use crate::Direction;

/// Beam search limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamConfig {
    /// Prefixes kept per layer (at least one is always kept)
    pub beam_width: usize,
    /// Global cap on scored prefixes across all layers
    pub max_candidates: usize,
    /// Entries returned from the final beam
    pub max_patterns: usize,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            beam_width: 256,
            max_candidates: 5000,
            max_patterns: 50,
        }
    }
}

/// Scored prefix held in the beam
#[derive(Debug, Clone, PartialEq)]
pub struct BeamEntry<T> {
    pub items: Vec<T>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeamOutcome<T> {
    /// Final beam, best first
    pub entries: Vec<BeamEntry<T>>,
    /// Number of prefixes scored
    pub generated: usize,
    /// The search stopped on the budget rather than running out of layers
    pub exhausted: bool,
}

/// Select tuples with one item per layer, keeping the best `beam_width`
/// prefixes after each layer.
///
/// Every prefix of every layer is scored with `score`. Ties keep generation
/// order. Scoring stops as soon as `max_candidates` prefixes have been scored,
/// even in the middle of a layer, and whatever the beam holds then is returned.
pub fn beam_search<T, F>(layers: &[Vec<T>], mut score: F, cfg: &BeamConfig) -> BeamOutcome<T>
where
    T: Copy,
    F: FnMut(&[T]) -> f64,
{
    debug!(
        layers = layers.len(),
        beam_width = cfg.beam_width,
        max_candidates = cfg.max_candidates,
        max_patterns = cfg.max_patterns,
        "beam start"
    );

    let mut beam: Vec<BeamEntry<T>> = vec![BeamEntry {
        items: Vec::new(),
        score: 0.0,
    }];
    let mut generated = 0usize;
    let mut exhausted = false;

    for (li, layer) in layers.iter().enumerate() {
        let room = cfg.max_candidates.saturating_sub(generated);
        let mut next: Vec<BeamEntry<T>> = Vec::with_capacity(beam.len().saturating_mul(layer.len()).min(room));
        'expand: for entry in &beam {
            for &item in layer {
                if generated >= cfg.max_candidates {
                    break 'expand;
                }
                let mut items = Vec::with_capacity(entry.items.len() + 1);
                items.extend_from_slice(&entry.items);
                items.push(item);
                let s = score(&items);
                next.push(BeamEntry { items, score: s });
                generated += 1;
            }
        }

        next.sort_by(|a, b| b.score.total_cmp(&a.score));
        next.truncate(cfg.beam_width.max(1));
        beam = next;
        debug!(layer = li, beam_out = beam.len(), generated, "beam layer");

        if generated >= cfg.max_candidates {
            exhausted = true;
            break;
        }
    }

    beam.truncate(cfg.max_patterns);
    debug!(out = beam.len(), generated, exhausted, "beam done");

    BeamOutcome {
        entries: beam,
        generated,
        exhausted,
    }
}

/// Beam-only penalty for sparse leg selection
#[inline]
pub fn gap_penalty(gaps: &[usize]) -> f64 {
    GAP_PENALTY * gaps.iter().map(|&g| g.saturating_sub(1) as f64).sum::<f64>()
}

// ============================================================
// IMPULSE CANDIDATES
// ============================================================

/// Five absolute leg indices and their beam score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub legs: [usize; 5],
    /// Pattern score minus the gap penalty
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSearch {
    pub candidates: Vec<Candidate>,
    pub generated: usize,
    pub budget_exhausted: bool,
    /// Entries left in the final beam, partial or not
    pub beam_kept: usize,
}

/// Absolute leg indices of a (start, gap, gap, ...) prefix
fn resolve(prefix: &[usize]) -> Vec<usize> {
    let mut idxs = Vec::with_capacity(prefix.len());
    if let Some((&first, gaps)) = prefix.split_first() {
        idxs.push(first);
        let mut at = first;
        for &g in gaps {
            at = at.saturating_add(g);
            idxs.push(at);
        }
    }
    idxs
}

/// Search five-leg impulse candidates over `legs`.
///
/// Layer 0 picks the starting leg, layers 1-4 pick a gap of `1..=max_gap + 1`
/// legs to the next pattern leg.
pub fn generate_candidates(
    legs: &[Leg],
    max_gap: usize,
    cfg: &BeamConfig,
    score_cfg: &ScoreConfig,
    strict_wave4: bool,
) -> CandidateSearch {
    let n = legs.len();
    if n < 5 {
        return CandidateSearch::default();
    }

    let mut layers: Vec<Vec<usize>> = Vec::with_capacity(5);
    layers.push((0..n - 4).collect());
    // a gap of n or more always overflows the leg array
    let gap_max = max_gap.min(n).saturating_add(1);
    for _ in 0..4 {
        layers.push((1..=gap_max).collect());
    }

    let score_prefix = |prefix: &[usize]| -> f64 {
        let idxs = resolve(prefix);
        match idxs.last() {
            None => return 0.0,
            Some(&last) if last >= n => return SCORE_OVERFLOW,
            Some(_) => {}
        }

        if let Ok(window) = <[usize; 5]>::try_from(idxs.as_slice()) {
            let window = window.map(|i| legs[i]);
            return match check_impulse(&window, strict_wave4) {
                Some(flags) => score_impulse(&window, flags.w4_overlap, score_cfg) - gap_penalty(&prefix[1..]),
                None => SCORE_INVALID,
            };
        }

        if idxs.len() >= 2 {
            let s = legs[idxs[0]].direction();
            for (k, &i) in idxs.iter().enumerate() {
                let d = legs[i].direction();
                if d == Direction::Neutral {
                    return SCORE_OVERFLOW;
                }
                let expected = if k % 2 == 0 { s } else { s.opposite() };
                if d != expected {
                    return SCORE_MISALIGNED;
                }
            }
        }
        0.0
    };

    let outcome = beam_search(&layers, score_prefix, cfg);

    let candidates = outcome
        .entries
        .iter()
        .filter_map(|e| {
            let idxs = <[usize; 5]>::try_from(resolve(&e.items).as_slice()).ok()?;
            (idxs[4] < n).then_some(Candidate {
                legs: idxs,
                score: e.score,
            })
        })
        .collect();

    CandidateSearch {
        candidates,
        generated: outcome.generated,
        budget_exhausted: outcome.exhausted,
        beam_kept: outcome.entries.len(),
    }
}
