//! Picks a representative point among sources that agree on a country.

use crate::range::Coordinates;

/// A coordinate observation attributed to its source.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub source: &'a str,
    pub coords: &'a Coordinates,
}

/// Choose among `candidates`, which must be in `coord_priority` order.
///
/// With fewer than three entries the first wins outright. Otherwise, if
/// every pair lies within `threshold` (planar degrees) the first still wins,
/// which keeps neighbouring segments identical and lets them coalesce.
/// Past that, the entry with the smallest summed distance to the others
/// wins; ties go to the earlier entry.
pub fn pick_center<'c, 'a>(candidates: &'c [Candidate<'a>], threshold: f64) -> Option<&'c Candidate<'a>> {
    if candidates.len() < 3 {
        return candidates.first();
    }

    let mut max_spread = 0.0_f64;
    for (i, a) in candidates.iter().enumerate() {
        for b in &candidates[i + 1..] {
            max_spread = max_spread.max(a.coords.planar_distance(b.coords));
        }
    }
    if max_spread <= threshold {
        return candidates.first();
    }

    let mut best = 0;
    let mut best_total = f64::INFINITY;
    for (i, a) in candidates.iter().enumerate() {
        let total: f64 = candidates
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, b)| a.coords.planar_distance(b.coords))
            .sum();
        if total < best_total {
            best_total = total;
            best = i;
        }
    }
    candidates.get(best)
}
