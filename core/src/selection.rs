//! The weighted random draw underlying every discrete choice in the core.

use std::collections::BTreeMap;

use crate::rng::SubsystemRng;

/// Total of the non-negative weights. Negative or NaN weights count as zero.
pub fn total_weight<K>(candidates: &[(K, f64)]) -> f64 {
    candidates.iter().map(|(_, w)| sanitize(*w)).sum()
}

/// Select one key with probability proportional to its weight.
///
/// Draws `u ~ Uniform(0, ΣW)` and returns the first key, in slice order,
/// whose cumulative weight exceeds `u`. Returns `None` when `ΣW <= 0`;
/// callers map that to their own "no outcome" sentinel.
pub fn select_weighted<K: Copy>(candidates: &[(K, f64)], rng: &mut SubsystemRng) -> Option<K> {
    let total = total_weight(candidates);
    if total <= 0.0 {
        return None;
    }

    let u = rng.next_f64() * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (key, weight) in candidates {
        let w = sanitize(*weight);
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(*key);
        if cumulative > u {
            return Some(*key);
        }
    }
    // Rounding can leave u a hair above the final cumulative sum.
    last_positive
}

/// Weighted draw over an ordered map; iteration order is the key order.
pub fn select_from_map<K: Copy + Ord>(weights: &BTreeMap<K, f64>, rng: &mut SubsystemRng) -> Option<K> {
    let candidates: Vec<(K, f64)> = weights.iter().map(|(k, w)| (*k, *w)).collect();
    select_weighted(&candidates, rng)
}

/// Binary move/stay style draw over `{p, 1 - p}`. Returns true for the first option.
pub fn draw_binary(p: f64, rng: &mut SubsystemRng) -> bool {
    let p = sanitize(p).min(1.0);
    select_weighted(&[(true, p), (false, 1.0 - p)], rng).unwrap_or(false)
}

fn sanitize(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 { weight } else { 0.0 }
}
