//! Helpers layered over [`DeterministicRng`].

use fable_core::rng::DeterministicRng;

/// Returns an index in `[min, max]` inclusive.
pub fn index_in(rng: &mut dyn DeterministicRng, min: usize, max: usize) -> usize {
    let lo = u32::try_from(min).unwrap_or(u32::MAX);
    let hi = u32::try_from(max).unwrap_or(u32::MAX);
    usize::try_from(rng.next_u32_range(lo, hi)).map_or(min, |value| value.clamp(min, max.max(min)))
}

/// Fisher–Yates shuffle driven by the injected RNG.
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn DeterministicRng) {
    for i in (1..items.len()).rev() {
        let j = index_in(rng, 0, i);
        items.swap(i, j);
    }
}

/// Picks an index with probability proportional to its weight.
///
/// Returns `None` when no weight is positive.
pub fn choose_weighted(weights: &[f64], rng: &mut dyn DeterministicRng) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 {
        return None;
    }
    let roll = rng.next_f64() * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (index, weight) in weights.iter().enumerate() {
        if *weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        last_positive = Some(index);
        if roll < cumulative {
            return Some(index);
        }
    }
    last_positive
}
