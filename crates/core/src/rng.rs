use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::collections::VecDeque;

/// Implementations must be fully determined by construction so sessions
/// replay exactly.
pub trait EntropySource: std::fmt::Debug + Send {
    fn next_u64(&mut self) -> u64;

    // Uniform in [0, 1) with 53 bits of precision.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

#[derive(Debug, Clone)]
pub struct RngState {
    seed: u64,
    rng: StdRng,
}

impl RngState {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl EntropySource for RngState {
    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

// Plays back a fixed queue of values, then zeroes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEntropy {
    queue: VecDeque<u64>,
}

impl ScriptedEntropy {
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        Self {
            queue: values.into_iter().collect(),
        }
    }

    pub fn push(&mut self, value: u64) {
        self.queue.push_back(value);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl EntropySource for ScriptedEntropy {
    fn next_u64(&mut self) -> u64 {
        self.queue.pop_front().unwrap_or(0)
    }
}

pub fn pick_weighted<T: Clone>(
    items: impl Iterator<Item = (T, u32)>,
    rng: &mut dyn EntropySource,
) -> Option<T> {
    let items: Vec<(T, u32)> = items.filter(|(_, w)| *w > 0).collect();
    let total: u32 = items.iter().map(|(_, w)| *w).sum();
    if total == 0 {
        return None;
    }
    let mut roll = (rng.next_u64() % total as u64) as u32;
    for (item, weight) in items {
        if roll < weight {
            return Some(item);
        }
        roll -= weight;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sequences_repeat() {
        let mut a = RngState::from_seed(7);
        let mut b = RngState::from_seed(7);
        assert_eq!(a.seed(), 7);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn scripted_queue_plays_back_then_zeroes() {
        let mut src = ScriptedEntropy::new([3, 9]);
        assert_eq!(src.remaining(), 2);
        assert_eq!(src.next_u64(), 3);
        src.push(4);
        assert_eq!(src.next_u64(), 9);
        assert_eq!(src.next_u64(), 4);
        assert_eq!(src.remaining(), 0);
        assert_eq!(src.next_u64(), 0);
    }

    #[test]
    fn weighted_pick_walks_cumulative_ranges() {
        let items = [("a", 2u32), ("b", 3), ("c", 5)];
        let mut src = ScriptedEntropy::new([0, 1, 2, 4, 5, 9]);
        let picks: Vec<_> = (0..6)
            .filter_map(|_| pick_weighted(items.iter().cloned(), &mut src))
            .collect();
        assert_eq!(picks, ["a", "a", "b", "b", "c", "c"]);
    }

    #[test]
    fn weighted_pick_skips_zero_weights() {
        let items = [("dead", 0u32), ("live", 1)];
        let mut src = ScriptedEntropy::new([0]);
        assert_eq!(pick_weighted(items.iter().cloned(), &mut src), Some("live"));
    }
}
