//! Deterministic RNG provider.
//!
//! Every random decision in the simulation draws from a seeded
//! [`ChaCha8Rng`] stream derived from the global game seed plus a string
//! stream key (e.g. `"unclaim:3:4:120"`), so any decision can be replayed
//! identically given the same seed and inputs. Streams are cheap to create
//! and read-only after creation.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Factory for seeded random streams.
#[derive(Clone, Copy, Debug)]
pub struct RngProvider {
    game_seed: u64,
}

impl RngProvider {
    pub fn new(game_seed: u64) -> Self {
        Self { game_seed }
    }

    pub fn game_seed(&self) -> u64 {
        self.game_seed
    }

    /// Derive the seeded stream for a key. The same `(seed, key)` pair
    /// always yields the same sequence.
    pub fn stream(&self, key: &str) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(mix_seed(self.game_seed, key))
    }
}

/// SplitMix64-style mixing of the game seed with the stream key bytes.
fn mix_seed(seed: u64, key: &str) -> u64 {
    let mut h = seed;
    for b in key.bytes() {
        h = h.wrapping_add(u64::from(b));
        h = h.wrapping_mul(0xbf58476d1ce4e5b9);
    }
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d049bb133111eb);
    h ^ (h >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_key_replays_identically() {
        let provider = RngProvider::new(42);
        let a: Vec<u32> = provider.stream("hero:1:5").sample_iter(rand::distributions::Standard).take(8).collect();
        let b: Vec<u32> = provider.stream("hero:1:5").sample_iter(rand::distributions::Standard).take(8).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn different_keys_diverge() {
        let provider = RngProvider::new(42);
        let a: u64 = provider.stream("unclaim:3:4:10").gen();
        let b: u64 = provider.stream("unclaim:3:4:11").gen();
        // Not guaranteed for every pair, but a collision here would point
        // at broken mixing.
        assert_ne!(a, b);
    }

    #[test]
    fn different_seeds_diverge() {
        let a: u64 = RngProvider::new(1).stream("k").gen();
        let b: u64 = RngProvider::new(2).stream("k").gen();
        assert_ne!(a, b);
    }
}
