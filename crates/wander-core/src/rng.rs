//! Deterministic PRNG shared by the evolution and walk phases.
//!
//! Uses the SplitMix64 algorithm: fast, 8 bytes of state, excellent
//! statistical properties, and identical output on every platform. The
//! algorithm is part of the simulation contract: two runs with the same seed
//! must draw the same sequence.

/// SplitMix64 pseudo-random number generator.
///
/// A simulation owns exactly one of these and threads it by `&mut` through
/// every phase that needs randomness.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform `f64` in `[0, 1)` built from the top 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform index in `[0, n)`. Returns 0 when `n` is 0 or 1 without
    /// consuming any state.
    ///
    /// Uses rejection sampling so every index is exactly equally likely.
    pub fn below(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        let n = n as u64;
        let zone = u64::MAX - (u64::MAX % n);
        loop {
            let r = self.next_u64();
            if r < zone {
                return (r % n) as usize;
            }
        }
    }

    /// Uniform `f64` in `[lo, hi)`. Returns `lo` without drawing when the
    /// range is empty.
    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.next_f64()
    }

    /// Returns `true` with the given probability.
    ///
    /// - probability <= 0 always returns false
    /// - probability >= 1 always returns true
    ///
    /// Neither boundary case consumes state.
    pub fn chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.next_f64() < probability
    }

    /// Draw an index with probability proportional to `weights[i]`.
    ///
    /// Non-finite and non-positive weights count as zero. Returns `None`
    /// (without drawing) when no weight is positive.
    pub fn choose_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        let usable = |w: f64| w.is_finite() && w > 0.0;
        let total: f64 = weights.iter().copied().filter(|&w| usable(w)).sum();
        if !(total.is_finite() && total > 0.0) {
            return None;
        }
        let mut target = self.next_f64() * total;
        let mut last = None;
        for (i, &w) in weights.iter().enumerate() {
            if !usable(w) {
                continue;
            }
            if target < w {
                return Some(i);
            }
            target -= w;
            last = Some(i);
        }
        // Rounding can leave a sliver past the final bucket.
        last
    }

    /// Get the internal state (for hashing).
    pub fn state(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let mut a = SimRng::new(42);
        let mut b = SimRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_differ() {
        let mut a = SimRng::new(1);
        let mut b = SimRng::new(2);
        // Extremely unlikely to match.
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn next_f64_in_unit_interval() {
        let mut rng = SimRng::new(7);
        for _ in 0..10_000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn below_stays_in_range() {
        let mut rng = SimRng::new(3);
        for n in 1..50 {
            for _ in 0..50 {
                assert!(rng.below(n) < n);
            }
        }
    }

    #[test]
    fn below_trivial_ranges_do_not_draw() {
        let mut rng = SimRng::new(5);
        let before = rng.state();
        assert_eq!(rng.below(0), 0);
        assert_eq!(rng.below(1), 0);
        assert_eq!(rng.state(), before);
    }

    #[test]
    fn chance_zero_always_false() {
        let mut rng = SimRng::new(999);
        for _ in 0..100 {
            assert!(!rng.chance(0.0));
        }
    }

    #[test]
    fn chance_one_always_true() {
        let mut rng = SimRng::new(999);
        for _ in 0..100 {
            assert!(rng.chance(1.0));
        }
    }

    #[test]
    fn chance_boundaries_do_not_draw() {
        let mut rng = SimRng::new(999);
        let before = rng.state();
        rng.chance(-1.0);
        rng.chance(2.0);
        assert_eq!(rng.state(), before);
    }

    #[test]
    fn chance_half_roughly_balanced() {
        let mut rng = SimRng::new(12345);
        let trials = 10_000;
        let mut hits = 0u32;
        for _ in 0..trials {
            if rng.chance(0.5) {
                hits += 1;
            }
        }
        // Expect ~5000 +/- 300 (very generous tolerance).
        assert!((4000..=6000).contains(&hits), "expected ~5000, got {hits}");
    }

    #[test]
    fn choose_weighted_skips_zero_weights() {
        let mut rng = SimRng::new(11);
        for _ in 0..1_000 {
            let idx = rng.choose_weighted(&[0.0, 2.0, 0.0, 1.0]).unwrap();
            assert!(idx == 1 || idx == 3);
        }
    }

    #[test]
    fn choose_weighted_all_zero_is_none() {
        let mut rng = SimRng::new(11);
        let before = rng.state();
        assert_eq!(rng.choose_weighted(&[0.0, 0.0]), None);
        assert_eq!(rng.choose_weighted(&[]), None);
        assert_eq!(rng.choose_weighted(&[f64::NAN, -1.0]), None);
        assert_eq!(rng.state(), before);
    }

    #[test]
    fn choose_weighted_follows_proportions() {
        let mut rng = SimRng::new(2024);
        let mut counts = [0u32; 2];
        for _ in 0..20_000 {
            counts[rng.choose_weighted(&[1.0, 3.0]).unwrap()] += 1;
        }
        // Expect a 1:3 split, i.e. ~5000 vs ~15000.
        assert!((4_300..=5_700).contains(&counts[0]), "got {counts:?}");
    }

    #[test]
    fn serialization_round_trip() {
        let mut rng = SimRng::new(42);
        // Advance state.
        for _ in 0..50 {
            rng.next_u64();
        }

        let json = serde_json::to_string(&rng).unwrap();
        let restored: SimRng = serde_json::from_str(&json).unwrap();
        assert_eq!(rng, restored);

        // Continue sequence — should match.
        let mut rng2 = restored;
        for _ in 0..10 {
            assert_eq!(rng.next_u64(), rng2.next_u64());
        }
    }
}
