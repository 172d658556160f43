//! Selection randomness.
//!
//! RULE: Nothing in the engine may call a platform RNG directly.
//! Every random draw (shuffles and `chance` triggers) flows through a
//! `SelectionRng` handed in by the caller:
//!   - Inbox selection uses a generator seeded from (month, coarse balance),
//!     so a reload of the same month reproduces the same picks.
//!   - Chat selection uses the engine's own generator, which is seeded
//!     from entropy unless a fixed seed is injected.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

const GOLDEN: u64 = 0x9e37_79b9_7f4a_7c15;

/// A named, injectable random stream.
pub struct SelectionRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SelectionRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            name: "seeded",
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            name: "entropy",
            inner: Pcg64Mcg::from_entropy(),
        }
    }

    /// The inbox policy: a pure function of the month and the whole-unit
    /// balance at seeding time.
    pub fn for_inbox(month: u32, balance: f64) -> Self {
        Self::seeded(inbox_seed(month, balance)).with_name("inbox")
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Fisher-Yates, in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_u64_below(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }
}

/// Seed for the inbox policy. Balance is floored to whole units; a NaN or
/// infinite balance collapses to zero.
pub fn inbox_seed(month: u32, balance: f64) -> u64 {
    let coarse = if balance.is_finite() { balance.floor() as i64 } else { 0 };
    (month as u64).wrapping_mul(GOLDEN) ^ (coarse as u64).wrapping_add(GOLDEN.rotate_left(17))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_stream_depends_only_on_month_and_whole_balance() {
        let mut a = SelectionRng::for_inbox(3, 120.10);
        let mut b = SelectionRng::for_inbox(3, 120.95);
        let mut c = SelectionRng::for_inbox(4, 120.10);
        let xs: Vec<u64> = (0..4).map(|_| a.next_u64_below(1000)).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.next_u64_below(1000)).collect();
        let zs: Vec<u64> = (0..4).map(|_| c.next_u64_below(1000)).collect();
        assert_eq!(xs, ys);
        assert_ne!(xs, zs);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = SelectionRng::seeded(7);
        let mut items: Vec<u32> = (0..20).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }
}
