//! xorshift64* random number generator
//!
//! Fast, deterministic PRNG backing every stochastic draw in the lending
//! simulation: group choice, cluster choice, default outcome and features.
//!
//! # Determinism
//!
//! Same seed → same sequence of applicants. The generator is `Serialize` so
//! a state snapshot records the exact stream position it was taken at.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use lending_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let u = rng.next_f64();
/// assert!((0.0..1.0).contains(&u));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit, never zero)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is mapped to 1, since xorshift has a fixed point at zero.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Current internal state, usable as a seed to resume the stream
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Bernoulli trial: true with probability `p`
    ///
    /// Consumes exactly one draw regardless of `p`.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Sample from standard normal distribution using Box-Muller transform.
    ///
    /// Consumes exactly two draws.
    pub fn standard_normal(&mut self) -> f64 {
        // 1 - u keeps the argument of ln in (0, 1]
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Pick an index with probability proportional to `weights`.
    ///
    /// Consumes exactly one draw. Entries with zero weight are never chosen.
    /// Returns `None` when no entry has positive weight.
    ///
    /// # Example
    /// ```
    /// use lending_simulator_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(7);
    /// let idx = rng.choose_weighted(&[0.0, 1.0, 0.0]);
    /// assert_eq!(idx, Some(1));
    /// ```
    pub fn choose_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        let last_positive = weights.iter().rposition(|w| *w > 0.0)?;

        let target = self.next_f64() * total;
        let mut cumulative = 0.0;
        for (idx, weight) in weights.iter().enumerate() {
            if *weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            if target < cumulative {
                return Some(idx);
            }
        }

        // Rounding left target at the very top of the range
        Some(last_positive)
    }
}
