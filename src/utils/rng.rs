//! Simple random number generator for reproducible noise layers.
//!
//! A lightweight xorshift PRNG: a noise layer seeded with the same value
//! produces the same sequence of fields across runs.

use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_STATE: u64 = 0x9e3779b97f4a7c15;

/// Xorshift generator.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { DEFAULT_STATE } else { seed };
        Self { state }
    }

    /// Create an RNG seeded from the current time.
    pub fn from_time() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self::new(nanos)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform sample in [0, 1) with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform sample in [low, high).
    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Fill `data` with uniform samples in [low, high).
    pub fn fill_uniform(&mut self, data: &mut [f64], low: f64, high: f64) {
        for value in data.iter_mut() {
            *value = self.gen_range_f64(low, high);
        }
    }
}
