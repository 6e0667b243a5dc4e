//! Count-Min sketch for per-interval frequency estimation
//!
//! `depth` rows of `width` saturating counters, stored flat. Every row has its
//! own seeded hasher; a point query returns the minimum over the rows, which is
//! never below the true count and exceeds it by more than `epsilon * total`
//! with probability at most `delta`.
//!
//! ```text
//! increment(key)
//!     row 0: counters[0 * width + h0(key) % width] += 1
//!     row 1: counters[1 * width + h1(key) % width] += 1
//!     ...
//! estimate(key) = min over rows
//! ```

use crate::error::ConfigError;
use ahash::RandomState;
use std::f64::consts::E;
use std::fmt;
use std::hash::{BuildHasher, Hash};

/// Upper bound on `depth * width`; 64M counters is 512 MiB of `u64`s.
pub const MAX_COUNTERS: usize = 1 << 26;

const SEED_MULTIPLIER: u64 = 0x517c_c1b7_2722_0a95;
const SEED_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Fixed-memory approximate frequency counter
#[derive(Clone)]
pub struct CountMinSketch {
    counters: Vec<u64>,
    width: usize,
    depth: usize,
    hashers: Vec<RandomState>,
    total: u64,
}

impl CountMinSketch {
    /// Size a sketch for error bound `epsilon` (fraction of total increments)
    /// holding with probability at least `1 - delta`.
    pub fn new(epsilon: f64, delta: f64) -> Result<Self, ConfigError> {
        if !(epsilon > 0.0 && epsilon.is_finite()) {
            return Err(ConfigError::InvalidEpsilon(epsilon));
        }
        if !(delta > 0.0 && delta.is_finite()) {
            return Err(ConfigError::InvalidDelta(delta));
        }
        Self::with_dimensions(Self::suggest_depth(delta), Self::suggest_width(epsilon))
    }

    /// Build a sketch with explicit row count and row width.
    pub fn with_dimensions(depth: usize, width: usize) -> Result<Self, ConfigError> {
        if depth == 0 || width == 0 {
            return Err(ConfigError::InvalidDimensions { depth, width });
        }
        match depth.checked_mul(width) {
            Some(cells) if cells <= MAX_COUNTERS => {}
            _ => return Err(ConfigError::SketchTooLarge { depth, width }),
        }

        let hashers = (0..depth as u64)
            .map(|row| {
                let seed = SEED_MULTIPLIER.wrapping_mul(row + 1);
                RandomState::with_seeds(
                    seed,
                    seed ^ SEED_MIX,
                    seed.rotate_left(21),
                    seed.rotate_left(43) ^ SEED_MIX,
                )
            })
            .collect();

        Ok(CountMinSketch {
            counters: vec![0; depth * width],
            width,
            depth,
            hashers,
            total: 0,
        })
    }

    /// Row width for a relative error of `epsilon`: `ceil(e / epsilon)`.
    pub fn suggest_width(epsilon: f64) -> usize {
        (E / epsilon).ceil().max(1.0) as usize
    }

    /// Row count for a failure probability of `delta`: `ceil(ln(1 / delta))`.
    pub fn suggest_depth(delta: f64) -> usize {
        (1.0 / delta).ln().ceil().max(1.0) as usize
    }

    #[inline]
    fn cell(&self, row: usize, key: &(impl Hash + ?Sized)) -> usize {
        let column = BuildHasher::hash_one(&self.hashers[row], key) % self.width as u64;
        row * self.width + column as usize
    }

    /// Count one occurrence of `key`.
    pub fn increment<K: Hash + ?Sized>(&mut self, key: &K) {
        self.increment_and_estimate(key);
    }

    /// Count one occurrence of `key` and return its updated estimate.
    pub fn increment_and_estimate<K: Hash + ?Sized>(&mut self, key: &K) -> u64 {
        let mut estimate = u64::MAX;
        for row in 0..self.depth {
            let idx = self.cell(row, key);
            let counter = &mut self.counters[idx];
            *counter = counter.saturating_add(1);
            estimate = estimate.min(*counter);
        }
        self.total = self.total.saturating_add(1);
        estimate
    }

    /// Approximate count of `key` since the last reset.
    pub fn estimate<K: Hash + ?Sized>(&self, key: &K) -> u64 {
        (0..self.depth)
            .map(|row| self.counters[self.cell(row, key)])
            .min()
            .unwrap_or(0)
    }

    /// Zero every counter.
    pub fn reset(&mut self) {
        self.counters.fill(0);
        self.total = 0;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Increments since the last reset.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Expected overcount as a fraction of [`total`](Self::total).
    pub fn relative_error(&self) -> f64 {
        E / self.width as f64
    }
}

impl fmt::Debug for CountMinSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountMinSketch")
            .field("width", &self.width)
            .field("depth", &self.depth)
            .field("total", &self.total)
            .finish()
    }
}
