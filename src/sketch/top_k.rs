//! Bounded top-k tracking on top of a Count-Min sketch
//!
//! The sketch answers "how often has this key been seen", the tracker keeps
//! the K keys with the highest estimates seen while they were tracked.
//! Membership is "best K seen while tracked", not a globally exact top-k: a
//! new key only displaces the current minimum when its estimate is strictly
//! higher.
//!
//! The min-heap is refreshed lazily. Recording an already-tracked key only
//! updates its estimate in the index; heap entries carrying an older estimate
//! are re-seated when they surface at the top during an eviction check.
//! Estimates never decrease between resets, so a stale entry always sits at or
//! below its true position.

use super::count_min::CountMinSketch;
use crate::error::ConfigError;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::binary_heap::PeekMut;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// One tracked key and its approximate frequency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopKElement {
    pub key: String,
    pub estimate: u64,
}

/// Single-threaded top-k state; see [`TopKTracker`] for the shared version
#[derive(Debug)]
pub struct TopK {
    k: usize,
    sketch: CountMinSketch,
    /// Tracked keys and their latest estimate
    tracked: AHashMap<Arc<str>, u64>,
    /// Min-heap with exactly one entry per tracked key
    heap: BinaryHeap<Reverse<(u64, Arc<str>)>>,
}

impl TopK {
    pub fn new(k: usize, sketch: CountMinSketch) -> Result<Self, ConfigError> {
        if k == 0 {
            return Err(ConfigError::InvalidTopK);
        }
        Ok(TopK {
            k,
            sketch,
            tracked: AHashMap::with_capacity(k),
            heap: BinaryHeap::with_capacity(k),
        })
    }

    /// Build a tracker with a sketch sized for `epsilon` / `delta`.
    pub fn with_error_bounds(k: usize, epsilon: f64, delta: f64) -> Result<Self, ConfigError> {
        Self::new(k, CountMinSketch::new(epsilon, delta)?)
    }

    /// Verify all invariants hold for this tracker
    #[cfg(debug_assertions)]
    pub fn verify_invariants(&self) {
        debug_assert!(
            self.tracked.len() <= self.k,
            "Invariant violated: tracked {} keys but k is {}",
            self.tracked.len(),
            self.k
        );
        debug_assert_eq!(
            self.heap.len(),
            self.tracked.len(),
            "Invariant violated: heap and index disagree on tracked keys"
        );
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    pub fn verify_invariants(&self) {}

    /// Count one occurrence of `key` and update the tracked set.
    pub fn record(&mut self, key: &str) {
        let estimate = self.sketch.increment_and_estimate(key);

        if let Some(current) = self.tracked.get_mut(key) {
            *current = estimate;
        } else if self.tracked.len() < self.k {
            self.track(key, estimate);
        } else if self.current_min().is_some_and(|min| estimate > min) {
            if let Some(Reverse((_, evicted))) = self.heap.pop() {
                self.tracked.remove(&evicted);
            }
            self.track(key, estimate);
        }

        self.verify_invariants();
    }

    fn track(&mut self, key: &str, estimate: u64) {
        let key: Arc<str> = Arc::from(key);
        self.tracked.insert(Arc::clone(&key), estimate);
        self.heap.push(Reverse((estimate, key)));
    }

    /// Smallest tracked estimate, re-seating stale heap entries on the way.
    fn current_min(&mut self) -> Option<u64> {
        loop {
            let mut top = self.heap.peek_mut()?;
            let Reverse((seated, key)) = &mut *top;
            match self.tracked.get(&**key) {
                Some(&current) if current == *seated => return Some(current),
                Some(&current) => *seated = current,
                None => {
                    PeekMut::pop(top);
                }
            }
        }
    }

    /// Snapshot of the tracked keys, in no particular order.
    pub fn elements(&self) -> Vec<TopKElement> {
        self.tracked
            .iter()
            .map(|(key, &estimate)| TopKElement {
                key: key.to_string(),
                estimate,
            })
            .collect()
    }

    /// Sketch estimate for any key, tracked or not.
    pub fn estimate(&self, key: &str) -> u64 {
        self.sketch.estimate(key)
    }

    /// Drop every tracked key and zero the sketch.
    pub fn reset(&mut self) {
        self.tracked.clear();
        self.heap.clear();
        self.sketch.reset();
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    pub fn sketch(&self) -> &CountMinSketch {
        &self.sketch
    }
}

/// [`TopK`] behind a single mutex, shared between recorders and the flush loop
///
/// Every operation holds the lock for its full duration and none of them
/// performs I/O, so critical sections stay short.
#[derive(Debug)]
pub struct TopKTracker {
    inner: Mutex<TopK>,
}

impl TopKTracker {
    pub fn new(top_k: TopK) -> Self {
        TopKTracker {
            inner: Mutex::new(top_k),
        }
    }

    pub fn with_error_bounds(k: usize, epsilon: f64, delta: f64) -> Result<Self, ConfigError> {
        Ok(Self::new(TopK::with_error_bounds(k, epsilon, delta)?))
    }

    #[inline]
    pub fn record(&self, key: &str) {
        self.inner.lock().record(key);
    }

    pub fn elements(&self) -> Vec<TopKElement> {
        self.inner.lock().elements()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn estimate(&self, key: &str) -> u64 {
        self.inner.lock().estimate(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn k(&self) -> usize {
        self.inner.lock().k()
    }
}
