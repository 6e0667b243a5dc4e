//! Approximate frequency counting
//!
//! - [`CountMinSketch`]: fixed-memory counter matrix, never underestimates
//! - [`TopK`]: the K highest-estimate keys backed by a sketch
//! - [`TopKTracker`]: [`TopK`] behind one lock for concurrent recorders

mod count_min;
mod top_k;

pub use count_min::{CountMinSketch, MAX_COUNTERS};
pub use top_k::{TopK, TopKElement, TopKTracker};
