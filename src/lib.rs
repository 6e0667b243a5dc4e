//! Streaming Top-K frequency estimation for metric identities.
//!
//! Events are `(name, tags)` pairs. Each one is encoded into a canonical key,
//! counted in a Count-Min sketch, and considered for a bounded top-k set. On
//! every flush interval the engine reports the surviving keys with their
//! approximate counts to a [`MetricSink`] and starts the next interval from
//! an empty state.
//!
//! ```no_run
//! use metric_topk::{EngineConfig, TagSet, TopKEngine, TracingSink};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cancel = CancellationToken::new();
//! let engine = TopKEngine::start(&EngineConfig::default(), TracingSink, cancel.clone())?;
//!
//! let tags = TagSet::from_pairs(&[("region", "us"), ("method", "get")]);
//! engine.record("http.requests", &tags);
//!
//! let report = engine.shutdown().await?;
//! assert_eq!(report.emitted, 1);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod metrics;
pub mod sketch;

pub use engine::{
    ChannelSink, CollectingSink, Emission, EngineConfig, FlushReport, FnSink, MetricSink,
    Recorder, TopKEngine, TracingSink,
};
pub use error::{ConfigError, EngineError, MalformedKeyError};
pub use metrics::{MetricIdentity, MetricKeyEncoder, TagSet};
pub use sketch::{CountMinSketch, TopK, TopKElement, TopKTracker};
