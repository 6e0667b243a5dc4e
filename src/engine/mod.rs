//! Top-K Engine
//!
//! Owns a [`TopKTracker`], a sink and the background flush loop. Recording is
//! synchronous and lock-bounded; flushing runs on a tokio task.
//!
//! ## Architecture
//!
//! ```text
//! Recorder 1 ──┐
//! Recorder 2 ──┤── encode ──► TopKTracker (mutex) ◄── flush loop ──► sink
//! Recorder 3 ──┘
//! ```
//!
//! There is no process-wide default engine: construct one with
//! [`TopKEngine::start`] and hand out [`Recorder`] clones to the hot paths.

mod config;
mod flusher;
mod sink;

pub use config::{
    EngineConfig, ENV_DELTA, ENV_EPSILON, ENV_FLUSH_INTERVAL_MS, ENV_TOP_K,
};
pub use flusher::FlushReport;
pub use sink::{ChannelSink, CollectingSink, Emission, FnSink, MetricSink, TracingSink};

use crate::error::{ConfigError, EngineError};
use crate::metrics::{MetricIdentity, MetricKeyEncoder, TagSet};
use crate::sketch::TopKTracker;
use flusher::Flusher;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cheap, cloneable handle for the hot recording path
#[derive(Debug, Clone)]
pub struct Recorder {
    tracker: Arc<TopKTracker>,
}

impl Recorder {
    /// Count one event for `(name, tags)`. Never fails and never performs I/O.
    ///
    /// An empty `name` breaks the caller contract and the event is dropped.
    #[inline]
    pub fn record(&self, name: &str, tags: &TagSet) {
        if name.is_empty() {
            return;
        }
        let key = MetricKeyEncoder::encode(name, tags);
        self.tracker.record(&key);
    }

    pub fn record_identity(&self, identity: &MetricIdentity) {
        self.record(&identity.name, &identity.tags);
    }
}

/// A running top-k engine
pub struct TopKEngine {
    recorder: Recorder,
    cancel: CancellationToken,
    task: JoinHandle<Result<FlushReport, EngineError>>,
}

impl TopKEngine {
    /// Validate `config`, build the tracker and start the flush loop.
    ///
    /// The loop runs until `cancel` fires, then performs one final flush.
    /// Must be called from within a tokio runtime.
    pub fn start<S>(
        config: &EngineConfig,
        sink: S,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError>
    where
        S: MetricSink + 'static,
    {
        config.validate()?;
        let tracker = Arc::new(TopKTracker::with_error_bounds(
            config.top_k,
            config.epsilon,
            config.delta,
        )?);

        let flusher = Flusher::new(
            tracker.clone(),
            sink,
            config.flush_interval,
            cancel.clone(),
        );
        let task = tokio::spawn(flusher.run());

        Ok(TopKEngine {
            recorder: Recorder { tracker },
            cancel,
            task,
        })
    }

    #[inline]
    pub fn record(&self, name: &str, tags: &TagSet) {
        self.recorder.record(name, tags);
    }

    pub fn record_identity(&self, identity: &MetricIdentity) {
        self.recorder.record_identity(identity);
    }

    /// A handle that can be moved into other threads or tasks
    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True once the flush loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the flush loop and wait for its final flush.
    pub async fn shutdown(self) -> Result<FlushReport, EngineError> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the flush loop to exit without cancelling it.
    pub async fn join(self) -> Result<FlushReport, EngineError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(EngineError::TaskFailed(e.to_string())),
        }
    }
}

impl std::fmt::Debug for TopKEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopKEngine")
            .field("k", &self.recorder.tracker.k())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
