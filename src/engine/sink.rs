//! Downstream sinks for flushed top-k estimates
//!
//! The engine calls [`MetricSink::emit`] once per surfaced key on every flush,
//! outside the tracker lock. A sink owns its own delivery guarantees: the
//! engine never retries, times out, or inspects the outcome of an emission.

use crate::metrics::TagSet;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Receives `(name, approximate count, tags)` for every reported key
pub trait MetricSink: Send + Sync {
    fn emit(&self, name: &str, count: u64, tags: &TagSet);
}

impl<S: MetricSink + ?Sized> MetricSink for Arc<S> {
    fn emit(&self, name: &str, count: u64, tags: &TagSet) {
        (**self).emit(name, count, tags)
    }
}

impl<S: MetricSink + ?Sized> MetricSink for Box<S> {
    fn emit(&self, name: &str, count: u64, tags: &TagSet) {
        (**self).emit(name, count, tags)
    }
}

/// An owned copy of one emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub name: String,
    pub count: u64,
    pub tags: TagSet,
}

impl Emission {
    fn new(name: &str, count: u64, tags: &TagSet) -> Self {
        Emission {
            name: name.to_string(),
            count,
            tags: tags.clone(),
        }
    }
}

/// Logs every emission as a structured `tracing` event at INFO
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MetricSink for TracingSink {
    fn emit(&self, name: &str, count: u64, tags: &TagSet) {
        info!(metric = name, count, tags = %tags, "top-k metric");
    }
}

/// Forwards emissions into an unbounded tokio channel
///
/// Once the receiver is dropped, emissions are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Emission>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Emission>) -> Self {
        ChannelSink { tx }
    }

    /// Create a sink together with the receiving half
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Emission>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, rx)
    }
}

impl MetricSink for ChannelSink {
    fn emit(&self, name: &str, count: u64, tags: &TagSet) {
        if self.tx.send(Emission::new(name, count, tags)).is_err() {
            debug!(metric = name, "channel sink receiver closed, dropping emission");
        }
    }
}

/// Buffers emissions in memory until taken
#[derive(Debug, Default)]
pub struct CollectingSink {
    emissions: Mutex<Vec<Emission>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far
    pub fn take(&self) -> Vec<Emission> {
        std::mem::take(&mut *self.emissions.lock())
    }

    pub fn snapshot(&self) -> Vec<Emission> {
        self.emissions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.emissions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.emissions.lock().is_empty()
    }
}

impl MetricSink for CollectingSink {
    fn emit(&self, name: &str, count: u64, tags: &TagSet) {
        self.emissions.lock().push(Emission::new(name, count, tags));
    }
}

/// Adapts a closure into a sink
pub struct FnSink<F>(pub F);

impl<F> MetricSink for FnSink<F>
where
    F: Fn(&str, u64, &TagSet) + Send + Sync,
{
    fn emit(&self, name: &str, count: u64, tags: &TagSet) {
        (self.0)(name, count, tags)
    }
}
