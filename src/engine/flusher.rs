//! Background flush loop
//!
//! ```text
//! tick / cancel ──► elements() ──► decode ──► sink.emit() × N ──► reset()
//! ```
//!
//! The tracker lock is only held inside `elements()` and `reset()`, never
//! across sink calls. A sink that blocks stalls this loop (and delays the next
//! reset) but never blocks recorders.

use super::sink::MetricSink;
use crate::error::EngineError;
use crate::metrics::{MetricIdentity, MetricKeyEncoder};
use crate::sketch::TopKTracker;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Summary of a finished flush loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Timer ticks processed
    pub ticks: u64,
    /// Flushes performed, including the final one on cancellation
    pub flushes: u64,
    /// Total sink calls
    pub emitted: u64,
}

pub(crate) struct Flusher<S> {
    tracker: Arc<TopKTracker>,
    sink: S,
    period: Duration,
    cancel: CancellationToken,
}

impl<S: MetricSink> Flusher<S> {
    pub(crate) fn new(
        tracker: Arc<TopKTracker>,
        sink: S,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Flusher {
            tracker,
            sink,
            period,
            cancel,
        }
    }

    /// Flush on every tick until cancelled, then flush once more and exit.
    pub(crate) async fn run(self) -> Result<FlushReport, EngineError> {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut report = FlushReport::default();

        info!(period = ?self.period, k = self.tracker.k(), "top-k flush loop started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    report.ticks += 1;
                    self.flush(&mut report)?;
                }
            }
        }

        self.flush(&mut report)?;
        info!(
            ticks = report.ticks,
            flushes = report.flushes,
            emitted = report.emitted,
            "top-k flush loop stopped"
        );
        Ok(report)
    }

    fn flush(&self, report: &mut FlushReport) -> Result<(), EngineError> {
        let elements = self.tracker.elements();

        // Decode everything before emitting so a corrupt key emits nothing
        let mut decoded: Vec<(MetricIdentity, u64)> = Vec::with_capacity(elements.len());
        for element in elements {
            match MetricKeyEncoder::decode(&element.key) {
                Ok(identity) => decoded.push((identity, element.estimate)),
                Err(e) => {
                    error!(key = %e.key, reason = e.reason, "undecodable top-k key, aborting flush loop");
                    self.tracker.reset();
                    return Err(e.into());
                }
            }
        }

        for (identity, estimate) in &decoded {
            self.sink.emit(&identity.name, *estimate, &identity.tags);
        }
        self.tracker.reset();

        report.flushes += 1;
        report.emitted += decoded.len() as u64;
        debug!(emitted = decoded.len(), "flushed top-k interval");
        Ok(())
    }
}
