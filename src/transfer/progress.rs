//! Periodic progress sampling

use super::cancel::CancelScope;
use crate::output::OutputSink;
use crate::units::{human_bytes, mbps};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// `12.3 Mbps  1.5 MiB  0.5s`
pub fn progress_line(bytes: i64, elapsed_secs: f64) -> String {
    format!("{:.1} Mbps  {}  {:.1}s", mbps(bytes, elapsed_secs), human_bytes(bytes), elapsed_secs)
}

/// Reads the shared counter on a fixed period and reports the running rate.
///
/// Observation only: the counter is never written.
pub struct ProgressReporter {
    label: String,
    shared: Arc<AtomicI64>,
    sink: Arc<dyn OutputSink>,
    start: Instant,
    interval: Duration,
}

impl ProgressReporter {
    pub fn new(
        label: impl Into<String>,
        shared: Arc<AtomicI64>,
        sink: Arc<dyn OutputSink>,
        start: Instant,
        interval: Duration,
    ) -> Self {
        Self {
            label: label.into(),
            shared,
            sink,
            start,
            interval,
        }
    }

    /// Run until `scope` is cancelled; the handle yields the number of lines emitted
    pub fn spawn(self, scope: CancelScope) -> JoinHandle<usize> {
        tokio::spawn(self.run(scope))
    }

    async fn run(self, scope: CancelScope) -> usize {
        let mut ticker = tokio::time::interval_at(self.start + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut emitted = 0;

        loop {
            tokio::select! {
                biased;
                _ = scope.cancelled() => break,
                _ = ticker.tick() => {
                    let elapsed = self.start.elapsed().as_secs_f64();
                    if elapsed <= 0.0 {
                        continue;
                    }
                    // Upload rollbacks may briefly drive the counter below zero
                    let bytes = self.shared.load(Ordering::Relaxed).max(0);
                    self.sink.progress(&self.label, &progress_line(bytes, elapsed));
                    emitted += 1;
                }
            }
        }

        emitted
    }
}
