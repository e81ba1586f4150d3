//! Parallel throughput measurement
//!
//! A pass runs a fixed number of [`TransferWorker`]s against one URL. All
//! workers add to a single atomic byte counter, which a [`ProgressReporter`]
//! samples while the pass runs. The pass always produces a
//! [`TransferResult`]; worker failures only show up as faults.

pub mod cancel;
pub mod progress;
pub mod worker;

pub use cancel::CancelScope;
pub use progress::{progress_line, ProgressReporter};
pub use worker::{worker_for, DownloadWorker, Fault, TransferWorker, UploadWorker, WorkerContext, WorkerOutcome};

use crate::logging::TransferLogger;
use crate::models::{Config, Direction, TransferResult};
use crate::output::OutputSink;
use futures::future::join_all;
use reqwest::Client;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Runs download and upload passes with a shared configuration
pub struct ThroughputEngine {
    client: Client,
    max_bytes: i64,
    timeout: Duration,
    sink: Arc<dyn OutputSink>,
    logger: Option<TransferLogger>,
    progress_interval: Duration,
}

impl ThroughputEngine {
    pub fn new(client: Client, config: &Config, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            client,
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            sink,
            logger: None,
            progress_interval: crate::defaults::PROGRESS_INTERVAL,
        }
    }

    pub fn with_logger(mut self, logger: TransferLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Run one pass of `threads` workers against `url`.
    ///
    /// Bounded by the per-attempt timeout plus a short grace period.
    /// Cancelling `scope` ends the pass early with whatever was counted.
    pub async fn run(&self, scope: &CancelScope, direction: Direction, threads: usize, url: &str) -> TransferResult {
        let session = scope.child();
        let backstop = session.cancel_after(self.timeout + crate::defaults::BACKSTOP_GRACE);

        let correlation_id = match &self.logger {
            Some(logger) => Some(logger.start_pass(direction, threads, url).await),
            None => None,
        };

        let shared = Arc::new(AtomicI64::new(0));
        let start = Instant::now();

        let sampler_scope = session.child();
        let sampler = ProgressReporter::new(
            direction.label(),
            Arc::clone(&shared),
            Arc::clone(&self.sink),
            start,
            self.progress_interval,
        )
        .spawn(sampler_scope.clone());

        let worker = worker_for(direction);
        let ctx = Arc::new(WorkerContext {
            client: self.client.clone(),
            url: url.to_string(),
            max_bytes: self.max_bytes,
            timeout: self.timeout,
            shared: Arc::clone(&shared),
            scope: session.clone(),
        });

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let worker = Arc::clone(&worker);
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move { worker.run(&ctx).await })
            })
            .collect();

        let outcomes: Vec<WorkerOutcome> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap_or_else(|e| WorkerOutcome::faulted(0, Fault::Aborted(e.to_string()))))
            .collect();
        let duration = start.elapsed();

        // The sampler must observe the final state before it stops
        sampler_scope.cancel();
        let _ = sampler.await;
        backstop.abort();
        session.cancel();

        let fault_count = outcomes.iter().filter(|o| o.is_fault()).count();
        let total_bytes = shared.load(Ordering::SeqCst);
        let result = TransferResult::new(direction, threads, total_bytes, duration, fault_count);

        if let (Some(logger), Some(id)) = (&self.logger, correlation_id.as_deref()) {
            for (index, outcome) in outcomes.iter().enumerate() {
                let fault = outcome.fault.as_ref().map(|f| f.to_string());
                logger
                    .log_worker_outcome(id, direction, index, outcome.bytes, fault.as_deref())
                    .await;
            }
            logger.log_pass_summary(id, &result).await;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;

    fn engine(sink: Arc<MemorySink>) -> ThroughputEngine {
        let config = Config {
            max_bytes: 1_000,
            timeout_seconds: 1,
            ..Default::default()
        };
        ThroughputEngine::new(Client::new(), &config, sink)
    }

    #[tokio::test]
    async fn test_cancelled_scope_yields_best_effort_result() {
        let sink = Arc::new(MemorySink::new());
        let scope = CancelScope::new();
        scope.cancel();

        let result = engine(sink)
            .run(&scope, Direction::Download, 3, "http://127.0.0.1:9/large")
            .await;

        assert_eq!(result.direction, Direction::Download);
        assert_eq!(result.threads, 3);
        assert_eq!(result.total_bytes, 0);
        assert_eq!(result.fault_count, 3);
        assert!(result.had_fault);
        assert_eq!(result.mbps, 0.0);
    }

    #[tokio::test]
    async fn test_pass_does_not_cancel_caller_scope() {
        let sink = Arc::new(MemorySink::new());
        let scope = CancelScope::new();

        let result = engine(sink)
            .run(&scope, Direction::Upload, 1, "http://127.0.0.1:9/slurp")
            .await;

        assert!(result.had_fault);
        assert!(!scope.is_cancelled());
    }
}
