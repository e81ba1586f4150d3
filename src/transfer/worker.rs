//! Single-connection transfer workers

use super::cancel::CancelScope;
use crate::client::{probe_headers, upload_draft_headers};
use crate::models::Direction;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Body, Client};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;

/// Why a worker stopped early
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Connect, TLS or request write failure
    Transport(String),
    /// Server answered with status >= 400
    Status(u16),
    /// Response body failed mid-stream
    Read(String),
    /// Per-attempt deadline elapsed
    Timeout,
    /// Session was cancelled
    Cancelled,
    /// Worker task died
    Aborted(String),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Transport(e) => write!(f, "transport error: {}", e),
            Fault::Status(code) => write!(f, "HTTP status {}", code),
            Fault::Read(e) => write!(f, "read error: {}", e),
            Fault::Timeout => f.write_str("timed out"),
            Fault::Cancelled => f.write_str("cancelled"),
            Fault::Aborted(e) => write!(f, "worker aborted: {}", e),
        }
    }
}

/// Bytes a worker moved and whether it faulted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub bytes: i64,
    pub fault: Option<Fault>,
}

impl WorkerOutcome {
    pub fn completed(bytes: i64) -> Self {
        Self { bytes, fault: None }
    }

    pub fn faulted(bytes: i64, fault: Fault) -> Self {
        Self {
            bytes,
            fault: Some(fault),
        }
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}

/// Everything a worker needs for one attempt
pub struct WorkerContext {
    pub client: Client,
    pub url: String,
    /// Per-worker byte cap
    pub max_bytes: i64,
    /// Per-attempt deadline
    pub timeout: Duration,
    /// Session-wide byte counter
    pub shared: Arc<AtomicI64>,
    pub scope: CancelScope,
}

/// One capped streaming request in one direction
#[async_trait]
pub trait TransferWorker: Send + Sync {
    async fn run(&self, ctx: &WorkerContext) -> WorkerOutcome;
}

/// Worker implementation for `direction`
pub fn worker_for(direction: Direction) -> Arc<dyn TransferWorker> {
    match direction {
        Direction::Download => Arc::new(DownloadWorker),
        Direction::Upload => Arc::new(UploadWorker),
    }
}

/// Await `fut` until the deadline or cancellation, whichever comes first
async fn bounded<F: Future>(
    deadline: Instant,
    scope: &CancelScope,
    fut: F,
) -> std::result::Result<F::Output, Fault> {
    tokio::select! {
        biased;
        _ = scope.cancelled() => Err(Fault::Cancelled),
        res = tokio::time::timeout_at(deadline, fut) => res.map_err(|_| Fault::Timeout),
    }
}

/// GET the URL and count body bytes up to the cap
pub struct DownloadWorker;

#[async_trait]
impl TransferWorker for DownloadWorker {
    async fn run(&self, ctx: &WorkerContext) -> WorkerOutcome {
        let deadline = Instant::now() + ctx.timeout;
        let request = ctx.client.get(&ctx.url).headers(probe_headers()).send();

        let response = match bounded(deadline, &ctx.scope, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return WorkerOutcome::faulted(0, Fault::Transport(e.to_string())),
            Err(fault) => return WorkerOutcome::faulted(0, fault),
        };

        let status = response.status().as_u16();
        if status >= 400 {
            return WorkerOutcome::faulted(0, Fault::Status(status));
        }

        let mut body = response.bytes_stream();
        let mut total: i64 = 0;

        loop {
            match bounded(deadline, &ctx.scope, body.next()).await {
                Ok(Some(Ok(chunk))) => {
                    // Count only up to this worker's cap
                    let take = (chunk.len() as i64).min(ctx.max_bytes - total);
                    total += take;
                    ctx.shared.fetch_add(take, Ordering::Relaxed);
                    if total >= ctx.max_bytes {
                        break;
                    }
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => return WorkerOutcome::faulted(total, Fault::Read(e.to_string())),
                Err(fault) => return WorkerOutcome::faulted(total, fault),
            }
        }

        WorkerOutcome::completed(total)
    }
}

static ZERO_CHUNK: [u8; crate::defaults::CHUNK_SIZE] = [0; crate::defaults::CHUNK_SIZE];

/// Bytes handed to the transport by one upload attempt.
///
/// The top bit seals the tally: once sealed no more bytes are produced,
/// so the sealed value is exactly what reached the shared counter.
#[derive(Debug, Default)]
struct UploadTally(AtomicI64);

impl UploadTally {
    const SEALED: i64 = i64::MIN;

    /// Record `n` more bytes unless sealed
    fn try_add(&self, n: i64) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                if cur & Self::SEALED != 0 {
                    None
                } else {
                    Some(cur + n)
                }
            })
            .is_ok()
    }

    /// Stop production and return the final count
    fn seal(&self) -> i64 {
        self.0.fetch_or(Self::SEALED, Ordering::AcqRel) & i64::MAX
    }

    fn sent(&self) -> i64 {
        self.0.load(Ordering::Acquire) & i64::MAX
    }
}

/// Request body of `remaining` zero bytes, counted as the transport pulls it
struct ZeroBody {
    remaining: i64,
    tally: Arc<UploadTally>,
    shared: Arc<AtomicI64>,
}

impl Stream for ZeroBody {
    type Item = std::result::Result<&'static [u8], std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.remaining <= 0 {
            return Poll::Ready(None);
        }

        let n = this.remaining.min(ZERO_CHUNK.len() as i64);
        if !this.tally.try_add(n) {
            return Poll::Ready(None);
        }
        this.shared.fetch_add(n, Ordering::Relaxed);
        this.remaining -= n;

        Poll::Ready(Some(Ok(&ZERO_CHUNK[..n as usize])))
    }
}

/// PUT `max_bytes` of zeros with unknown content length
pub struct UploadWorker;

#[async_trait]
impl TransferWorker for UploadWorker {
    async fn run(&self, ctx: &WorkerContext) -> WorkerOutcome {
        let deadline = Instant::now() + ctx.timeout;
        let tally = Arc::new(UploadTally::default());
        let body = ZeroBody {
            remaining: ctx.max_bytes,
            tally: Arc::clone(&tally),
            shared: Arc::clone(&ctx.shared),
        };

        let request = ctx
            .client
            .put(&ctx.url)
            .headers(probe_headers())
            .headers(upload_draft_headers())
            .body(Body::wrap_stream(body))
            .send();

        let response = match bounded(deadline, &ctx.scope, request).await {
            Ok(Ok(response)) => response,
            // Bytes already handed over stay counted
            Ok(Err(e)) => return WorkerOutcome::faulted(tally.sent(), Fault::Transport(e.to_string())),
            Err(fault) => return WorkerOutcome::faulted(tally.sent(), fault),
        };

        let status = response.status().as_u16();
        if status >= 400 {
            let sent = tally.seal();
            ctx.shared.fetch_sub(sent, Ordering::AcqRel);
            let _ = bounded(deadline, &ctx.scope, response.bytes()).await;
            return WorkerOutcome::faulted(0, Fault::Status(status));
        }

        let _ = bounded(deadline, &ctx.scope, response.bytes()).await;
        WorkerOutcome::completed(tally.sent())
    }
}
