//! Nested cancellation scopes
//!
//! A [`CancelScope`] is a shared stop flag built on a `watch` channel.
//! Child scopes are cancelled whenever their parent is; cancelling a child
//! leaves the parent untouched.

use std::future::Future;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;

struct ScopeInner {
    tx: watch::Sender<bool>,
    children: Mutex<Vec<Weak<ScopeInner>>>,
}

impl ScopeInner {
    fn new(cancelled: bool) -> Self {
        let (tx, _rx) = watch::channel(cancelled);
        Self {
            tx,
            children: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self) {
        self.tx.send_replace(true);
        let children = std::mem::take(&mut *self.children.lock().unwrap_or_else(|e| e.into_inner()));
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Cloneable handle to a cancellation scope
#[derive(Clone)]
pub struct CancelScope {
    inner: Arc<ScopeInner>,
}

impl CancelScope {
    /// A fresh root scope
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeInner::new(false)),
        }
    }

    /// A scope cancelled together with `self`
    pub fn child(&self) -> Self {
        let mut children = self.inner.children.lock().unwrap_or_else(|e| e.into_inner());
        // Cancelled while holding the lock means `cancel` already drained the list
        let child = Arc::new(ScopeInner::new(self.inner.is_cancelled()));
        if !self.inner.is_cancelled() {
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child));
        }
        Self { inner: child }
    }

    /// Cancel this scope and every descendant
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once the scope is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.inner.tx.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Run `fut` unless the scope is cancelled first
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = fut => Some(output),
        }
    }

    /// Cancel this scope after `delay` unless it has already ended.
    ///
    /// The returned handle may be aborted once the guarded work is done.
    pub fn cancel_after(&self, delay: Duration) -> tokio::task::JoinHandle<()> {
        let scope = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => scope.cancel(),
                _ = scope.cancelled() => {}
            }
        })
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelScope")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_propagates_to_descendants() {
        let root = CancelScope::new();
        let child = root.child();
        let grandchild = child.child();

        root.cancel();
        assert!(root.is_cancelled());
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let root = CancelScope::new();
        let child = root.child();
        let sibling = root.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!root.is_cancelled());
        assert!(!sibling.is_cancelled());
    }

    #[test]
    fn test_child_of_cancelled_scope_starts_cancelled() {
        let root = CancelScope::new();
        root.cancel();
        assert!(root.child().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let root = CancelScope::new();
        let child = root.child();
        let waiter = tokio::spawn(async move { child.cancelled().await });

        tokio::task::yield_now().await;
        root.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_returns_none_when_cancelled() {
        let scope = CancelScope::new();
        assert_eq!(scope.run(async { 7 }).await, Some(7));

        scope.cancel();
        let pending = std::future::pending::<()>();
        assert_eq!(scope.run(pending).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_fires() {
        let scope = CancelScope::new();
        let timer = scope.cancel_after(Duration::from_secs(3));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!scope.is_cancelled());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(scope.is_cancelled());
        timer.await.unwrap();
    }
}
