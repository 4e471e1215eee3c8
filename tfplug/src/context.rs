//! Request-scoped context carrying cancellation and deadlines
//!
//! The host decides how long an operation may run. Providers do not add their
//! own timeouts; they forward the [`Context`] into transport calls and stop
//! when it is done.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Pass this as the first parameter to every async trait method.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_deadline(None)
    }

    /// A context that is cancelled once `timeout` elapses.
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let ctx = Self::with_deadline(Some(deadline));

        // The task ends on cancel, on the deadline, or once every clone is dropped
        let inner = Arc::downgrade(&ctx.inner);
        let mut done = ctx.inner.done.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {
                    if let Some(inner) = inner.upgrade() {
                        let _ = inner.done_tx.send(true);
                    }
                }
                _ = done.wait_for(|cancelled| *cancelled) => {}
            }
        });

        ctx
    }

    fn with_deadline(deadline: Option<Instant>) -> Self {
        let (done_tx, done) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline,
                done,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.clone();
        // The sender lives in `inner`, so `wait_for` only returns once the flag flips.
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
