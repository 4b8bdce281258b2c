//! Cancellation and deadline propagation.
//!
//! A [`Context`] is cloned into every stage and worker of a run. Every blocking
//! point (outbound request, governor sleep, search pacing delay, worker slot
//! acquisition) goes through [`Context::run`] so that cancellation or an
//! elapsed deadline wakes it immediately.

use std::future::{Future, pending};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Cancelled {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Fires the cancel signal of the contexts created alongside it.
///
/// Dropping a `Canceller` without calling [`Canceller::cancel`] leaves its
/// contexts running until their deadline (if any).
#[derive(Debug)]
pub struct Canceller(watch::Sender<bool>);

impl Canceller {
    pub fn cancel(&self) {
        let _ = self.0.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context plus the handle that cancels it.
    pub fn cancellable() -> (Self, Canceller) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(rx),
            deadline: None,
        };
        (ctx, Canceller(tx))
    }

    /// Derive a context whose deadline is at most `timeout` from now.
    ///
    /// An earlier deadline inherited from `self` is kept. A timeout too large
    /// to represent as an instant adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(existing), Some(candidate)) => Some(existing.min(candidate)),
            (existing, None) => existing,
            (None, candidate) => candidate,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check, mirrors what [`Context::done`] would resolve to right now.
    pub fn err(&self) -> Option<Cancelled> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(Cancelled::Canceled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(Cancelled::DeadlineExceeded);
        }
        None
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> Cancelled {
        let cancelled = async {
            match self.cancel.clone() {
                Some(mut rx) => {
                    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                    // A dropped Canceller can never fire.
                    if closed {
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };

        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => Cancelled::Canceled,
            () = expired => Cancelled::DeadlineExceeded,
        }
    }

    /// Drive `fut` to completion unless the context finishes first.
    ///
    /// An already-finished context never polls `fut`.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        if let Some(reason) = self.err() {
            return Err(reason);
        }

        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            out = fut => Ok(out),
        }
    }

    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        self.run(tokio::time::sleep(duration)).await
    }
}
