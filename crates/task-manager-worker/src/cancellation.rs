//! Cooperative cancellation for in-flight tasks and
//! request-scoped submit deadlines.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// A one-shot, cooperative cancellation signal.
///
/// Wraps a `tokio::sync::watch` channel. Cheap to clone. The pool registry,
/// the worker and the executor all hold copies of the same signal. A handle
/// may also carry a deadline, after which it reports itself cancelled without
/// anyone calling [`cancel`](Self::cancel).
#[derive(Clone)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl CancellationHandle {
    /// Create a new (not-yet-cancelled) handle.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx,
            rx,
            deadline: None,
        }
    }

    /// Create a handle that also fires once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Create a handle that also fires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::new()
        }
    }

    /// Signal cancellation.
    ///
    /// Returns `true` only for the call that actually fired the signal;
    /// later calls are no-ops.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    /// Check if cancellation has been requested or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.is_deadline_exceeded()
    }

    /// Check if the deadline (if any) has passed.
    pub fn is_deadline_exceeded(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// The deadline this handle was created with, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Wait until cancellation is requested or the deadline passes.
    ///
    /// Returns immediately if already cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let signalled = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Sender dropped, treat as cancelled
                    return;
                }
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = signalled => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => signalled.await,
        }
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationHandle")
            .field("cancelled", &*self.rx.borrow())
            .field("deadline", &self.deadline)
            .finish()
    }
}
