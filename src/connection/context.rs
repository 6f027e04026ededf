//! Cancellation and deadline context for query execution.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Carries the cancellation signal and optional deadline for a query.
///
/// Contexts form a tree: a child is cancelled whenever its parent is, and
/// inherits the parent's deadline unless it sets an earlier one.
#[derive(Debug, Clone)]
pub struct QueryContext {
    cancel: CancellationToken,
    deadline: Option<Deadline>,
}

/// A point in time together with the timeout that produced it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    pub(crate) at: Instant,
    pub(crate) timeout: Duration,
}

impl QueryContext {
    /// Creates a context driven by the given cancellation token.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Creates a context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Returns a copy whose deadline is at most `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let at = Instant::now() + timeout;
        match self.deadline {
            Some(existing) if existing.at <= at => {}
            _ => self.deadline = Some(Deadline { at, timeout }),
        }
        self
    }

    /// Derives a child context that is cancelled along with this one.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and all of its children.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true if the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the instant the context expires, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.map(|d| d.at)
    }

    /// Completes when the deadline passes, yielding the timeout that set it.
    /// Never completes for contexts without a deadline.
    pub(crate) async fn expired(&self) -> Duration {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline.at).await;
                deadline.timeout
            }
            None => std::future::pending().await,
        }
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::background()
    }
}
