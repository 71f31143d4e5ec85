//! Time/cancellation budget shared by every component of a run

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounds one engine invocation: an optional deadline plus an external
/// cancellation signal, both funneled into a single [`CancellationToken`].
///
/// Workers, the meter and the signal handler all observe clones of the same
/// token. Once it fires, no new transfer attempt begins and in-flight
/// attempts abandon at their next await point.
#[derive(Debug, Clone)]
pub struct RunBudget {
    token: CancellationToken,
}

impl RunBudget {
    /// A budget that only ends via [`cancel`](Self::cancel).
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A budget whose token fires after `deadline` elapses.
    ///
    /// Must be called from within a tokio runtime; the deadline watcher is
    /// a spawned task.
    #[must_use]
    pub fn with_deadline(deadline: Duration) -> Self {
        let budget = Self::unbounded();
        let token = budget.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(deadline) => token.cancel(),
                () = token.cancelled() => {}
            }
        });
        budget
    }

    /// Token observed by workers and the meter.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fire the budget early (user interrupt, tests).
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_the_token() {
        let budget = RunBudget::with_deadline(Duration::from_secs(5));
        assert!(!budget.is_cancelled());

        tokio::time::sleep(Duration::from_secs(6)).await;
        budget.token().cancelled().await;
        assert!(budget.is_cancelled());
    }

    #[tokio::test]
    async fn external_cancel_fires_immediately() {
        let budget = RunBudget::with_deadline(Duration::from_secs(3600));
        budget.cancel();
        assert!(budget.is_cancelled());
    }
}
