use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{JobDockError, Result};

/// Cancellation and deadline carried by every registry and coordinator call.
///
/// Backend futures are raced against both; whichever fires first drops the
/// in-flight call and returns `Cancelled` or `DeadlineExceeded`.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context cancelled together with `token` (typically a child of the
    /// server's shutdown token).
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            deadline: None,
        }
    }

    /// Tighten the deadline to `timeout` from now. An earlier existing
    /// deadline wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run `fut` unless the context is cancelled or expires first.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output> {
        if self.cancel.is_cancelled() {
            return Err(JobDockError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(JobDockError::Cancelled),
            _ = expired(self.deadline) => Err(JobDockError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_passes_through_output() {
        let ctx = RequestContext::new();
        let out = ctx.guard(async { 7 }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn guard_fails_fast_when_already_cancelled() {
        let ctx = RequestContext::new();
        ctx.cancel();
        let result = ctx.guard(async { 7 }).await;
        assert!(matches!(result, Err(JobDockError::Cancelled)));
    }

    #[tokio::test]
    async fn guard_aborts_pending_future_on_cancel() {
        let token = CancellationToken::new();
        let ctx = RequestContext::with_cancellation(token.clone());

        let handle = tokio::spawn(async move {
            ctx.guard(std::future::pending::<()>()).await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(JobDockError::Cancelled)));
    }

    #[tokio::test]
    async fn guard_reports_deadline() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        let result = ctx.guard(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(JobDockError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn earlier_deadline_wins() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(10));
        let first = ctx.deadline().unwrap();
        let ctx = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(first));
    }
}
