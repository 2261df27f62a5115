//! Request-scoped context that carries the ambient transaction.
//!
//! A [`RequestContext`] is a cheap value passed down the call chain. Besides
//! request identity, deadline and cancellation it holds an optional
//! transaction slot. Only this crate can put a handle into that slot
//! ([`RequestContext::attach`]) or read it back ([`RequestContext::lookup`]),
//! and [`TxHandle`] has no public constructor, so no other code can forge or
//! shadow an ambient transaction.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sea_orm::{DatabaseTransaction, DbErr};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::classify::StorageError;

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// Open storage transaction shared by every context derived from the one
/// that started it.
#[derive(Clone)]
pub struct TxHandle {
    id: u64,
    txn: Arc<DatabaseTransaction>,
}

impl TxHandle {
    pub(crate) fn new(txn: DatabaseTransaction) -> Self {
        Self {
            id: NEXT_TX_ID.fetch_add(1, Ordering::Relaxed),
            txn: Arc::new(txn),
        }
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn conn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Reclaim sole ownership for commit or rollback. Fails if a clone of the
    /// handle outlived the unit of work.
    pub(crate) fn into_inner(self) -> Result<DatabaseTransaction, Self> {
        let id = self.id;
        Arc::try_unwrap(self.txn).map_err(|txn| Self { id, txn })
    }
}

impl fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxHandle")
            .field("id", &self.id)
            .field("holders", &Arc::strong_count(&self.txn))
            .finish()
    }
}

/// Per-request context.
#[derive(Clone, Debug)]
pub struct RequestContext {
    request_id: Arc<str>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    tx: Option<TxHandle>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Fresh context with a generated request id, no deadline, no transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn with_request_id(request_id: impl Into<Arc<str>>) -> Self {
        Self {
            request_id: request_id.into(),
            deadline: None,
            cancel: CancellationToken::new(),
            tx: None,
        }
    }

    /// Bound the context to `timeout` from now. An earlier existing deadline is kept.
    /// A timeout too large to represent leaves the context unbounded.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// Tie this context to an external cancellation source.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Derived context: cancelling the child does not cancel the parent.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            request_id: Arc::clone(&self.request_id),
            deadline: self.deadline,
            cancel: self.cancel.child_token(),
            tx: self.tx.clone(),
        }
    }

    /// Same request, but outside any ambient transaction.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            tx: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Identifier of the ambient transaction, stable across joins.
    #[must_use]
    pub fn transaction_id(&self) -> Option<u64> {
        self.tx.as_ref().map(TxHandle::id)
    }

    #[must_use]
    pub(crate) fn attach(&self, handle: TxHandle) -> Self {
        Self {
            tx: Some(handle),
            ..self.clone()
        }
    }

    pub(crate) const fn lookup(&self) -> Option<&TxHandle> {
        self.tx.as_ref()
    }

    /// Run a storage future under this context's cancellation and deadline.
    ///
    /// # Errors
    /// Returns [`StorageError::Cancelled`] or [`StorageError::DeadlineExceeded`]
    /// when the context gives up first, otherwise the future's own error.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, DbErr>>,
    {
        if self.cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        if self.deadline.is_some_and(|at| at <= Instant::now()) {
            return Err(StorageError::DeadlineExceeded);
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(StorageError::Cancelled),
            () = expire(self.deadline) => Err(StorageError::DeadlineExceeded),
            res = fut => res.map_err(StorageError::from),
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_has_no_transaction() {
        let ctx = RequestContext::new();
        assert!(!ctx.in_transaction());
        assert!(ctx.lookup().is_none());
        assert!(ctx.transaction_id().is_none());
        assert!(!ctx.request_id().is_empty());
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = RequestContext::with_request_id("r")
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[test]
    fn unrepresentable_timeout_leaves_context_unbounded() {
        let ctx = RequestContext::new().with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());

        let bounded = RequestContext::new()
            .with_timeout(Duration::from_secs(5))
            .with_timeout(Duration::MAX);
        assert!(bounded.deadline().is_some());
    }

    #[test]
    fn child_cancellation_does_not_reach_parent() {
        let parent = RequestContext::with_request_id("r");
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
        assert_eq!(child.request_id(), "r");
    }

    #[tokio::test]
    async fn external_token_cancels_derived_contexts() {
        let shutdown = CancellationToken::new();
        let ctx = RequestContext::new().with_cancellation(shutdown.child_token());
        let child = ctx.child();

        shutdown.cancel();

        assert!(ctx.is_cancelled());
        assert!(child.is_cancelled());
        let out = child.guard(async { Ok::<_, DbErr>(()) }).await;
        assert!(matches!(out, Err(StorageError::Cancelled)));
    }

    #[tokio::test]
    async fn guard_passes_through_result() {
        let ctx = RequestContext::new();
        let out = ctx.guard(async { Ok::<_, DbErr>(7) }).await;
        assert!(matches!(out, Ok(7)));
    }

    #[tokio::test]
    async fn guard_rejects_cancelled_context() {
        let ctx = RequestContext::new();
        ctx.cancel();
        let out = ctx.guard(async { Ok::<_, DbErr>(()) }).await;
        assert!(matches!(out, Err(StorageError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn guard_enforces_deadline() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, DbErr>(())
        };
        let out = ctx.guard(slow).await;
        assert!(matches!(out, Err(StorageError::DeadlineExceeded)));
    }
}
