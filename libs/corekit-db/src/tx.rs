//! Units of work and session resolution.

use std::future::Future;

use corekit_errors::{AppError, catalog};
use sea_orm::{DatabaseConnection, DatabaseTransaction, EntityTrait, Select, TransactionTrait};

use crate::classify::StorageError;
use crate::context::{RequestContext, TxHandle};

/// Storage session a call runs on: the ambient transaction or the pool.
#[derive(Clone, Copy, Debug)]
pub enum Session<'a> {
    Conn(&'a DatabaseConnection),
    Tx(&'a DatabaseTransaction),
}

/// Run `$body` with `$c` bound to whichever connection type the session holds.
///
/// ```ignore
/// let rows = on_session!(db.session(&ctx), |c| ctx.guard(select.all(c)).await)?;
/// ```
#[macro_export]
macro_rules! on_session {
    ($session:expr, |$c:ident| $body:expr) => {
        match $session {
            $crate::Session::Conn($c) => $body,
            $crate::Session::Tx($c) => $body,
        }
    };
}

/// Transaction manager handed to use cases and repositories.
#[derive(Clone, Debug)]
pub struct Db {
    conn: DatabaseConnection,
}

impl Db {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub const fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Resolve the session for `ctx`: its ambient transaction when present,
    /// otherwise the pooled connection.
    #[must_use]
    pub fn session<'a>(&'a self, ctx: &'a RequestContext) -> Session<'a> {
        match ctx.lookup() {
            Some(tx) => Session::Tx(tx.conn()),
            None => Session::Conn(&self.conn),
        }
    }

    /// Run `unit` inside one storage transaction.
    ///
    /// If `ctx` already carries a transaction, `unit` joins it and the outer
    /// caller stays responsible for commit or rollback. Otherwise a new
    /// transaction is started and attached to the context handed to `unit`.
    /// An error from `unit` rolls back and is returned unchanged. A context
    /// that was cancelled or expired by the time `unit` returns also rolls
    /// back, surfacing as `DB_TIMEOUT`.
    ///
    /// # Errors
    /// Returns the error from `unit`, or the classified failure to begin or
    /// commit the transaction.
    #[tracing::instrument(name = "db.atomic", skip_all, fields(request_id = %ctx.request_id()))]
    pub async fn atomic<T, F, Fut>(&self, ctx: &RequestContext, unit: F) -> Result<T, AppError>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if let Some(tx) = ctx.lookup() {
            tracing::trace!(tx_id = tx.id(), "joining ambient transaction");
            return unit(ctx.clone()).await;
        }

        let txn = ctx.guard(self.conn.begin()).await?;
        let handle = TxHandle::new(txn);
        let tx_id = handle.id();
        tracing::debug!(tx_id, "transaction started");

        let outcome = unit(ctx.attach(handle.clone())).await;
        let outcome = match outcome {
            Ok(_) if ctx.is_cancelled() => Err(AppError::from(StorageError::Cancelled)),
            Ok(_) if ctx.remaining().is_some_and(|left| left.is_zero()) => {
                Err(AppError::from(StorageError::DeadlineExceeded))
            }
            other => other,
        };

        match outcome {
            Ok(value) => {
                commit(handle).await?;
                tracing::debug!(tx_id, "transaction committed");
                Ok(value)
            }
            Err(err) => {
                rollback(handle).await;
                tracing::debug!(tx_id, code = err.code(), "transaction rolled back");
                Err(err)
            }
        }
    }

    /// Fetch at most one row on the session resolved from `ctx`.
    ///
    /// # Errors
    /// Returns the classified storage failure.
    pub async fn find_one<E>(
        &self,
        ctx: &RequestContext,
        select: Select<E>,
    ) -> Result<Option<E::Model>, AppError>
    where
        E: EntityTrait,
    {
        let found = on_session!(self.session(ctx), |c| ctx.guard(select.one(c)).await);
        Ok(found?)
    }

    /// # Errors
    /// Returns the classified storage failure.
    pub async fn find_all<E>(
        &self,
        ctx: &RequestContext,
        select: Select<E>,
    ) -> Result<Vec<E::Model>, AppError>
    where
        E: EntityTrait,
    {
        let rows = on_session!(self.session(ctx), |c| ctx.guard(select.all(c)).await);
        Ok(rows?)
    }
}

async fn commit(handle: TxHandle) -> Result<(), AppError> {
    let tx_id = handle.id();
    match handle.into_inner() {
        Ok(txn) => txn
            .commit()
            .await
            .map_err(|e| AppError::from(StorageError::from(e))),
        Err(leaked) => {
            tracing::warn!(tx_id, ?leaked, "transaction handle outlived its unit of work");
            // The last holder to drop the handle rolls the transaction back.
            Err(catalog::INTERNAL_ERROR.error_with("transaction still in use at commit"))
        }
    }
}

async fn rollback(handle: TxHandle) {
    let tx_id = handle.id();
    match handle.into_inner() {
        Ok(txn) => {
            if let Err(e) = txn.rollback().await {
                tracing::warn!(tx_id, error = %e, "transaction rollback failed");
            }
        }
        Err(leaked) => {
            tracing::warn!(tx_id, ?leaked, "rollback deferred until the last handle drops");
        }
    }
}
