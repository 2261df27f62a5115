//! Entity-generic write operations that follow the ambient transaction.

use std::fmt;
use std::marker::PhantomData;

use corekit_errors::AppError;
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, EntityTrait, IntoActiveModel, PrimaryKeyTrait};

use crate::context::RequestContext;
use crate::on_session;
use crate::tx::Db;

/// CRUD base shared by module repositories.
///
/// Every call resolves its session from the context (joining an ambient
/// transaction when there is one), runs under the context's deadline and
/// cancellation, and classifies storage failures before returning.
pub struct BaseRepository<E> {
    db: Db,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for BaseRepository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for BaseRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseRepository")
            .field("entity", &std::any::type_name::<E>())
            .finish_non_exhaustive()
    }
}

impl<E> BaseRepository<E>
where
    E: EntityTrait,
{
    #[must_use]
    pub const fn new(db: Db) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub const fn db(&self) -> &Db {
        &self.db
    }

    /// Insert a new row and return it as stored.
    ///
    /// # Errors
    /// Returns the classified storage failure, e.g. `DB_CONFLICT` on a
    /// duplicate key.
    pub async fn create<A>(&self, ctx: &RequestContext, model: A) -> Result<E::Model, AppError>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
        E::Model: IntoActiveModel<A>,
    {
        let created = on_session!(self.db.session(ctx), |c| ctx.guard(model.insert(c)).await);
        created.map_err(AppError::from)
    }

    /// Persist every loaded column of `model`.
    ///
    /// # Errors
    /// Returns `NOT_FOUND` when no row matches the primary key, otherwise the
    /// classified storage failure.
    pub async fn update<A>(&self, ctx: &RequestContext, model: A) -> Result<E::Model, AppError>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
        E::Model: IntoActiveModel<A>,
    {
        let model = model.reset_all();
        let updated = on_session!(self.db.session(ctx), |c| ctx.guard(model.update(c)).await);
        updated.map_err(AppError::from)
    }

    /// Delete by primary key. Deleting a missing row is not an error.
    ///
    /// # Errors
    /// Returns the classified storage failure.
    pub async fn delete<A>(&self, ctx: &RequestContext, model: A) -> Result<u64, AppError>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
    {
        let deleted = on_session!(self.db.session(ctx), |c| ctx.guard(model.delete(c)).await);
        deleted.map(|res| res.rows_affected).map_err(AppError::from)
    }

    /// Absence is reported as `None`, not as an error.
    ///
    /// # Errors
    /// Returns the classified storage failure.
    pub async fn find_by_id(
        &self,
        ctx: &RequestContext,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<Option<E::Model>, AppError> {
        self.db.find_one(ctx, E::find_by_id(id)).await
    }
}
