use std::sync::Arc;

use axum::Router;
use corekit_db::{DbConfig, DbHandle};
use corekit_errors::StatusRegistry;
use sea_orm::{DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

use crate::api::rest::handlers::RestState;
use crate::api::rest::routes;
use crate::domain::service::Service;
use crate::errors;
use crate::infra::storage::{Migrator, SeaOrmBookingCommandRepository, SeaOrmBookingQueryRepository};

/// Wiring of the booking module into a host. The module owns the pool it
/// was built on.
pub struct BookingModule {
    handle: DbHandle,
    service: Arc<Service>,
}

impl BookingModule {
    /// Key of the module's configuration overlay.
    pub const NAME: &'static str = "booking";

    #[must_use]
    pub fn new(handle: DbHandle) -> Self {
        let db = handle.db();
        let cmd = Arc::new(SeaOrmBookingCommandRepository::new(db.clone()));
        let qry = Arc::new(SeaOrmBookingQueryRepository::new(db.clone()));
        Self {
            handle,
            service: Arc::new(Service::new(db, cmd, qry)),
        }
    }

    /// Connect to the module database and migrate it when `cfg.migrate` is set.
    ///
    /// # Errors
    /// Fails when the database is unreachable or a migration fails.
    pub async fn init(cfg: &DbConfig) -> corekit_db::Result<Self> {
        let handle = DbHandle::from_config(cfg).await?;
        if cfg.migrate {
            Self::migrate(&handle.sea()).await?;
            tracing::info!(module = Self::NAME, "migrations applied");
        }
        Ok(Self::new(handle))
    }

    #[must_use]
    pub const fn db(&self) -> &DbHandle {
        &self.handle
    }

    /// Close the module pool.
    ///
    /// # Errors
    /// Returns the pool close failure.
    pub async fn close(self) -> corekit_db::Result<()> {
        self.handle.close().await
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    /// Returns the migration failure.
    pub async fn migrate(conn: &DatabaseConnection) -> Result<(), DbErr> {
        Migrator::up(conn, None).await
    }

    pub fn register_errors(registry: &StatusRegistry) {
        errors::register_errors(registry);
    }

    #[must_use]
    pub fn service(&self) -> Arc<Service> {
        Arc::clone(&self.service)
    }

    #[must_use]
    pub fn register_routes(&self, router: Router, registry: Arc<StatusRegistry>) -> Router {
        let state = Arc::new(RestState {
            service: self.service(),
            registry,
        });
        routes::register_routes(router, state)
    }
}
