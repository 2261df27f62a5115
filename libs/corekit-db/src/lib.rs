#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Transaction-scoped persistence for corekit services.
//!
//! - [`DbHandle`]: connects to `SQLite`, `PostgreSQL` or `MySQL` through sqlx and
//!   wraps the pool as a `SeaORM` connection
//! - [`RequestContext`]: request-scoped carrier of deadline, cancellation and
//!   the ambient transaction
//! - [`Db::atomic`]: runs a unit of work in one transaction, joining an outer
//!   one when the context already carries it
//! - [`BaseRepository`]: entity-generic create/update/delete that follows the
//!   ambient transaction
//! - [`classify`]: total translation of storage failures into `AppError`
//!
//! # Features
//! - `sqlite` (default), `pg`, `mysql`: enable sqlx backends

use std::time::Duration;

use sea_orm::DatabaseConnection;
#[cfg(feature = "mysql")]
use sea_orm::SqlxMySqlConnector;
#[cfg(feature = "pg")]
use sea_orm::SqlxPostgresConnector;
#[cfg(feature = "sqlite")]
use sea_orm::SqlxSqliteConnector;
use thiserror::Error;

pub mod classify;
pub mod config;
pub mod context;
pub mod repository;
pub mod tx;

mod pool_opts;

pub use classify::{Classified, DriverFault, Signal, StorageError, classify};
pub use config::{DbConfig, PoolCfg, redact_dsn};
pub use context::RequestContext;
pub use repository::BaseRepository;
pub use tx::{Db, Session};

use pool_opts::ApplyPoolOpts;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Failure to set up a database handle.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

/// Connection pool options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectOpts {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    pub acquire_timeout: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    /// Ping connections before handing them out.
    pub test_before_acquire: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,
        }
    }
}

/// Connected database.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    dsn: String,
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Detect engine by DSN scheme.
    ///
    /// # Errors
    /// Returns `DbError::UnknownDsn` if the DSN scheme is not recognized.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("mysql://") {
            Ok(DbEngine::MySql)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(redact_dsn(dsn)))
        }
    }

    /// Connect and build handle.
    ///
    /// # Errors
    /// Returns an error if the DSN is invalid, its backend is not compiled
    /// in, or the pool cannot connect.
    pub async fn connect(dsn: &str, opts: &ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        tracing::info!(dsn = %redact_dsn(dsn), ?engine, "connecting to database");
        let sea = match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .apply(opts)
                    .connect(dsn)
                    .await?;
                SqlxPostgresConnector::from_sqlx_postgres_pool(pool)
            }
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => return Err(DbError::FeatureDisabled("PostgreSQL feature not enabled")),
            #[cfg(feature = "mysql")]
            DbEngine::MySql => {
                let pool = sqlx::mysql::MySqlPoolOptions::new()
                    .apply(opts)
                    .connect(dsn)
                    .await?;
                SqlxMySqlConnector::from_sqlx_mysql_pool(pool)
            }
            #[cfg(not(feature = "mysql"))]
            DbEngine::MySql => return Err(DbError::FeatureDisabled("MySQL feature not enabled")),
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .apply(opts)
                    .after_connect(|conn, _meta| {
                        Box::pin(async move {
                            sqlx::query("PRAGMA foreign_keys = ON")
                                .execute(&mut *conn)
                                .await?;
                            Ok(())
                        })
                    })
                    .connect(dsn)
                    .await?;
                SqlxSqliteConnector::from_sqlx_sqlite_pool(pool)
            }
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => return Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        };
        Ok(Self {
            engine,
            dsn: dsn.to_owned(),
            sea,
        })
    }

    /// Connect using a deserialised config section.
    ///
    /// # Errors
    /// See [`DbHandle::connect`].
    pub async fn from_config(cfg: &DbConfig) -> Result<Self> {
        Self::connect(&cfg.dsn, &ConnectOpts::from(&cfg.pool)).await
    }

    #[must_use]
    pub const fn engine(&self) -> DbEngine {
        self.engine
    }

    /// DSN with credentials redacted.
    #[must_use]
    pub fn dsn(&self) -> String {
        redact_dsn(&self.dsn)
    }

    #[must_use]
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    /// Transaction manager over this handle's pool.
    #[must_use]
    pub fn db(&self) -> Db {
        Db::new(self.sea.clone())
    }

    /// Graceful pool close.
    ///
    /// # Errors
    /// Returns an error if the pool fails to close.
    pub async fn close(self) -> Result<()> {
        self.sea.close().await?;
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn backend_detection() {
        assert_eq!(DbHandle::detect("sqlite::memory:").unwrap(), DbEngine::Sqlite);
        assert_eq!(
            DbHandle::detect("postgres://u:p@h/db").unwrap(),
            DbEngine::Postgres
        );
        assert_eq!(DbHandle::detect("mysql://u:p@h/db").unwrap(), DbEngine::MySql);
        assert!(matches!(
            DbHandle::detect("redis://h"),
            Err(DbError::UnknownDsn(_))
        ));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn sqlite_connection_enforces_foreign_keys() -> Result<()> {
        use sea_orm::{ConnectionTrait, Statement};

        let opts = ConnectOpts {
            max_conns: Some(1),
            ..ConnectOpts::default()
        };
        let handle = DbHandle::connect("sqlite::memory:", &opts).await?;
        let conn = handle.sea();
        let row = conn
            .query_one(Statement::from_string(
                conn.get_database_backend(),
                "PRAGMA foreign_keys",
            ))
            .await?
            .ok_or(DbError::UnknownDsn("no pragma row".to_owned()))?;
        let enabled: i32 = row.try_get_by_index(0)?;
        assert_eq!(enabled, 1);
        Ok(())
    }
}
