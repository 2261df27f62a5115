//! Translation of driver failures into [`AppError`].
//!
//! Every storage failure is reduced to a [`Facts`] view (vendor code, driver
//! signal, constraint, message) and then run through an ordered rule list.
//! The first matching rule wins, structured codes are consulted before any
//! message text, and a final fallback keeps the mapping total.
//!
//! "Record not found" is not an error kind: it is handed back untouched as
//! [`Classified::NotFound`] so repositories decide whether absence matters.

use std::fmt;

use corekit_errors::{AppError, ErrorKind, catalog};
use sea_orm::{ConnAcquireErr, DbErr, RuntimeErr};

/// Any failure that can come out of a storage call.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The request context was cancelled before the call completed.
    #[error("operation cancelled")]
    Cancelled,
    /// The request deadline passed before the call completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error(transparent)]
    Db(#[from] DbErr),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    /// Pre-extracted driver failure, for drivers reached outside SeaORM.
    #[error(transparent)]
    Driver(#[from] DriverFault),
}

/// Normalised view of a vendor error.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverFault {
    /// Vendor code: SQLSTATE for Postgres, error number for `MySQL`,
    /// extended result code for `SQLite`.
    pub code: Option<String>,
    pub signal: Option<Signal>,
    pub constraint: Option<String>,
    pub detail: Option<String>,
    pub message: String,
}

impl DriverFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub const fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Failure class reported by the driver itself, independent of vendor codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Timeout,
    Connection,
    UniqueViolation,
    ForeignKeyViolation,
    NotNullViolation,
    CheckViolation,
    Schema,
    NotFound,
}

/// Outcome of classification.
#[derive(Debug)]
pub enum Classified {
    /// Absence of a row. The raw error is kept for callers that want it.
    NotFound(StorageError),
    Error(AppError),
}

impl Classified {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Read-path helper: absence becomes `None`.
    ///
    /// # Errors
    /// Returns the classified error for anything other than "not found".
    pub fn optional<T>(self) -> Result<Option<T>, AppError> {
        match self {
            Self::NotFound(_) => Ok(None),
            Self::Error(err) => Err(err),
        }
    }
}

/// Write-path conversion: absence surfaces as `NOT_FOUND`.
impl From<Classified> for AppError {
    fn from(value: Classified) -> Self {
        match value {
            Classified::NotFound(raw) => catalog::NOT_FOUND.error_with("record not found").with_cause(raw),
            Classified::Error(err) => err,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        classify(value).into()
    }
}

/// Classify a storage failure.
pub fn classify(err: impl Into<StorageError>) -> Classified {
    let err = err.into();
    let facts = match &err {
        StorageError::Cancelled => {
            return Classified::Error(
                catalog::DB_TIMEOUT.error_with("database operation cancelled"),
            );
        }
        StorageError::DeadlineExceeded => {
            return Classified::Error(
                catalog::DB_TIMEOUT.error_with("database operation timed out"),
            );
        }
        other => Facts::of(other),
    };

    if facts.signal == Some(Signal::NotFound) {
        return Classified::NotFound(err);
    }

    let app = RULES
        .iter()
        .find_map(|rule| rule(&facts))
        .unwrap_or_else(|| catalog::INTERNAL_ERROR.error_with("unexpected database error"));

    if app.kind() == ErrorKind::Internal {
        tracing::error!(code = ?facts.code, error = %facts.message, "unclassified storage failure");
    }
    Classified::Error(app.with_cause(err))
}

/// Driver-independent view of a failure.
#[derive(Debug, Default)]
struct Facts {
    code: Option<String>,
    signal: Option<Signal>,
    constraint: Option<String>,
    detail: Option<String>,
    message: String,
}

impl Facts {
    fn of(err: &StorageError) -> Self {
        match err {
            StorageError::Cancelled | StorageError::DeadlineExceeded => Self {
                signal: Some(Signal::Timeout),
                message: err.to_string(),
                ..Self::default()
            },
            StorageError::Db(db) => Self::of_db(db),
            StorageError::Sqlx(e) => Self::of_sqlx(e),
            StorageError::Driver(fault) => Self {
                code: fault.code.clone(),
                signal: fault.signal,
                constraint: fault.constraint.clone(),
                detail: fault.detail.clone(),
                message: fault.message.clone(),
            },
        }
    }

    fn of_db(err: &DbErr) -> Self {
        match err {
            DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => {
                Self::signalled(Signal::Timeout, err)
            }
            DbErr::ConnectionAcquire(ConnAcquireErr::ConnectionClosed) => {
                Self::signalled(Signal::Connection, err)
            }
            DbErr::Conn(runtime) => {
                let mut facts = Self::of_runtime(runtime);
                if facts.code.is_none() {
                    facts.signal.get_or_insert(Signal::Connection);
                }
                facts
            }
            DbErr::Exec(runtime) | DbErr::Query(runtime) => Self::of_runtime(runtime),
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => {
                Self::signalled(Signal::NotFound, err)
            }
            other => Self {
                message: other.to_string(),
                ..Self::default()
            },
        }
    }

    fn of_runtime(err: &RuntimeErr) -> Self {
        match err {
            RuntimeErr::SqlxError(e) => Self::of_sqlx(e),
            RuntimeErr::Internal(msg) => Self {
                message: msg.clone(),
                ..Self::default()
            },
        }
    }

    fn of_sqlx(err: &sqlx::Error) -> Self {
        use sqlx::Error as E;

        match err {
            E::Database(db) => Self::of_database(db.as_ref()),
            E::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                Self::signalled(Signal::Timeout, err)
            }
            E::PoolTimedOut => Self::signalled(Signal::Timeout, err),
            E::Io(_) | E::Tls(_) | E::PoolClosed | E::WorkerCrashed => {
                Self::signalled(Signal::Connection, err)
            }
            E::RowNotFound => Self::signalled(Signal::NotFound, err),
            E::ColumnNotFound(_)
            | E::ColumnIndexOutOfBounds { .. }
            | E::ColumnDecode { .. }
            | E::Decode(_)
            | E::TypeNotFound { .. } => Self::signalled(Signal::Schema, err),
            other => Self {
                message: other.to_string(),
                ..Self::default()
            },
        }
    }

    fn of_database(db: &dyn sqlx::error::DatabaseError) -> Self {
        use sqlx::error::ErrorKind as K;

        let signal = match db.kind() {
            K::UniqueViolation => Some(Signal::UniqueViolation),
            K::ForeignKeyViolation => Some(Signal::ForeignKeyViolation),
            K::NotNullViolation => Some(Signal::NotNullViolation),
            K::CheckViolation => Some(Signal::CheckViolation),
            _ => None,
        };

        Self {
            code: vendor_code(db),
            signal,
            constraint: db
                .constraint()
                .map(str::to_owned)
                .or_else(|| sqlite_constraint(db.message())),
            detail: vendor_detail(db),
            message: db.message().to_owned(),
        }
    }

    fn signalled(signal: Signal, err: &dyn fmt::Display) -> Self {
        Self {
            signal: Some(signal),
            message: err.to_string(),
            ..Self::default()
        }
    }

    fn code_in(&self, codes: &[&str]) -> bool {
        self.code.as_deref().is_some_and(|c| codes.contains(&c))
    }
}

#[cfg(feature = "mysql")]
fn vendor_code(db: &dyn sqlx::error::DatabaseError) -> Option<String> {
    // MySQL reports SQLSTATE through `code()`; the error number is more precise.
    if let Some(my) = db.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() {
        return Some(my.number().to_string());
    }
    db.code().map(std::borrow::Cow::into_owned)
}

#[cfg(not(feature = "mysql"))]
fn vendor_code(db: &dyn sqlx::error::DatabaseError) -> Option<String> {
    db.code().map(std::borrow::Cow::into_owned)
}

#[cfg(feature = "pg")]
fn vendor_detail(db: &dyn sqlx::error::DatabaseError) -> Option<String> {
    db.try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
        .and_then(|pg| pg.detail())
        .map(str::to_owned)
}

#[cfg(not(feature = "pg"))]
fn vendor_detail(_db: &dyn sqlx::error::DatabaseError) -> Option<String> {
    None
}

/// SQLite has no constraint accessor; the name is in the message,
/// e.g. "UNIQUE constraint failed: bookings.booking_code".
fn sqlite_constraint(message: &str) -> Option<String> {
    message
        .split_once("constraint failed: ")
        .map(|(_, rest)| rest.trim().to_owned())
        .filter(|name| !name.is_empty())
}

type Rule = fn(&Facts) -> Option<AppError>;

/// Evaluation order. Earlier rules win.
const RULES: &[Rule] = &[
    timeout,
    connection_code,
    deadlock,
    lock_timeout,
    connection_signal,
    unique_violation,
    integrity_violation,
    schema_error,
    connection_heuristic,
];

const PG_CONNECTION: &[&str] = &[
    "08000", "08001", "08003", "08004", "08006", "08007", "08P01", "57P01", "57P02", "57P03",
];
const MYSQL_CONNECTION: &[&str] = &["2002", "2003", "2006", "2013"];
const DEADLOCK: &[&str] = &["40P01", "1213"];
// SQLITE_BUSY, SQLITE_LOCKED and their extended codes.
const LOCK_TIMEOUT: &[&str] = &["55P03", "1205", "5", "6", "261", "262", "517", "773"];
const UNIQUE: &[&str] = &["23505", "1062", "2067", "1555"];
const INTEGRITY: &[&str] = &[
    "23000", "23502", "23503", "23514", "1048", "1451", "1452", "19", "275", "787", "1299",
];
const SCHEMA: &[&str] = &["42601", "42703", "42P01", "42883", "1054", "1064", "1146"];
const CONNECTION_PHRASES: &[&str] = &[
    "connection refused",
    "can't assign requested address",
    "connection reset by peer",
    "broken pipe",
];

fn timeout(f: &Facts) -> Option<AppError> {
    (f.signal == Some(Signal::Timeout) || f.code_in(&["57014"]))
        .then(|| catalog::DB_TIMEOUT.error_with("database operation timed out"))
}

fn connection_code(f: &Facts) -> Option<AppError> {
    (f.code_in(PG_CONNECTION) || f.code_in(MYSQL_CONNECTION))
        .then(|| catalog::DB_CONNECTION_FAILED.error())
}

/// Driver-level connection signal. Ranked below the deadlock and lock codes
/// so a coded retryable failure keeps its precise classification.
fn connection_signal(f: &Facts) -> Option<AppError> {
    (f.signal == Some(Signal::Connection)).then(|| catalog::DB_CONNECTION_FAILED.error())
}

fn deadlock(f: &Facts) -> Option<AppError> {
    f.code_in(DEADLOCK)
        .then(|| catalog::DB_DEADLOCK.error_with("database deadlock detected, please retry"))
}

fn lock_timeout(f: &Facts) -> Option<AppError> {
    f.code_in(LOCK_TIMEOUT)
        .then(|| catalog::DB_TIMEOUT.error_with("database lock timeout"))
}

fn unique_violation(f: &Facts) -> Option<AppError> {
    if !(f.code_in(UNIQUE) || f.signal == Some(Signal::UniqueViolation)) {
        return None;
    }
    let err = catalog::DB_CONFLICT
        .error_with("duplicate data")
        .with_detail("constraint", f.constraint.clone().unwrap_or_default())
        .with_detail("detail", f.detail.clone().unwrap_or_default());
    Some(err)
}

fn integrity_violation(f: &Facts) -> Option<AppError> {
    let signalled = matches!(
        f.signal,
        Some(Signal::ForeignKeyViolation | Signal::NotNullViolation | Signal::CheckViolation)
    );
    if !(f.code_in(INTEGRITY) || signalled) {
        return None;
    }
    let mut err = catalog::DB_CONSTRAINT.error();
    if let Some(constraint) = &f.constraint {
        err = err.with_detail("constraint", constraint.clone());
    }
    Some(err)
}

fn schema_error(f: &Facts) -> Option<AppError> {
    (f.code_in(SCHEMA) || f.signal == Some(Signal::Schema))
        .then(|| catalog::INTERNAL_ERROR.error_with("database schema or syntax error"))
}

fn connection_heuristic(f: &Facts) -> Option<AppError> {
    if f.code.is_some() {
        return None;
    }
    let message = f.message.to_ascii_lowercase();
    CONNECTION_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
        .then(|| catalog::DB_CONNECTION_FAILED.error())
}
