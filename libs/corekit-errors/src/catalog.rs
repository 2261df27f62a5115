//! Error catalog: static definitions of every well-known code.
//!
//! Modules declare their own `ErrDef` constants next to their domain code and
//! hand them to [`StatusRegistry::register_catalog`](crate::StatusRegistry::register_catalog)
//! at startup. The definitions below are the infrastructure and request-level
//! codes shared by all modules.

use http::StatusCode;

use crate::error::AppError;
use crate::kind::ErrorKind;

/// Static error definition from a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub code: &'static str,
    pub kind: ErrorKind,
    /// Explicit HTTP status. `None` leaves resolution to the kind fallback.
    pub status: Option<StatusCode>,
    /// Default human message.
    pub message: &'static str,
}

impl ErrDef {
    #[must_use]
    pub const fn new(code: &'static str, kind: ErrorKind, message: &'static str) -> Self {
        Self {
            code,
            kind,
            status: None,
            message,
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Build an error with the catalog message.
    #[inline]
    pub fn error(&self) -> AppError {
        AppError::new(self.code, self.message, self.kind)
    }

    /// Build an error with a message specific to this occurrence.
    #[inline]
    pub fn error_with(&self, message: impl Into<String>) -> AppError {
        AppError::new(self.code, message, self.kind)
    }
}

const fn persistent(code: &'static str, message: &'static str, status: StatusCode) -> ErrDef {
    ErrDef::new(code, ErrorKind::Persistent, message).with_status(status)
}

// Infrastructure. Left without an explicit status so the kind fallback
// applies unless a module registers its own mapping.
pub const DB_CONNECTION_FAILED: ErrDef = ErrDef::new(
    "DB_CONNECTION_FAILED",
    ErrorKind::Transient,
    "database connection failed",
);
pub const DB_TIMEOUT: ErrDef =
    ErrDef::new("DB_TIMEOUT", ErrorKind::Transient, "database operation timed out");
pub const DB_DEADLOCK: ErrDef =
    ErrDef::new("DB_DEADLOCK", ErrorKind::Transient, "database deadlock detected");
pub const DB_CONSTRAINT: ErrDef = ErrDef::new(
    "DB_CONSTRAINT",
    ErrorKind::Persistent,
    "database constraint violation",
);
pub const DB_CONFLICT: ErrDef =
    ErrDef::new("DB_CONFLICT", ErrorKind::Persistent, "duplicate value violates unique constraint");
pub const INTERNAL_ERROR: ErrDef = ErrDef::new("INTERNAL_ERROR", ErrorKind::Internal, "internal error")
    .with_status(StatusCode::INTERNAL_SERVER_ERROR);

// Request level.
pub const MALFORMED_REQUEST: ErrDef = persistent(
    "MALFORMED_REQUEST",
    "invalid JSON format or data type",
    StatusCode::BAD_REQUEST,
);
pub const INVALID_REQUEST: ErrDef =
    persistent("INVALID_REQUEST", "invalid request", StatusCode::BAD_REQUEST);
pub const VALIDATION_ERROR: ErrDef =
    persistent("VALIDATION_ERROR", "validation error", StatusCode::BAD_REQUEST);
pub const UNAUTHORIZED: ErrDef =
    persistent("UNAUTHORIZED", "unauthorized", StatusCode::UNAUTHORIZED);
pub const FORBIDDEN: ErrDef = persistent("FORBIDDEN", "forbidden", StatusCode::FORBIDDEN);
pub const NOT_FOUND: ErrDef = persistent("NOT_FOUND", "not found", StatusCode::NOT_FOUND);
pub const METHOD_NOT_ALLOWED: ErrDef = persistent(
    "METHOD_NOT_ALLOWED",
    "method not allowed",
    StatusCode::METHOD_NOT_ALLOWED,
);
pub const NOT_ACCEPTABLE: ErrDef =
    persistent("NOT_ACCEPTABLE", "not acceptable", StatusCode::NOT_ACCEPTABLE);
pub const REQUEST_TIMEOUT: ErrDef =
    persistent("REQUEST_TIMEOUT", "request timeout", StatusCode::REQUEST_TIMEOUT);
pub const CONFLICT: ErrDef = persistent("CONFLICT", "conflict", StatusCode::CONFLICT);
pub const GONE: ErrDef = persistent("GONE", "gone", StatusCode::GONE);
pub const PRECONDITION_FAILED: ErrDef = persistent(
    "PRECONDITION_FAILED",
    "precondition failed",
    StatusCode::PRECONDITION_FAILED,
);
pub const PAYLOAD_TOO_LARGE: ErrDef =
    persistent("PAYLOAD_TOO_LARGE", "payload too large", StatusCode::PAYLOAD_TOO_LARGE);
pub const UNSUPPORTED_MEDIA_TYPE: ErrDef = persistent(
    "UNSUPPORTED_MEDIA_TYPE",
    "unsupported media type",
    StatusCode::UNSUPPORTED_MEDIA_TYPE,
);
pub const UNPROCESSABLE_ENTITY: ErrDef = persistent(
    "UNPROCESSABLE_ENTITY",
    "unprocessable entity",
    StatusCode::UNPROCESSABLE_ENTITY,
);
pub const LOCKED: ErrDef = persistent("LOCKED", "locked", StatusCode::LOCKED);
pub const TOO_MANY_REQUESTS: ErrDef =
    persistent("TOO_MANY_REQUESTS", "too many requests", StatusCode::TOO_MANY_REQUESTS);

/// Codes every registry starts with.
pub const DEFAULTS: &[ErrDef] = &[
    INTERNAL_ERROR,
    MALFORMED_REQUEST,
    INVALID_REQUEST,
    VALIDATION_ERROR,
    UNAUTHORIZED,
    FORBIDDEN,
    NOT_FOUND,
    METHOD_NOT_ALLOWED,
    NOT_ACCEPTABLE,
    REQUEST_TIMEOUT,
    CONFLICT,
    GONE,
    PRECONDITION_FAILED,
    PAYLOAD_TOO_LARGE,
    UNSUPPORTED_MEDIA_TYPE,
    UNPROCESSABLE_ENTITY,
    LOCKED,
    TOO_MANY_REQUESTS,
];

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn err_def_builds_app_error() {
        let err = DB_DEADLOCK.error();
        assert_eq!(err.code(), "DB_DEADLOCK");
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(err.message(), "database deadlock detected");

        let err = NOT_FOUND.error_with("booking 42 not found");
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.message(), "booking 42 not found");
    }

    #[test]
    fn db_codes_carry_no_explicit_status() {
        for def in [
            DB_CONNECTION_FAILED,
            DB_TIMEOUT,
            DB_DEADLOCK,
            DB_CONSTRAINT,
            DB_CONFLICT,
        ] {
            assert!(def.status.is_none(), "{} should fall back by kind", def.code);
        }
    }

    #[test]
    fn defaults_all_have_status() {
        assert!(DEFAULTS.iter().all(|d| d.status.is_some()));
    }
}
