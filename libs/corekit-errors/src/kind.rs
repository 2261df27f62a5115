//! Failure kinds: the closed set every error is classified into.

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Retry class of a failure.
///
/// The kind decides whether a caller may retry and which HTTP status is used
/// when no explicit mapping exists for the error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Fails again on an identical retry (bad input, conflicts, missing data).
    Persistent,
    /// May succeed on retry (timeouts, lost connections, deadlocks).
    Transient,
    /// An unexpected defect. Never retryable.
    Internal,
}

impl ErrorKind {
    /// HTTP status used when the registry has no entry for a code.
    #[must_use]
    pub const fn fallback_status(self) -> StatusCode {
        match self {
            Self::Persistent => StatusCode::BAD_REQUEST,
            Self::Transient => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Persistent => "PERSISTENT",
            Self::Transient => "TRANSIENT",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
