//! Code to HTTP status mapping shared by all modules.

use std::collections::HashMap;

use http::StatusCode;
use parking_lot::RwLock;

use crate::catalog::{self, ErrDef};
use crate::error::AppError;
use crate::problem::Problem;

/// Process-wide `code -> status` table.
///
/// Owned by the host and handed to modules during startup so each can add its
/// own codes. Resolution falls back to the error kind when a code is unknown,
/// so it never fails. Codes are matched case-insensitively.
#[derive(Debug, Default)]
pub struct StatusRegistry {
    entries: RwLock<HashMap<String, StatusCode>>,
}

impl StatusRegistry {
    /// Empty registry. Every code resolves through its kind.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the request-level codes from [`catalog::DEFAULTS`].
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_catalog(catalog::DEFAULTS);
        registry
    }

    /// Insert or overwrite one mapping. Last write wins.
    pub fn register(&self, code: &str, status: StatusCode) {
        let key = normalize(code);
        let previous = self.entries.write().insert(key, status);
        if let Some(prev) = previous.filter(|p| *p != status) {
            tracing::debug!(code, from = prev.as_u16(), to = status.as_u16(), "status mapping overridden");
        }
    }

    /// Register every catalog entry that declares an explicit status.
    pub fn register_catalog(&self, defs: &[ErrDef]) {
        let mut entries = self.entries.write();
        for def in defs {
            if let Some(status) = def.status {
                entries.insert(normalize(def.code), status);
            }
        }
    }

    #[must_use]
    pub fn lookup(&self, code: &str) -> Option<StatusCode> {
        self.entries.read().get(&normalize(code)).copied()
    }

    /// Status for an error: explicit mapping first, then the kind fallback.
    #[must_use]
    pub fn resolve(&self, err: &AppError) -> StatusCode {
        self.lookup(err.code())
            .unwrap_or_else(|| err.kind().fallback_status())
    }

    /// Render an error as a client payload with its resolved status.
    pub fn problem(&self, err: &AppError) -> Problem {
        Problem::from_error(err, self.resolve(err))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
