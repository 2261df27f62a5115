//! The error value carried across every layer of the application.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::error::Error as StdError;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::ErrorKind;

type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// One invalid field reported by request validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct FieldViolation {
    /// Field path, e.g. "email" or "details[0].quantity".
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Structured context attached to an error.
///
/// Exactly one shape is active at a time. Switching shapes through the
/// builder methods on [`AppError`] starts a fresh container of the new shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Details {
    #[default]
    None,
    Map(BTreeMap<String, Value>),
    List(Vec<FieldViolation>),
}

impl Details {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(map) => map.get(key),
            Self::None | Self::List(_) => None,
        }
    }

    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::List(list) => list,
            Self::None | Self::Map(_) => &[],
        }
    }
}

/// Classified application error.
///
/// `code` and `kind` are fixed at construction. `details` can only grow
/// through the builder methods, or be swapped as a whole via
/// [`AppError::replace_validation_errors`]. The optional `cause` is kept for
/// diagnostics and never leaks into the code, the message, or the wire payload.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
#[must_use]
pub struct AppError {
    code: Cow<'static, str>,
    message: String,
    kind: ErrorKind,
    details: Details,
    #[source]
    cause: Option<BoxedCause>,
}

impl AppError {
    pub fn new(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
        kind: ErrorKind,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            kind,
            details: Details::None,
            cause: None,
        }
    }

    pub fn persistent(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::Persistent)
    }

    pub fn transient(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::Transient)
    }

    pub fn internal(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::Internal)
    }

    /// Attach the underlying failure. Code and kind stay as they are.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Add one key to the map-shaped details.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Details::Map(map) = &mut self.details {
            map.insert(key.into(), value.into());
        } else {
            self.details = Details::Map(BTreeMap::from([(key.into(), value.into())]));
        }
        self
    }

    /// Append one field violation to the list-shaped details.
    pub fn add_validation_error(self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add_violation(FieldViolation::new(field, message))
    }

    pub fn add_violation(mut self, violation: FieldViolation) -> Self {
        if let Details::List(list) = &mut self.details {
            list.push(violation);
        } else {
            self.details = Details::List(vec![violation]);
        }
        self
    }

    /// Replace the details with the given violation list.
    pub fn replace_validation_errors(mut self, violations: Vec<FieldViolation>) -> Self {
        self.details = Details::List(violations);
        self
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub const fn details(&self) -> &Details {
        &self.details
    }

    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// True when this error carries the given code.
    #[must_use]
    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn constructors_fix_code_and_kind() {
        let err = AppError::transient("DB_TIMEOUT", "database operation timed out");
        assert_eq!(err.code(), "DB_TIMEOUT");
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "database operation timed out");
        assert!(err.details().is_none());
    }

    #[test]
    fn cause_is_kept_out_of_message() {
        let err = AppError::internal("INTERNAL_ERROR", "unexpected database error")
            .with_cause(io::Error::other("disk on fire"));
        assert_eq!(err.to_string(), "unexpected database error");
        assert_eq!(err.code(), "INTERNAL_ERROR");
        let source = StdError::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("disk on fire"));
    }

    #[test]
    fn detail_map_grows_append_style() {
        let err = AppError::persistent("DB_CONFLICT", "duplicate value")
            .with_detail("constraint", "bookings_code_key")
            .with_detail("detail", "Key (booking_code)=(X) already exists.");
        let Details::Map(map) = err.details() else {
            panic!("expected map details");
        };
        assert_eq!(map.len(), 2);
        assert_eq!(err.details().get("constraint"), Some(&Value::from("bookings_code_key")));
    }

    #[test]
    fn validation_errors_append_then_replace() {
        let err = AppError::persistent("VALIDATION_ERROR", "invalid request")
            .add_validation_error("user_id", "is required")
            .add_validation_error("details", "must not be empty");
        assert_eq!(err.details().violations().len(), 2);

        let err = err.replace_validation_errors(vec![FieldViolation::new("amount", "negative")]);
        assert_eq!(err.details().violations().len(), 1);
        assert_eq!(err.details().violations()[0].field, "amount");
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn switching_shape_starts_fresh_container() {
        let err = AppError::persistent("X", "x")
            .add_validation_error("a", "bad")
            .with_detail("k", 1);
        assert_eq!(err.details().violations().len(), 0);
        assert_eq!(err.details().get("k"), Some(&Value::from(1)));

        let err = err.add_validation_error("b", "bad");
        assert!(err.details().get("k").is_none());
        assert_eq!(err.details().violations().len(), 1);
    }

    #[test]
    fn details_serialize_untagged() {
        let list = Details::List(vec![FieldViolation::new("f", "m").with_code("required")]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"field": "f", "message": "m", "code": "required"}])
        );
        assert_eq!(serde_json::to_value(Details::None).unwrap(), Value::Null);
    }
}
