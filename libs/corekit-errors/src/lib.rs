//! Error taxonomy shared by every layer of the service.
//!
//! - [`AppError`]: the classified error value (code, message, kind, details, cause)
//! - [`ErrorKind`]: the closed retry taxonomy
//! - [`catalog`]: static definitions of the well-known codes
//! - [`StatusRegistry`]: code to HTTP status mapping that modules extend at startup
//! - [`Problem`]: the JSON payload sent to clients
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod error;
pub mod kind;
pub mod problem;
pub mod registry;

pub use catalog::ErrDef;
pub use error::{AppError, Details, FieldViolation};
pub use kind::ErrorKind;
pub use problem::{APPLICATION_PROBLEM_JSON, Problem};
pub use registry::StatusRegistry;

/// Library-local result alias.
pub type AppResult<T> = Result<T, AppError>;

/// Attach request identity to a problem before it leaves the service.
pub fn finalize(mut p: Problem, instance: &str, trace_id: Option<String>) -> Problem {
    p = p.with_instance(instance);
    if let Some(tid) = trace_id {
        p = p.with_trace_id(tid);
    }
    p
}
