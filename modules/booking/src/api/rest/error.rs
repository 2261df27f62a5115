use corekit_errors::{AppError, Problem, StatusRegistry};

/// Render a handler failure as the client payload.
///
/// The status comes from the shared registry, the request id becomes the
/// problem's `trace_id`. Server-side failures are logged with their cause.
pub fn app_error_to_problem(
    registry: &StatusRegistry,
    err: &AppError,
    instance: &str,
    request_id: &str,
) -> Problem {
    let problem = registry.problem(err);
    if problem.status.is_server_error() {
        tracing::error!(
            code = err.code(),
            status = problem.status.as_u16(),
            error = ?err,
            "request failed"
        );
    } else {
        tracing::debug!(code = err.code(), status = problem.status.as_u16(), "request rejected");
    }
    corekit_errors::finalize(problem, instance, Some(request_id.to_owned()))
}
