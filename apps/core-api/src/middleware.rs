//! Per-request context installation.

use std::time::Duration;

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use corekit_db::RequestContext;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

/// Incoming id when it is usable, otherwise a fresh UUID v4.
#[must_use]
pub fn request_id(req: &Request) -> String {
    req.headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned)
}

/// Attach a [`RequestContext`] bounded by `timeout` and cancelled with
/// `cancel`, then echo its id on the response.
pub async fn install_context(
    timeout: Duration,
    cancel: CancellationToken,
    mut req: Request,
    next: Next,
) -> Response {
    let id = request_id(&req);
    let header = HeaderValue::from_str(&id).ok();
    if let Some(value) = &header {
        req.headers_mut().insert(X_REQUEST_ID.clone(), value.clone());
    }
    let ctx = RequestContext::with_request_id(id.as_str())
        .with_cancellation(cancel)
        .with_timeout(timeout);
    req.extensions_mut().insert(ctx);

    let mut resp = next.run(req).await;
    if let Some(value) = header {
        resp.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    resp
}
