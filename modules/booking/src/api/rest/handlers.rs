use std::sync::Arc;

use axum::extract::rejection::{ExtensionRejection, JsonRejection};
use axum::extract::{Extension, OriginalUri, Path};
use axum::http::StatusCode;
use axum::Json;
use corekit_db::RequestContext;
use corekit_errors::{AppError, Problem, StatusRegistry, catalog};

use super::dto::{ApiResponse, BookingDto, CreateBookingRequest};
use super::error::app_error_to_problem;
use crate::domain::service::Service;
use crate::errors::BOOKING_NOT_FOUND;

/// Dependencies shared by booking handlers.
pub struct RestState {
    pub service: Arc<Service>,
    pub registry: Arc<StatusRegistry>,
}

type HandlerResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), Problem>;

/// The host installs a [`RequestContext`] per request; without one the
/// handler runs under a fresh context.
fn request_context(ext: Result<Extension<RequestContext>, ExtensionRejection>) -> RequestContext {
    ext.map_or_else(|_| RequestContext::new(), |Extension(ctx)| ctx)
}

pub async fn create_booking(
    Extension(state): Extension<Arc<RestState>>,
    ctx: Result<Extension<RequestContext>, ExtensionRejection>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> HandlerResult<BookingDto> {
    let ctx = request_context(ctx);
    let fail = |err: AppError| app_error_to_problem(&state.registry, &err, uri.path(), ctx.request_id());

    let Json(req) = body.map_err(|rejection| fail(catalog::MALFORMED_REQUEST.error().with_cause(rejection)))?;
    let input = req.validate().map_err(fail)?;

    tracing::info!(business_key.booking_code = %input.code, "request received");

    let booking = state
        .service
        .create_booking(&ctx, input)
        .await
        .map_err(fail)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Booking created successfully",
            booking.into(),
            ctx.request_id(),
        )),
    ))
}

pub async fn get_booking(
    Extension(state): Extension<Arc<RestState>>,
    ctx: Result<Extension<RequestContext>, ExtensionRejection>,
    OriginalUri(uri): OriginalUri,
    Path(code): Path<String>,
) -> HandlerResult<BookingDto> {
    let ctx = request_context(ctx);
    let fail = |err: AppError| app_error_to_problem(&state.registry, &err, uri.path(), ctx.request_id());

    tracing::info!(business_key.booking_code = %code, "request received");

    let booking = state
        .service
        .find_by_code(&ctx, &code)
        .await
        .map_err(fail)?
        .ok_or_else(|| fail(BOOKING_NOT_FOUND.error()))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(
            "Booking details retrieved successfully",
            booking.into(),
            ctx.request_id(),
        )),
    ))
}
