//! Booking error catalog.

use corekit_errors::{ErrDef, ErrorKind, StatusRegistry, catalog};
use axum::http::StatusCode;

pub const BOOKING_NOT_FOUND: ErrDef =
    ErrDef::new("BOOKING_NOT_FOUND", ErrorKind::Persistent, "booking record not found")
        .with_status(StatusCode::NOT_FOUND);

pub const BOOKING_CODE_ALREADY_EXISTS: ErrDef = ErrDef::new(
    "BOOKING_CODE_ALREADY_EXISTS",
    ErrorKind::Persistent,
    "booking code already exists",
)
.with_status(StatusCode::CONFLICT);

pub const BOOKING_AMOUNT_INCONSISTENT: ErrDef = ErrDef::new(
    "BOOKING_AMOUNT_INCONSISTENT",
    ErrorKind::Persistent,
    "total amount does not match with details subtotal",
)
.with_status(StatusCode::UNPROCESSABLE_ENTITY);

pub const BOOKING_DETAIL_REQUIRED: ErrDef = ErrDef::new(
    "BOOKING_DETAIL_REQUIRED",
    ErrorKind::Persistent,
    "booking must have at least one detail",
)
.with_status(StatusCode::UNPROCESSABLE_ENTITY);

pub const ALL: &[ErrDef] = &[
    BOOKING_NOT_FOUND,
    BOOKING_CODE_ALREADY_EXISTS,
    BOOKING_AMOUNT_INCONSISTENT,
    BOOKING_DETAIL_REQUIRED,
];

/// Add the booking codes to the host registry.
///
/// Duplicate keys are the only storage conflict this module can hit, so
/// `DB_CONFLICT` is mapped to 409 as well.
pub fn register_errors(registry: &StatusRegistry) {
    registry.register_catalog(ALL);
    registry.register(catalog::DB_CONFLICT.code, StatusCode::CONFLICT);
}
