use std::sync::Arc;

use corekit_db::{Db, RequestContext};
use corekit_errors::{AppError, AppResult};

use super::model::{Booking, NewBooking};
use super::repo::{BookingCommandRepository, BookingQueryRepository};
use crate::errors::BOOKING_CODE_ALREADY_EXISTS;

/// Booking use cases.
///
/// Errors raised by repositories are already classified and are returned as
/// they are. Only rule violations detected here are logged.
pub struct Service {
    db: Db,
    cmd: Arc<dyn BookingCommandRepository>,
    qry: Arc<dyn BookingQueryRepository>,
}

impl Service {
    #[must_use]
    pub fn new(
        db: Db,
        cmd: Arc<dyn BookingCommandRepository>,
        qry: Arc<dyn BookingQueryRepository>,
    ) -> Self {
        Self { db, cmd, qry }
    }

    /// Open a booking and persist it with its details in one transaction.
    ///
    /// # Errors
    /// Returns the validation failure, `BOOKING_CODE_ALREADY_EXISTS` when the
    /// code is taken, or the storage error from the write.
    #[tracing::instrument(name = "usecase:booking.create", skip_all, fields(request_id = %ctx.request_id()))]
    pub async fn create_booking(&self, ctx: &RequestContext, input: NewBooking) -> AppResult<Booking> {
        tracing::info!(
            business_key.booking_code = %input.code,
            business_key.count_details = input.details.len(),
            "usecase started"
        );

        let booking = Booking::open(input, chrono::Utc::now().timestamp_millis());
        if let Err(err) = booking.validate() {
            rule_violation(&err);
            return Err(err);
        }

        if self.qry.exists_by_code(ctx, &booking.code).await? {
            let err = BOOKING_CODE_ALREADY_EXISTS.error();
            rule_violation(&err);
            return Err(err);
        }

        self.db
            .atomic(ctx, |tx| {
                let cmd = &self.cmd;
                let booking = &booking;
                async move { cmd.create(&tx, booking).await }
            })
            .await?;

        tracing::info!(booking_id = %booking.id, "usecase completed");
        Ok(booking)
    }

    /// # Errors
    /// Returns the classified storage failure.
    pub async fn find_by_code(&self, ctx: &RequestContext, code: &str) -> AppResult<Option<Booking>> {
        self.qry.find_by_code(ctx, code).await
    }
}

fn rule_violation(err: &AppError) {
    tracing::warn!(
        code = err.code(),
        error = %err,
        retryable = err.is_retryable(),
        "domain logic validation failed"
    );
}
