use async_trait::async_trait;
use corekit_db::{BaseRepository, Db, RequestContext, on_session};
use corekit_errors::{AppResult, catalog};
use sea_orm::ActiveValue::Set;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::entity::{booking, booking_detail};
use super::mapper::{detail_active, header_active, to_domain};
use crate::domain::model::Booking;
use crate::domain::repo::{BookingCommandRepository, BookingQueryRepository};
use crate::errors::BOOKING_NOT_FOUND;

/// Header and detail writes share one unit of work. When the caller already
/// runs inside a transaction the writes join it.
#[derive(Clone, Debug)]
pub struct SeaOrmBookingCommandRepository {
    headers: BaseRepository<booking::Entity>,
    details: BaseRepository<booking_detail::Entity>,
}

impl SeaOrmBookingCommandRepository {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            headers: BaseRepository::new(db.clone()),
            details: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &Db {
        self.headers.db()
    }

    async fn insert_details(&self, ctx: &RequestContext, booking: &Booking) -> AppResult<()> {
        for (idx, detail) in booking.details.iter().enumerate() {
            let line_no = i32::try_from(idx + 1)
                .map_err(|_| catalog::INTERNAL_ERROR.error_with("too many booking details"))?;
            self.details.create(ctx, detail_active(detail, line_no)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BookingCommandRepository for SeaOrmBookingCommandRepository {
    async fn create(&self, ctx: &RequestContext, booking: &Booking) -> AppResult<()> {
        self.db()
            .atomic(ctx, |tx| async move {
                self.headers.create(&tx, header_active(booking)).await?;
                self.insert_details(&tx, booking).await
            })
            .await
    }

    async fn update(&self, ctx: &RequestContext, booking: &Booking) -> AppResult<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.db()
            .atomic(ctx, |tx| async move {
                let mut header = header_active(booking);
                header.updated_at = Set(Some(now));
                self.headers.update(&tx, header).await.map_err(|e| {
                    if e.is("NOT_FOUND") {
                        BOOKING_NOT_FOUND.error()
                    } else {
                        e
                    }
                })?;

                let stale = booking_detail::Entity::delete_many()
                    .filter(booking_detail::Column::BookingId.eq(booking.id));
                on_session!(self.db().session(&tx), |c| tx.guard(stale.exec(c)).await)?;
                self.insert_details(&tx, booking).await
            })
            .await
    }

    async fn delete(&self, ctx: &RequestContext, booking: &Booking) -> AppResult<()> {
        // Details go with the header through the cascading foreign key.
        let removed = self.headers.delete(ctx, header_active(booking)).await?;
        if removed == 0 {
            return Err(BOOKING_NOT_FOUND.error());
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SeaOrmBookingQueryRepository {
    db: Db,
}

impl SeaOrmBookingQueryRepository {
    #[must_use]
    pub const fn new(db: Db) -> Self {
        Self { db }
    }

    async fn load(
        &self,
        ctx: &RequestContext,
        header: Option<booking::Model>,
    ) -> AppResult<Option<Booking>> {
        let Some(header) = header else {
            return Ok(None);
        };
        let details = self
            .db
            .find_all(
                ctx,
                booking_detail::Entity::find()
                    .filter(booking_detail::Column::BookingId.eq(header.id))
                    .order_by_asc(booking_detail::Column::LineNo)
                    .order_by_asc(booking_detail::Column::Id),
            )
            .await?;
        to_domain(header, details).map(Some)
    }
}

#[async_trait]
impl BookingQueryRepository for SeaOrmBookingQueryRepository {
    async fn exists_by_code(&self, ctx: &RequestContext, code: &str) -> AppResult<bool> {
        if code.is_empty() {
            return Ok(false);
        }
        let found = self
            .db
            .find_one(
                ctx,
                booking::Entity::find().filter(booking::Column::BookingCode.eq(code)),
            )
            .await?;
        Ok(found.is_some())
    }

    async fn find_by_id(&self, ctx: &RequestContext, id: Uuid) -> AppResult<Option<Booking>> {
        let header = self.db.find_one(ctx, booking::Entity::find_by_id(id)).await?;
        self.load(ctx, header).await
    }

    async fn find_by_code(&self, ctx: &RequestContext, code: &str) -> AppResult<Option<Booking>> {
        let header = self
            .db
            .find_one(
                ctx,
                booking::Entity::find().filter(booking::Column::BookingCode.eq(code)),
            )
            .await?;
        self.load(ctx, header).await
    }
}
