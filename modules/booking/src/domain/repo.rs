use async_trait::async_trait;
use corekit_db::RequestContext;
use corekit_errors::AppResult;
use uuid::Uuid;

use super::model::Booking;

/// Writes of a booking header together with its details.
///
/// Calls follow the ambient transaction carried by `ctx`.
#[async_trait]
pub trait BookingCommandRepository: Send + Sync {
    async fn create(&self, ctx: &RequestContext, booking: &Booking) -> AppResult<()>;

    /// Replace the stored header and its details.
    async fn update(&self, ctx: &RequestContext, booking: &Booking) -> AppResult<()>;

    async fn delete(&self, ctx: &RequestContext, booking: &Booking) -> AppResult<()>;
}

#[async_trait]
pub trait BookingQueryRepository: Send + Sync {
    /// An empty code never exists.
    async fn exists_by_code(&self, ctx: &RequestContext, code: &str) -> AppResult<bool>;

    async fn find_by_id(&self, ctx: &RequestContext, id: Uuid) -> AppResult<Option<Booking>>;

    async fn find_by_code(&self, ctx: &RequestContext, code: &str) -> AppResult<Option<Booking>>;
}
