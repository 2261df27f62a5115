use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};

use super::handlers::{self, RestState};

pub const BOOKINGS_PATH: &str = "/api/v1/bookings";

#[must_use]
pub fn register_routes(router: Router, state: Arc<RestState>) -> Router {
    let bookings = Router::new()
        .route(BOOKINGS_PATH, post(handlers::create_booking))
        .route(&format!("{BOOKINGS_PATH}/{{code}}"), get(handlers::get_booking))
        .layer(Extension(state));
    router.merge(bookings)
}
