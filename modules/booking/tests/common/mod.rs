#![allow(dead_code)]

use std::sync::Arc;

use booking::BookingModule;
use booking::domain::model::{Booking, NewBooking, NewBookingDetail};
use corekit_db::{ConnectOpts, DbHandle};
use corekit_errors::StatusRegistry;
use uuid::Uuid;

pub struct Harness {
    pub handle: DbHandle,
    pub module: BookingModule,
    pub registry: Arc<StatusRegistry>,
}

/// In-memory `SQLite` with the booking schema applied. One pooled connection
/// keeps every session on the same database.
pub async fn setup() -> Harness {
    let opts = ConnectOpts {
        max_conns: Some(1),
        min_conns: Some(1),
        ..ConnectOpts::default()
    };
    let handle = DbHandle::connect("sqlite::memory:", &opts)
        .await
        .expect("connect sqlite");
    BookingModule::migrate(&handle.sea())
        .await
        .expect("apply migrations");

    let registry = Arc::new(StatusRegistry::with_defaults());
    BookingModule::register_errors(&registry);
    let module = BookingModule::new(handle.clone());
    Harness {
        handle,
        module,
        registry,
    }
}

pub fn new_booking(code: &str) -> NewBooking {
    NewBooking {
        code: code.to_owned(),
        user_id: Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").expect("uuid"),
        total_amount: 250.0,
        details: vec![
            NewBookingDetail {
                product_id: Uuid::new_v4(),
                product_name: Some("Deluxe room".to_owned()),
                qty: 3,
                price_per_unit: 50.0,
                sub_total: 150.0,
            },
            NewBookingDetail {
                product_id: Uuid::new_v4(),
                product_name: None,
                qty: 1,
                price_per_unit: 100.0,
                sub_total: 100.0,
            },
        ],
    }
}

pub fn opened(code: &str) -> Booking {
    Booking::open(new_booking(code), 1_700_000_000_000)
}
