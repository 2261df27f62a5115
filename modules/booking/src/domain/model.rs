use corekit_errors::AppResult;
use uuid::Uuid;

use crate::errors::{BOOKING_AMOUNT_INCONSISTENT, BOOKING_DETAIL_REQUIRED};

/// Tolerance for comparing money amounts computed in floating point.
pub const AMOUNT_EPSILON: f64 = 0.001;

pub const PAYMENT_UNPAID: &str = "UNPAID";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Unknown values stored by other writers read back as `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "CANCELLED" => Some(Self::Cancelled),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub code: String,
    pub user_id: Uuid,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment_status: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub details: Vec<BookingDetail>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BookingDetail {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub qty: i32,
    pub price_per_unit: f64,
    pub sub_total: f64,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

/// Data accepted from a caller to open a booking.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBooking {
    pub code: String,
    pub user_id: Uuid,
    pub total_amount: f64,
    pub details: Vec<NewBookingDetail>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewBookingDetail {
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub qty: i32,
    pub price_per_unit: f64,
    pub sub_total: f64,
}

impl Booking {
    /// Fresh pending, unpaid booking with generated identifiers.
    #[must_use]
    pub fn open(input: NewBooking, now_ms: i64) -> Self {
        let id = Uuid::new_v4();
        let details = input
            .details
            .into_iter()
            .map(|d| BookingDetail {
                id: Uuid::new_v4(),
                booking_id: id,
                product_id: d.product_id,
                product_name: d.product_name,
                qty: d.qty,
                price_per_unit: d.price_per_unit,
                sub_total: d.sub_total,
                created_at: now_ms,
                updated_at: None,
            })
            .collect();
        Self {
            id,
            code: input.code,
            user_id: input.user_id,
            total_amount: input.total_amount,
            status: BookingStatus::Pending,
            payment_status: PAYMENT_UNPAID.to_owned(),
            created_at: now_ms,
            updated_at: None,
            details,
        }
    }
}

impl BookingDetail {
    #[must_use]
    pub fn expected_sub_total(&self) -> f64 {
        self.price_per_unit * f64::from(self.qty)
    }
}

impl Booking {
    /// Check the booking's internal consistency before it is persisted.
    ///
    /// # Errors
    /// `BOOKING_DETAIL_REQUIRED` without details, `BOOKING_AMOUNT_INCONSISTENT`
    /// when a subtotal or the header total does not add up.
    pub fn validate(&self) -> AppResult<()> {
        if self.details.is_empty() {
            return Err(BOOKING_DETAIL_REQUIRED.error());
        }

        let mut calculated = 0.0;
        for detail in &self.details {
            calculated += detail.sub_total;
            let expected = detail.expected_sub_total();
            if (detail.sub_total - expected).abs() > AMOUNT_EPSILON {
                return Err(BOOKING_AMOUNT_INCONSISTENT
                    .error_with(format!("invalid subtotal for product {}", detail.product_id))
                    .with_detail("product_id", detail.product_id.to_string())
                    .with_detail("expected", format!("{expected:.2}"))
                    .with_detail("actual", format!("{:.2}", detail.sub_total)));
            }
        }

        if (self.total_amount - calculated).abs() > AMOUNT_EPSILON {
            return Err(BOOKING_AMOUNT_INCONSISTENT.error());
        }
        Ok(())
    }
}
