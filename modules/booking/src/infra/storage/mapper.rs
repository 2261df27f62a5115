use corekit_errors::{AppResult, catalog};
use sea_orm::ActiveValue::Set;

use super::entity::{booking, booking_detail};
use crate::domain::model::{Booking, BookingDetail, BookingStatus};

pub fn to_domain(header: booking::Model, details: Vec<booking_detail::Model>) -> AppResult<Booking> {
    let status = BookingStatus::parse(&header.status).ok_or_else(|| {
        catalog::INTERNAL_ERROR
            .error_with("stored booking has an unknown status")
            .with_detail("status", header.status.clone())
    })?;
    Ok(Booking {
        id: header.id,
        code: header.booking_code,
        user_id: header.user_id,
        total_amount: header.total_amount,
        status,
        payment_status: header.payment_status,
        created_at: header.created_at,
        updated_at: header.updated_at,
        details: details.into_iter().map(detail_to_domain).collect(),
    })
}

fn detail_to_domain(m: booking_detail::Model) -> BookingDetail {
    BookingDetail {
        id: m.id,
        booking_id: m.booking_id,
        product_id: m.product_id,
        product_name: m.product_name,
        qty: m.qty,
        price_per_unit: m.price_per_unit,
        sub_total: m.sub_total,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

pub fn header_active(b: &Booking) -> booking::ActiveModel {
    booking::ActiveModel {
        id: Set(b.id),
        booking_code: Set(b.code.clone()),
        user_id: Set(b.user_id),
        total_amount: Set(b.total_amount),
        status: Set(b.status.as_str().to_owned()),
        payment_status: Set(b.payment_status.clone()),
        created_at: Set(b.created_at),
        updated_at: Set(b.updated_at),
    }
}

pub fn detail_active(d: &BookingDetail, line_no: i32) -> booking_detail::ActiveModel {
    booking_detail::ActiveModel {
        id: Set(d.id),
        booking_id: Set(d.booking_id),
        line_no: Set(line_no),
        product_id: Set(d.product_id),
        product_name: Set(d.product_name.clone()),
        qty: Set(d.qty),
        price_per_unit: Set(d.price_per_unit),
        sub_total: Set(d.sub_total),
        created_at: Set(d.created_at),
        updated_at: Set(d.updated_at),
    }
}
