use corekit_errors::{AppError, FieldViolation, catalog};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::model::{Booking, BookingDetail, NewBooking, NewBookingDetail};

const CODE_MIN_LEN: usize = 3;
const CODE_MAX_LEN: usize = 50;
const PRODUCT_NAME_MAX_LEN: usize = 100;

/// Missing fields deserialize to their defaults so that they are reported as
/// field violations, not as an unreadable body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateBookingRequest {
    pub code: String,
    pub user_id: String,
    pub total_amount: f64,
    pub details: Vec<CreateBookingDetailRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateBookingDetailRequest {
    pub product_id: String,
    pub product_name: Option<String>,
    pub qty: i32,
    pub price_per_unit: f64,
    pub sub_total: f64,
}

impl CreateBookingRequest {
    /// Check field-level constraints and convert into domain input.
    ///
    /// # Errors
    /// `INVALID_REQUEST` listing every violated field.
    pub fn validate(self) -> Result<NewBooking, AppError> {
        let mut violations = Vec::new();

        let code_len = self.code.chars().count();
        if !(CODE_MIN_LEN..=CODE_MAX_LEN).contains(&code_len) {
            violations.push(
                FieldViolation::new(
                    "code",
                    format!("Booking code must be between {CODE_MIN_LEN} and {CODE_MAX_LEN} characters"),
                )
                .with_code("length"),
            );
        }
        let user_id = parse_uuid("user_id", "User ID", &self.user_id, &mut violations);
        if self.total_amount < 0.0 || !self.total_amount.is_finite() {
            violations.push(
                FieldViolation::new("total_amount", "Total amount must be 0 or greater")
                    .with_code("gte"),
            );
        }
        if self.details.is_empty() {
            violations.push(
                FieldViolation::new("details", "Details must contain at least 1 item")
                    .with_code("min"),
            );
        }

        let mut details = Vec::with_capacity(self.details.len());
        for (i, d) in self.details.into_iter().enumerate() {
            if let Some(detail) = d.validate(i, &mut violations) {
                details.push(detail);
            }
        }

        match user_id {
            Some(user_id) if violations.is_empty() => Ok(NewBooking {
                code: self.code,
                user_id,
                total_amount: self.total_amount,
                details,
            }),
            _ => Err(catalog::INVALID_REQUEST
                .error()
                .replace_validation_errors(violations)),
        }
    }
}

impl CreateBookingDetailRequest {
    fn validate(self, index: usize, violations: &mut Vec<FieldViolation>) -> Option<NewBookingDetail> {
        let field = |name: &str| format!("details[{index}].{name}");
        let before = violations.len();

        let product_id = parse_uuid(&field("product_id"), "Product ID", &self.product_id, violations);
        if self
            .product_name
            .as_ref()
            .is_some_and(|n| n.chars().count() > PRODUCT_NAME_MAX_LEN)
        {
            violations.push(
                FieldViolation::new(
                    field("product_name"),
                    format!("Product name must be at most {PRODUCT_NAME_MAX_LEN} characters"),
                )
                .with_code("max"),
            );
        }
        if self.qty <= 0 {
            violations.push(
                FieldViolation::new(field("qty"), "Quantity must be greater than 0").with_code("gt"),
            );
        }
        if self.price_per_unit <= 0.0 || !self.price_per_unit.is_finite() {
            violations.push(
                FieldViolation::new(field("price_per_unit"), "Price per unit must be greater than 0")
                    .with_code("gt"),
            );
        }
        if self.sub_total <= 0.0 || !self.sub_total.is_finite() {
            violations.push(
                FieldViolation::new(field("sub_total"), "Sub total must be greater than 0")
                    .with_code("gt"),
            );
        }

        let product_id = product_id.filter(|_| violations.len() == before)?;
        Some(NewBookingDetail {
            product_id,
            product_name: self.product_name,
            qty: self.qty,
            price_per_unit: self.price_per_unit,
            sub_total: self.sub_total,
        })
    }
}

fn parse_uuid(
    field: &str,
    label: &str,
    raw: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<Uuid> {
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            violations.push(
                FieldViolation::new(field, format!("{label} must be a valid UUID")).with_code("uuid"),
            );
            None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingDto {
    pub id: Uuid,
    pub code: String,
    pub user_id: Uuid,
    pub total_amount: f64,
    pub status: &'static str,
    pub details: Vec<BookingDetailDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingDetailDto {
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub qty: i32,
    pub price_per_unit: f64,
    pub sub_total: f64,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            code: b.code,
            user_id: b.user_id,
            total_amount: b.total_amount,
            status: b.status.as_str(),
            details: b.details.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<BookingDetail> for BookingDetailDto {
    fn from(d: BookingDetail) -> Self {
        Self {
            product_id: d.product_id,
            product_name: d.product_name,
            qty: d.qty,
            price_per_unit: d.price_per_unit,
            sub_total: d.sub_total,
        }
    }
}

/// Success envelope shared by booking endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T, trace_id: &str) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            trace_id: Some(trace_id.to_owned()),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn valid() -> CreateBookingRequest {
        CreateBookingRequest {
            code: "BK-001".to_owned(),
            user_id: "550e8400-e29b-41d4-a716-446655440000".to_owned(),
            total_amount: 150.0,
            details: vec![CreateBookingDetailRequest {
                product_id: "650e8400-e29b-41d4-a716-446655440000".to_owned(),
                product_name: Some("Deluxe room".to_owned()),
                qty: 3,
                price_per_unit: 50.0,
                sub_total: 150.0,
            }],
        }
    }

    #[test]
    fn valid_request_converts_to_domain_input() {
        let input = valid().validate().unwrap();
        assert_eq!(input.code, "BK-001");
        assert_eq!(input.details.len(), 1);
        assert_eq!(input.details[0].qty, 3);
    }

    #[test]
    fn every_violation_is_reported() {
        let mut req = valid();
        req.code = "BK".to_owned();
        req.user_id = "not-a-uuid".to_owned();
        req.details[0].qty = 0;
        req.details[0].product_name = Some("x".repeat(101));

        let err = req.validate().unwrap_err();

        assert_eq!(err.code(), "INVALID_REQUEST");
        let fields: Vec<&str> = err
            .details()
            .violations()
            .iter()
            .map(|v| v.field.as_str())
            .collect();
        assert_eq!(
            fields,
            ["code", "user_id", "details[0].product_name", "details[0].qty"]
        );
    }

    #[test]
    fn empty_details_are_invalid() {
        let mut req = valid();
        req.details.clear();
        let err = req.validate().unwrap_err();
        assert_eq!(err.details().violations()[0].field, "details");
        assert_eq!(err.details().violations()[0].code.as_deref(), Some("min"));
    }

    #[test]
    fn missing_fields_become_violations() {
        let req: CreateBookingRequest = serde_json::from_str("{}").unwrap();
        let err = req.validate().unwrap_err();
        assert_eq!(err.details().violations().len(), 3);
    }

    #[test]
    fn response_envelope_shape() {
        let dto = BookingDto {
            id: Uuid::nil(),
            code: "BK-001".to_owned(),
            user_id: Uuid::nil(),
            total_amount: 1.0,
            status: "PENDING",
            details: vec![],
        };
        let json = serde_json::to_value(ApiResponse::ok("done", dto, "req-1")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["code"], "BK-001");
        assert_eq!(json["trace_id"], "req-1");
    }
}
