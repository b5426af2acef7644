//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Currency, EventId, PaymentStatus, Registration, RegistrationId, StudentId, SubeventId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Checkout DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Registration intent: what is being purchased, prior to payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[schema(example = 42)]
    pub student_id: StudentId,
    #[schema(example = 7)]
    pub event_id: EventId,
    #[schema(example = 3)]
    pub subevent_id: SubeventId,
    #[schema(example = "Asha Rao")]
    pub student_name: String,
    #[schema(example = "asha@college.edu")]
    pub student_email: String,
    /// Registration fee in smallest currency unit (paise)
    #[schema(example = 50000)]
    pub fee: i64,
    #[serde(default)]
    pub currency: Currency,
}

/// Response after the gateway order is created. The client-side checkout
/// widget is opened with these values.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    #[schema(example = "order_abc")]
    pub order_id: String,
    /// Publishable gateway key for the checkout widget
    #[schema(example = "k1")]
    pub key: String,
    /// Amount in smallest currency unit
    #[schema(example = 50000)]
    pub amount: i64,
    pub currency: Currency,
}

/// Gateway confirmation forwarded by the client, together with the intent it
/// settles.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    pub intent: CreateOrderRequest,
    #[schema(example = "order_abc")]
    pub order_id: String,
    #[schema(example = "pay_xyz")]
    pub payment_id: String,
    /// HMAC-SHA256 signature over `"{order_id}|{payment_id}"`, hex encoded
    pub signature: String,
}

/// Request to record an abandoned checkout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelCheckoutRequest {
    #[schema(example = "order_abc")]
    pub order_id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// A committed registration, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub id: RegistrationId,
    pub student_id: StudentId,
    pub event_id: EventId,
    pub subevent_id: SubeventId,
    pub student_name: String,
    pub student_email: String,
    /// Fee paid in smallest currency unit
    pub fee: i64,
    pub currency: Currency,
    pub payment_status: PaymentStatus,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub attendance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    #[schema(value_type = String, example = "2026-02-14T10:30:00Z")]
    pub registration_date: DateTime<Utc>,
}

impl From<Registration> for RegistrationResponse {
    fn from(reg: Registration) -> Self {
        Self {
            id: reg.id,
            student_id: reg.student_id,
            event_id: reg.event_id,
            subevent_id: reg.subevent_id,
            student_name: reg.student_name,
            student_email: reg.student_email,
            fee: reg.fee.amount(),
            currency: reg.fee.currency(),
            payment_status: reg.payment_status,
            gateway_order_id: reg.gateway_order_id,
            gateway_payment_id: reg.gateway_payment_id,
            attendance: reg.attendance,
            rank: reg.rank,
            registration_date: reg.registration_date,
        }
    }
}

/// Request to mark attendance on a single registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRequest {
    pub present: bool,
}

/// Request to mark attendance for every paid registration of a sub-event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkAttendanceRequest {
    pub event_id: EventId,
    pub subevent_id: SubeventId,
    pub present: bool,
}

/// Request to assign a rank to a registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignRankRequest {
    #[schema(example = 1)]
    pub rank: i32,
}

/// Number of paid participants for an event or sub-event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantCountResponse {
    pub count: i64,
}
