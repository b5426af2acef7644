//! Checkout lifecycle types.
//!
//! A checkout attempt runs `INITIATED -> ORDER_CREATED -> {CONFIRMED |
//! ABANDONED}`. `CONFIRMED` is terminal and corresponds to exactly one
//! committed registration row; every other stage leaves only an audit entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;

/// A payment order as created at the gateway. Ephemeral: owned by the
/// reconciliation service for the duration of one checkout attempt and
/// superseded once a registration is committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub order_id: String,
    pub amount: Money,
    pub receipt: String,
}

/// The signed payload the gateway returns after a successful charge,
/// forwarded by the client to the confirmation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

impl PaymentConfirmation {
    /// The string the gateway signs: `"{order_id}|{payment_id}"`.
    pub fn signed_payload(&self) -> String {
        format!("{}|{}", self.order_id, self.payment_id)
    }
}

/// Stage of a checkout attempt, as recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutStage {
    OrderCreated,
    Confirmed,
    Abandoned,
    Rejected,
}

impl CheckoutStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStage::OrderCreated => "ORDER_CREATED",
            CheckoutStage::Confirmed => "CONFIRMED",
            CheckoutStage::Abandoned => "ABANDONED",
            CheckoutStage::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of a checkout stage transition. Abandoned and rejected
/// attempts are visible here without ever touching the registrations table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutAudit {
    pub id: Uuid,
    pub order_id: String,
    pub stage: CheckoutStage,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CheckoutAudit {
    pub fn new(order_id: impl Into<String>, stage: CheckoutStage, detail: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order_id.into(),
            stage,
            detail,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_payload_layout() {
        let confirmation = PaymentConfirmation {
            order_id: "order_abc".into(),
            payment_id: "pay_xyz".into(),
            signature: String::new(),
        };
        assert_eq!(confirmation.signed_payload(), "order_abc|pay_xyz");
    }

    #[test]
    fn test_stage_round_trip_strings() {
        assert_eq!(CheckoutStage::OrderCreated.as_str(), "ORDER_CREATED");
        assert_eq!(CheckoutStage::Abandoned.to_string(), "ABANDONED");
    }
}
