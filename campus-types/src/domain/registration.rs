//! Registration domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{EventId, RegistrationId, StudentId, SubeventId};
use super::money::Money;
use crate::error::DomainError;

/// Payment state of a registration row.
///
/// Only `Paid` rows are ever written by the reconciliation flow; the other
/// states exist for schema parity with the surrounding college system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (student, event, sub-event) triple identifying a registration slot.
///
/// Invariant: at most one `paid` registration exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct RegistrationKey {
    pub student_id: StudentId,
    pub event_id: EventId,
    pub subevent_id: SubeventId,
}

impl std::fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "student {} / event {} / sub-event {}",
            self.student_id, self.event_id, self.subevent_id
        )
    }
}

/// A validated description of what a student is registering for, prior to
/// payment. Built from the request body at the service boundary; no gateway
/// or storage call happens before validation passes.
#[derive(Debug, Clone)]
pub struct RegistrationIntent {
    pub key: RegistrationKey,
    pub student_name: String,
    pub student_email: String,
    pub fee: Money,
}

impl RegistrationIntent {
    /// Creates an intent, rejecting missing identity fields.
    /// The fee is already positive by `Money` construction.
    pub fn new(
        key: RegistrationKey,
        student_name: String,
        student_email: String,
        fee: Money,
    ) -> Result<Self, DomainError> {
        if student_name.trim().is_empty() {
            return Err(DomainError::MissingField("student_name"));
        }
        if student_email.trim().is_empty() {
            return Err(DomainError::MissingField("student_email"));
        }
        Ok(Self {
            key,
            student_name,
            student_email,
            fee,
        })
    }

    /// Receipt string handed to the gateway when creating an order.
    pub fn receipt(&self) -> String {
        format!(
            "reg_{}_{}_{}",
            self.key.student_id, self.key.event_id, self.key.subevent_id
        )
    }
}

/// A committed registration record.
///
/// Created only at the moment a gateway confirmation is verified; mutated by
/// attendance-marking and rank-assignment; hard-deleted only by the
/// administrative event-deletion cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub student_id: StudentId,
    pub event_id: EventId,
    pub subevent_id: SubeventId,
    pub student_name: String,
    pub student_email: String,
    pub fee: Money,
    pub payment_status: PaymentStatus,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub attendance: bool,
    pub rank: Option<i32>,
    pub registration_date: DateTime<Utc>,
}

impl Registration {
    /// Creates a paid registration from a verified confirmation.
    pub fn paid(intent: RegistrationIntent, order_id: String, payment_id: String) -> Self {
        Self {
            id: RegistrationId::new(),
            student_id: intent.key.student_id,
            event_id: intent.key.event_id,
            subevent_id: intent.key.subevent_id,
            student_name: intent.student_name,
            student_email: intent.student_email,
            fee: intent.fee,
            payment_status: PaymentStatus::Paid,
            gateway_order_id: order_id,
            gateway_payment_id: payment_id,
            attendance: false,
            rank: None,
            registration_date: Utc::now(),
        }
    }

    /// The uniqueness key for this registration.
    pub fn key(&self) -> RegistrationKey {
        RegistrationKey {
            student_id: self.student_id,
            event_id: self.event_id,
            subevent_id: self.subevent_id,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Reconstructs a registration from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: RegistrationId,
        key: RegistrationKey,
        student_name: String,
        student_email: String,
        fee: Money,
        payment_status: PaymentStatus,
        gateway_order_id: String,
        gateway_payment_id: String,
        attendance: bool,
        rank: Option<i32>,
        registration_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id: key.student_id,
            event_id: key.event_id,
            subevent_id: key.subevent_id,
            student_name,
            student_email,
            fee,
            payment_status,
            gateway_order_id,
            gateway_payment_id,
            attendance,
            rank,
            registration_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;

    fn key() -> RegistrationKey {
        RegistrationKey {
            student_id: StudentId::new(42),
            event_id: EventId::new(7),
            subevent_id: SubeventId::new(3),
        }
    }

    #[test]
    fn test_intent_rejects_blank_name() {
        let fee = Money::new(50000, Currency::INR).unwrap();
        let result = RegistrationIntent::new(key(), "  ".into(), "a@college.edu".into(), fee);
        assert!(matches!(result, Err(DomainError::MissingField("student_name"))));
    }

    #[test]
    fn test_intent_rejects_blank_email() {
        let fee = Money::new(50000, Currency::INR).unwrap();
        let result = RegistrationIntent::new(key(), "Asha".into(), "".into(), fee);
        assert!(matches!(result, Err(DomainError::MissingField("student_email"))));
    }

    #[test]
    fn test_paid_registration_from_intent() {
        let fee = Money::new(50000, Currency::INR).unwrap();
        let intent =
            RegistrationIntent::new(key(), "Asha".into(), "a@college.edu".into(), fee).unwrap();

        let reg = Registration::paid(intent, "order_abc".into(), "pay_xyz".into());

        assert_eq!(reg.payment_status, PaymentStatus::Paid);
        assert_eq!(reg.key(), key());
        assert_eq!(reg.gateway_order_id, "order_abc");
        assert_eq!(reg.gateway_payment_id, "pay_xyz");
        assert!(!reg.attendance);
        assert!(reg.rank.is_none());
    }

    #[test]
    fn test_receipt_encodes_triple() {
        let fee = Money::new(50000, Currency::INR).unwrap();
        let intent =
            RegistrationIntent::new(key(), "Asha".into(), "a@college.edu".into(), fee).unwrap();
        assert_eq!(intent.receipt(), "reg_42_7_3");
    }
}
