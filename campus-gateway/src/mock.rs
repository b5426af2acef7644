//! In-process mock gateway for tests and local development.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use campus_types::{GatewayError, Money, PaymentConfirmation, PaymentGateway, PaymentOrder};

use crate::signature;

/// Deterministic gateway double. Orders get sequential `order_mock_N` ids;
/// confirmations are signed with the configured secret so tests can fabricate
/// both valid and tampered payloads.
pub struct MockGateway {
    key_id: String,
    key_secret: String,
    next_order: AtomicU64,
    /// When set, `create_order` fails with `Unavailable`.
    unavailable: bool,
}

impl MockGateway {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            next_order: AtomicU64::new(1),
            unavailable: false,
        }
    }

    /// A gateway that refuses every order, for failure-path tests.
    pub fn down(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            unavailable: true,
            ..Self::new(key_id, key_secret)
        }
    }

    /// Signs a confirmation the way the real gateway would.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        signature::sign_confirmation(order_id, payment_id, &self.key_secret)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(
        &self,
        amount: Money,
        receipt: &str,
    ) -> Result<PaymentOrder, GatewayError> {
        if self.unavailable {
            return Err(GatewayError::Unavailable("mock gateway is down".into()));
        }

        let n = self.next_order.fetch_add(1, Ordering::Relaxed);
        Ok(PaymentOrder {
            order_id: format!("order_mock_{}", n),
            amount,
            receipt: receipt.to_string(),
        })
    }

    fn checkout_key(&self) -> &str {
        &self.key_id
    }

    fn verify_confirmation(&self, confirmation: &PaymentConfirmation) -> bool {
        signature::verify_confirmation(confirmation, &self.key_secret)
    }
}
