//! Payment gateway port.
//!
//! This trait defines the contract of the third-party payment service.
//! Implementations can be HTTP clients or in-process mocks.

use crate::domain::{Money, PaymentConfirmation, PaymentOrder};
use crate::error::GatewayError;

/// Port trait for the payment gateway.
///
/// The gateway creates orders for an amount in minor currency units and
/// later signs confirmations with a secret shared with this service. Order
/// existence is tracked only by the gateway; nothing is persisted here until
/// a confirmation verifies.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Creates a payment order at the gateway.
    async fn create_order(&self, amount: Money, receipt: &str)
    -> Result<PaymentOrder, GatewayError>;

    /// Publishable key the client-side checkout widget is opened with.
    fn checkout_key(&self) -> &str;

    /// Recomputes the expected signature for a confirmation and compares it
    /// in constant time.
    fn verify_confirmation(&self, confirmation: &PaymentConfirmation) -> bool;
}
