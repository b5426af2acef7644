//! Domain models for the registration service.

pub mod api_key;
pub mod checkout;
pub mod ids;
pub mod money;
pub mod registration;

pub use api_key::{ApiKey, ApiKeyId};
pub use checkout::{CheckoutAudit, CheckoutStage, PaymentConfirmation, PaymentOrder};
pub use ids::{EventId, RegistrationId, StudentId, SubeventId};
pub use money::{Currency, Money};
pub use registration::{PaymentStatus, Registration, RegistrationIntent, RegistrationKey};
