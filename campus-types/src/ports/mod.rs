//! Port traits implemented by adapters.

pub mod gateway;
pub mod repository;

pub use gateway::PaymentGateway;
pub use repository::RegistrationRepository;
