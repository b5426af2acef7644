//! # Campus Types
//!
//! Domain types and port traits for the campus event-registration service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Registration, checkout lifecycle)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    ApiKey, ApiKeyId, CheckoutAudit, CheckoutStage, Currency, EventId, Money, PaymentConfirmation,
    PaymentOrder, PaymentStatus, Registration, RegistrationId, RegistrationIntent, RegistrationKey,
    StudentId, SubeventId,
};
pub use dto::*;
pub use error::{AppError, DomainError, GatewayError, RepoError};
pub use ports::{PaymentGateway, RegistrationRepository};
