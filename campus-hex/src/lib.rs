//! # Campus Hex
//!
//! Application service layer and HTTP adapter for the event registration
//! service.
//!
//! ## Architecture
//!
//! - `service` - Application service (payment reconciliation + admin ops)
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: RegistrationRepository` and
//! `G: PaymentGateway`, so both the store and the gateway are injected at
//! compile time.

pub mod inbound;
pub mod openapi;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::RegistrationService;
