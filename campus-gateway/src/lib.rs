//! # Campus Gateway
//!
//! Payment gateway adapters implementing the `PaymentGateway` port:
//!
//! - [`HttpGateway`] - reqwest client for a Razorpay-style REST gateway
//! - [`MockGateway`] - in-process adapter for tests and local development
//! - [`signature`] - HMAC-SHA256 confirmation signing and verification

pub mod http;
pub mod mock;
pub mod signature;

pub use http::HttpGateway;
pub use mock::MockGateway;
