//! Error types for the registration service.

use crate::domain::{RegistrationId, RegistrationKey};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Registration fee must be positive")]
    NonPositiveFee,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Rank must be at least 1")]
    InvalidRank,

    #[error("Registration {0} is not paid")]
    UnpaidRegistration(RegistrationId),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("A paid registration already exists for student {} in event {} / sub-event {}",
        .0.student_id, .0.event_id, .0.subevent_id)]
    DuplicatePaid(RegistrationKey),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,
}

/// Payment gateway errors (order creation at the external service).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway could not be reached or timed out. Safe to retry;
    /// no server-side state was persisted.
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway accepted the request but refused to create the order.
    #[error("Payment gateway rejected the order: {0}")]
    Rejected(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Already registered: student {} in event {} / sub-event {}",
        .0.student_id, .0.event_id, .0.subevent_id)]
    AlreadyRegistered(RegistrationKey),

    #[error("Payment confirmation signature is invalid")]
    InvalidSignature,

    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Cannot mark attendance or rank for unpaid registration {0}")]
    UnpaidRegistration(RegistrationId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(DomainError::UnpaidRegistration(id)) => {
                AppError::UnpaidRegistration(id)
            }
            RepoError::Domain(e) => AppError::Validation(e.to_string()),
            RepoError::DuplicatePaid(key) => AppError::AlreadyRegistered(key),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(reason) => AppError::GatewayUnavailable(reason),
            GatewayError::Rejected(reason) => AppError::Validation(reason),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::Validation(err.to_string())
    }
}
