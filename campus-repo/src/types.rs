//! Shared database types with feature-gated fields for SQLite and PostgreSQL.
//!
//! SQLite stores UUIDs and timestamps as TEXT and booleans as INTEGER;
//! Postgres uses native types. The `Db*` structs absorb that difference so
//! both adapters share the same domain conversion code path.

use sqlx::FromRow;

use campus_types::{
    ApiKey, ApiKeyId, CheckoutAudit, CheckoutStage, Currency, EventId, Money, PaymentStatus,
    Registration, RegistrationId, RegistrationKey, RepoError, StudentId, SubeventId,
};

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};
#[cfg(not(feature = "sqlite"))]
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs
// ─────────────────────────────────────────────────────────────────────────────

/// Registration row from database.
#[derive(FromRow)]
pub struct DbRegistration {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub student_id: i64,
    pub event_id: i64,
    pub subevent_id: i64,
    pub student_name: String,
    pub student_email: String,
    pub fee: i64,
    pub currency: String,
    pub payment_status: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,

    #[cfg(not(feature = "sqlite"))]
    pub attendance: bool,
    #[cfg(feature = "sqlite")]
    pub attendance: i64,

    pub rank: Option<i32>,

    #[cfg(not(feature = "sqlite"))]
    pub registration_date: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub registration_date: String,
}

/// Checkout audit row from database.
#[derive(FromRow)]
pub struct DbCheckoutAudit {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub order_id: String,
    pub stage: String,
    pub detail: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

/// API key row from database.
#[derive(FromRow)]
pub struct DbApiKey {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub name: String,
    pub key_hash: String,

    #[cfg(not(feature = "sqlite"))]
    pub is_active: bool,
    #[cfg(feature = "sqlite")]
    pub is_active: i64,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub last_used_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub last_used_at: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    match s {
        "INR" => Ok(Currency::INR),
        "USD" => Ok(Currency::USD),
        _ => Err(RepoError::Database(format!("Unknown currency: {}", s))),
    }
}

pub fn parse_payment_status(s: &str) -> Result<PaymentStatus, RepoError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "paid" => Ok(PaymentStatus::Paid),
        "failed" => Ok(PaymentStatus::Failed),
        _ => Err(RepoError::Database(format!(
            "Unknown payment status: {}",
            s
        ))),
    }
}

pub fn parse_stage(s: &str) -> Result<CheckoutStage, RepoError> {
    match s {
        "ORDER_CREATED" => Ok(CheckoutStage::OrderCreated),
        "CONFIRMED" => Ok(CheckoutStage::Confirmed),
        "ABANDONED" => Ok(CheckoutStage::Abandoned),
        "REJECTED" => Ok(CheckoutStage::Rejected),
        _ => Err(RepoError::Database(format!(
            "Unknown checkout stage: {}",
            s
        ))),
    }
}

#[cfg(feature = "sqlite")]
fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbRegistration {
    /// Convert database row to domain Registration.
    pub fn into_domain(self) -> Result<Registration, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let fee = Money::new(self.fee, currency).map_err(RepoError::Domain)?;
        let payment_status = parse_payment_status(&self.payment_status)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, attendance, registration_date) = (
            RegistrationId::from_uuid(self.id),
            self.attendance,
            self.registration_date,
        );

        #[cfg(feature = "sqlite")]
        let (id, attendance, registration_date) = (
            RegistrationId::from_uuid(parse_uuid(&self.id)?),
            self.attendance != 0,
            parse_timestamp(&self.registration_date)?,
        );

        Ok(Registration::from_parts(
            id,
            RegistrationKey {
                student_id: StudentId::new(self.student_id),
                event_id: EventId::new(self.event_id),
                subevent_id: SubeventId::new(self.subevent_id),
            },
            self.student_name,
            self.student_email,
            fee,
            payment_status,
            self.gateway_order_id,
            self.gateway_payment_id,
            attendance,
            self.rank,
            registration_date,
        ))
    }
}

impl DbCheckoutAudit {
    /// Convert database row to domain CheckoutAudit.
    pub fn into_domain(self) -> Result<CheckoutAudit, RepoError> {
        let stage = parse_stage(&self.stage)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, created_at) = (self.id, self.created_at);

        #[cfg(feature = "sqlite")]
        let (id, created_at) = (parse_uuid(&self.id)?, parse_timestamp(&self.created_at)?);

        Ok(CheckoutAudit {
            id,
            order_id: self.order_id,
            stage,
            detail: self.detail,
            created_at,
        })
    }
}

impl DbApiKey {
    /// Convert database row to domain ApiKey.
    pub fn into_domain(self) -> Result<ApiKey, RepoError> {
        #[cfg(not(feature = "sqlite"))]
        let (id, is_active, created_at, last_used_at) = (
            ApiKeyId::from_uuid(self.id),
            self.is_active,
            self.created_at,
            self.last_used_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, is_active, created_at, last_used_at) = (
            ApiKeyId::from_uuid(parse_uuid(&self.id)?),
            self.is_active != 0,
            parse_timestamp(&self.created_at)?,
            self.last_used_at.as_deref().map(parse_timestamp).transpose()?,
        );

        Ok(ApiKey {
            id,
            name: self.name,
            key_hash: self.key_hash,
            is_active,
            created_at,
            last_used_at,
        })
    }
}
