//! Registration store port.
//!
//! This is the primary port in the hexagonal architecture. Adapters
//! (Postgres, SQLite, in-memory test doubles) implement this trait.

use crate::domain::{
    ApiKey, ApiKeyId, CheckoutAudit, EventId, Registration, RegistrationId, RegistrationKey,
    StudentId, SubeventId,
};
use crate::error::RepoError;

/// The registration store.
///
/// The one writer contract that matters: `insert_paid` is
/// "insert-if-not-exists-paid" per (student, event, sub-event) triple and
/// MUST be atomic. Implementations enforce it with a database transaction
/// plus a partial unique index; concurrent duplicates for the same triple
/// serialize there, not on application-level locks.
#[async_trait::async_trait]
pub trait RegistrationRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Reconciliation (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────

    /// Finds the paid registration for a triple, if any.
    async fn find_paid(&self, key: &RegistrationKey) -> Result<Option<Registration>, RepoError>;

    /// Commits a paid registration in one transaction: re-checks the
    /// paid-uniqueness invariant, inserts the row, records the CONFIRMED
    /// audit entry. Fails with [`RepoError::DuplicatePaid`] when a
    /// conflicting paid row already exists; nothing is persisted in that
    /// case.
    async fn insert_paid(&self, registration: Registration) -> Result<Registration, RepoError>;

    /// Appends a checkout audit entry (ORDER_CREATED / ABANDONED / REJECTED).
    async fn record_checkout(&self, audit: CheckoutAudit) -> Result<(), RepoError>;

    /// Lists the audit trail for one gateway order.
    async fn list_checkout_audit(&self, order_id: &str) -> Result<Vec<CheckoutAudit>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Registration queries and admin mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Gets a registration by id.
    async fn get_registration(
        &self,
        id: RegistrationId,
    ) -> Result<Option<Registration>, RepoError>;

    /// Lists a student's registrations, newest first.
    async fn list_for_student(&self, student_id: StudentId)
    -> Result<Vec<Registration>, RepoError>;

    /// Lists registrations for an event, optionally narrowed to a sub-event.
    async fn list_for_event(
        &self,
        event_id: EventId,
        subevent_id: Option<SubeventId>,
    ) -> Result<Vec<Registration>, RepoError>;

    /// Counts paid registrations for an event or sub-event.
    async fn count_paid(
        &self,
        event_id: EventId,
        subevent_id: Option<SubeventId>,
    ) -> Result<i64, RepoError>;

    /// Marks attendance. Fails for unpaid registrations.
    async fn set_attendance(
        &self,
        id: RegistrationId,
        present: bool,
    ) -> Result<Registration, RepoError>;

    /// Marks attendance on every paid registration of a sub-event and
    /// returns the updated set.
    async fn set_bulk_attendance(
        &self,
        event_id: EventId,
        subevent_id: SubeventId,
        present: bool,
    ) -> Result<Vec<Registration>, RepoError>;

    /// Assigns a rank. Fails for unpaid registrations.
    async fn set_rank(&self, id: RegistrationId, rank: i32) -> Result<Registration, RepoError>;

    /// Paid, ranked registrations for a sub-event ordered by rank.
    async fn leaderboard(
        &self,
        event_id: EventId,
        subevent_id: SubeventId,
    ) -> Result<Vec<Registration>, RepoError>;

    /// Administrative event-deletion cascade. Returns rows removed.
    async fn delete_for_event(&self, event_id: EventId) -> Result<u64, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // API keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Looks up an active API key by its SHA-256 hash.
    async fn verify_api_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError>;

    /// Creates an API key, returning the stored record and the raw key
    /// (shown once).
    async fn create_api_key(&self, name: &str) -> Result<(ApiKey, String), RepoError>;

    /// Counts all API keys (bootstrap guard).
    async fn count_api_keys(&self) -> Result<i64, RepoError>;

    /// Lists API keys.
    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, RepoError>;

    /// Deactivates an API key. Returns false when it did not exist.
    async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool, RepoError>;
}
