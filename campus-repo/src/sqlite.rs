//! SQLite repository adapter.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use uuid::Uuid;

use campus_types::{
    ApiKey, ApiKeyId, CheckoutAudit, DomainError, EventId, Registration, RegistrationId,
    RegistrationKey, RegistrationRepository, RepoError, StudentId, SubeventId,
};

use crate::types::{DbApiKey, DbCheckoutAudit, DbRegistration};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent()
                    && !parent.as_os_str().is_empty()
                {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::query(include_str!("../migrations/0001_create_registrations.sql"))
            .execute(&pool)
            .await?;
        sqlx::query(include_str!("../migrations/0002_create_checkout_audit.sql"))
            .execute(&pool)
            .await?;
        sqlx::query(include_str!("../migrations/0003_create_api_keys.sql"))
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Maps a failed paid-row INSERT to a repo error. The partial unique
    /// index reports a paid-triple race as a UNIQUE violation; a loser that
    /// instead errored out on the winner's write lock is re-checked against
    /// committed state so it still surfaces as `DuplicatePaid`.
    async fn classify_insert_error(&self, e: sqlx::Error, key: RegistrationKey) -> RepoError {
        let msg = e.to_string();
        if msg.contains("UNIQUE constraint failed") {
            return RepoError::DuplicatePaid(key);
        }
        if (msg.contains("database is locked") || msg.contains("database is deadlocked"))
            && let Ok(Some(_)) = self.find_paid(&key).await
        {
            return RepoError::DuplicatePaid(key);
        }
        RepoError::Database(msg)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RegistrationRepository for SqliteRepo {
    async fn find_paid(&self, key: &RegistrationKey) -> Result<Option<Registration>, RepoError> {
        let row: Option<DbRegistration> = sqlx::query_as(
            r#"SELECT id, student_id, event_id, subevent_id, student_name, student_email,
                      fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                      attendance, rank, registration_date
               FROM registrations
               WHERE student_id = ? AND event_id = ? AND subevent_id = ?
                 AND payment_status = 'paid'"#,
        )
        .bind(key.student_id.value())
        .bind(key.event_id.value())
        .bind(key.subevent_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbRegistration::into_domain).transpose()
    }

    async fn insert_paid(&self, registration: Registration) -> Result<Registration, RepoError> {
        let key = registration.key();

        // Pre-check for an already-committed duplicate; races that slip
        // past are settled by the partial unique index below.
        if self.find_paid(&key).await?.is_some() {
            return Err(RepoError::DuplicatePaid(key));
        }

        let registration_date = registration.registration_date.to_rfc3339();

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // The INSERT is the first statement in the transaction, so it opens
        // with the write lock held; a racing confirmation for the same
        // triple queues behind it and trips the unique index instead of
        // deadlocking on a read-to-write upgrade.
        let inserted = sqlx::query(
            r#"INSERT INTO registrations
                   (id, student_id, event_id, subevent_id, student_name, student_email,
                    fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                    attendance, rank, registration_date)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'paid', ?, ?, 0, NULL, ?)"#,
        )
        .bind(registration.id.to_string())
        .bind(key.student_id.value())
        .bind(key.event_id.value())
        .bind(key.subevent_id.value())
        .bind(&registration.student_name)
        .bind(&registration.student_email)
        .bind(registration.fee.amount())
        .bind(registration.fee.currency().to_string())
        .bind(&registration.gateway_order_id)
        .bind(&registration.gateway_payment_id)
        .bind(&registration_date)
        .execute(&mut *db_tx)
        .await;
        if let Err(e) = inserted {
            drop(db_tx);
            return Err(self.classify_insert_error(e, key).await);
        }

        // CONFIRMED audit entry commits atomically with the row.
        sqlx::query(
            r#"INSERT INTO checkout_audit (id, order_id, stage, detail, created_at)
               VALUES (?, ?, 'CONFIRMED', ?, ?)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&registration.gateway_order_id)
        .bind(&registration.gateway_payment_id)
        .bind(&registration_date)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(registration)
    }

    async fn record_checkout(&self, audit: CheckoutAudit) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO checkout_audit (id, order_id, stage, detail, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(audit.id.to_string())
        .bind(&audit.order_id)
        .bind(audit.stage.as_str())
        .bind(&audit.detail)
        .bind(audit.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_checkout_audit(&self, order_id: &str) -> Result<Vec<CheckoutAudit>, RepoError> {
        let rows: Vec<DbCheckoutAudit> = sqlx::query_as(
            r#"SELECT id, order_id, stage, detail, created_at
               FROM checkout_audit
               WHERE order_id = ?
               ORDER BY created_at ASC"#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbCheckoutAudit::into_domain).collect()
    }

    async fn get_registration(
        &self,
        id: RegistrationId,
    ) -> Result<Option<Registration>, RepoError> {
        let row: Option<DbRegistration> = sqlx::query_as(
            r#"SELECT id, student_id, event_id, subevent_id, student_name, student_email,
                      fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                      attendance, rank, registration_date
               FROM registrations WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbRegistration::into_domain).transpose()
    }

    async fn list_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Registration>, RepoError> {
        let rows: Vec<DbRegistration> = sqlx::query_as(
            r#"SELECT id, student_id, event_id, subevent_id, student_name, student_email,
                      fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                      attendance, rank, registration_date
               FROM registrations
               WHERE student_id = ?
               ORDER BY registration_date DESC"#,
        )
        .bind(student_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbRegistration::into_domain).collect()
    }

    async fn list_for_event(
        &self,
        event_id: EventId,
        subevent_id: Option<SubeventId>,
    ) -> Result<Vec<Registration>, RepoError> {
        let rows: Vec<DbRegistration> = match subevent_id {
            Some(subevent_id) => {
                sqlx::query_as(
                    r#"SELECT id, student_id, event_id, subevent_id, student_name, student_email,
                              fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                              attendance, rank, registration_date
                       FROM registrations
                       WHERE event_id = ? AND subevent_id = ?
                       ORDER BY registration_date DESC"#,
                )
                .bind(event_id.value())
                .bind(subevent_id.value())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r#"SELECT id, student_id, event_id, subevent_id, student_name, student_email,
                              fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                              attendance, rank, registration_date
                       FROM registrations
                       WHERE event_id = ?
                       ORDER BY registration_date DESC"#,
                )
                .bind(event_id.value())
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbRegistration::into_domain).collect()
    }

    async fn count_paid(
        &self,
        event_id: EventId,
        subevent_id: Option<SubeventId>,
    ) -> Result<i64, RepoError> {
        let row: (i64,) = match subevent_id {
            Some(subevent_id) => {
                sqlx::query_as(
                    r#"SELECT COUNT(*) FROM registrations
                       WHERE event_id = ? AND subevent_id = ? AND payment_status = 'paid'"#,
                )
                .bind(event_id.value())
                .bind(subevent_id.value())
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r#"SELECT COUNT(*) FROM registrations
                       WHERE event_id = ? AND payment_status = 'paid'"#,
                )
                .bind(event_id.value())
                .fetch_one(&self.pool)
                .await
            }
        }
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }

    async fn set_attendance(
        &self,
        id: RegistrationId,
        present: bool,
    ) -> Result<Registration, RepoError> {
        let registration = self
            .get_registration(id)
            .await?
            .ok_or(RepoError::NotFound)?;

        if !registration.is_paid() {
            return Err(RepoError::Domain(DomainError::UnpaidRegistration(id)));
        }

        sqlx::query(r#"UPDATE registrations SET attendance = ? WHERE id = ?"#)
            .bind(present as i64)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(Registration {
            attendance: present,
            ..registration
        })
    }

    async fn set_bulk_attendance(
        &self,
        event_id: EventId,
        subevent_id: SubeventId,
        present: bool,
    ) -> Result<Vec<Registration>, RepoError> {
        sqlx::query(
            r#"UPDATE registrations SET attendance = ?
               WHERE event_id = ? AND subevent_id = ? AND payment_status = 'paid'"#,
        )
        .bind(present as i64)
        .bind(event_id.value())
        .bind(subevent_id.value())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let rows: Vec<DbRegistration> = sqlx::query_as(
            r#"SELECT id, student_id, event_id, subevent_id, student_name, student_email,
                      fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                      attendance, rank, registration_date
               FROM registrations
               WHERE event_id = ? AND subevent_id = ? AND payment_status = 'paid'
               ORDER BY registration_date DESC"#,
        )
        .bind(event_id.value())
        .bind(subevent_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbRegistration::into_domain).collect()
    }

    async fn set_rank(&self, id: RegistrationId, rank: i32) -> Result<Registration, RepoError> {
        let registration = self
            .get_registration(id)
            .await?
            .ok_or(RepoError::NotFound)?;

        if !registration.is_paid() {
            return Err(RepoError::Domain(DomainError::UnpaidRegistration(id)));
        }

        sqlx::query(r#"UPDATE registrations SET rank = ? WHERE id = ?"#)
            .bind(rank)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(Registration {
            rank: Some(rank),
            ..registration
        })
    }

    async fn leaderboard(
        &self,
        event_id: EventId,
        subevent_id: SubeventId,
    ) -> Result<Vec<Registration>, RepoError> {
        let rows: Vec<DbRegistration> = sqlx::query_as(
            r#"SELECT id, student_id, event_id, subevent_id, student_name, student_email,
                      fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                      attendance, rank, registration_date
               FROM registrations
               WHERE event_id = ? AND subevent_id = ?
                 AND payment_status = 'paid' AND rank IS NOT NULL
               ORDER BY rank ASC"#,
        )
        .bind(event_id.value())
        .bind(subevent_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbRegistration::into_domain).collect()
    }

    async fn delete_for_event(&self, event_id: EventId) -> Result<u64, RepoError> {
        let result = sqlx::query(r#"DELETE FROM registrations WHERE event_id = ?"#)
            .bind(event_id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API keys
    // ─────────────────────────────────────────────────────────────────────────

    async fn verify_api_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError> {
        let row: Option<DbApiKey> = sqlx::query_as(
            r#"SELECT id, name, key_hash, is_active, created_at, last_used_at
               FROM api_keys
               WHERE key_hash = ? AND is_active = 1"#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbApiKey::into_domain).transpose()
    }

    async fn create_api_key(&self, name: &str) -> Result<(ApiKey, String), RepoError> {
        use rand::Rng;
        use rand::distr::Alphanumeric;

        let raw_key: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let prefixed_key = format!("ck_{}", raw_key);

        let key_hash = crate::security::hash_api_key(&prefixed_key);
        let api_key = ApiKey::new(name.to_string(), key_hash);

        sqlx::query(
            r#"INSERT INTO api_keys (id, name, key_hash, is_active, created_at)
               VALUES (?, ?, ?, 1, ?)"#,
        )
        .bind(api_key.id.to_string())
        .bind(&api_key.name)
        .bind(&api_key.key_hash)
        .bind(api_key.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok((api_key, prefixed_key))
    }

    async fn count_api_keys(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_keys WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, RepoError> {
        let rows: Vec<DbApiKey> = sqlx::query_as(
            r#"SELECT id, name, key_hash, is_active, created_at, last_used_at
               FROM api_keys
               WHERE is_active = 1
               ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbApiKey::into_domain).collect()
    }

    async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"UPDATE api_keys SET is_active = 0 WHERE id = ?"#)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
