//! PostgreSQL repository adapter.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use campus_types::{
    ApiKey, ApiKeyId, CheckoutAudit, DomainError, EventId, Registration, RegistrationId,
    RegistrationKey, RegistrationRepository, RepoError, StudentId, SubeventId,
};

use crate::types::{DbApiKey, DbCheckoutAudit, DbRegistration};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository implementation.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_registrations_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_checkout_audit_pg.sql"),
        "0002",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0003_create_api_keys_pg.sql"),
        "0003",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// The partial unique index reports a paid-triple race as a duplicate key.
fn map_insert_error(e: sqlx::Error, key: RegistrationKey) -> RepoError {
    let msg = e.to_string();
    if msg.contains("duplicate key value") {
        RepoError::DuplicatePaid(key)
    } else {
        RepoError::Database(msg)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RegistrationRepository for PostgresRepo {
    async fn find_paid(&self, key: &RegistrationKey) -> Result<Option<Registration>, RepoError> {
        let row: Option<DbRegistration> = sqlx::query_as(
            r#"SELECT id, student_id, event_id, subevent_id, student_name, student_email,
                      fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                      attendance, rank, registration_date
               FROM registrations
               WHERE student_id = $1 AND event_id = $2 AND subevent_id = $3
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

        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // Re-check inside the transaction; concurrent confirmations for the
        // same triple serialize on the partial unique index at insert time.
        let existing: Option<(Uuid,)> = sqlx::query_as(
            r#"SELECT id FROM registrations
               WHERE student_id = $1 AND event_id = $2 AND subevent_id = $3
                 AND payment_status = 'paid'"#,
        )
        .bind(key.student_id.value())
        .bind(key.event_id.value())
        .bind(key.subevent_id.value())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if existing.is_some() {
            return Err(RepoError::DuplicatePaid(key));
        }

        sqlx::query(
            r#"INSERT INTO registrations
                   (id, student_id, event_id, subevent_id, student_name, student_email,
                    fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                    attendance, rank, registration_date)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'paid', $9, $10, FALSE, NULL, $11)"#,
        )
        .bind(registration.id.as_uuid())
        .bind(key.student_id.value())
        .bind(key.event_id.value())
        .bind(key.subevent_id.value())
        .bind(&registration.student_name)
        .bind(&registration.student_email)
        .bind(registration.fee.amount())
        .bind(registration.fee.currency().to_string())
        .bind(&registration.gateway_order_id)
        .bind(&registration.gateway_payment_id)
        .bind(registration.registration_date)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| map_insert_error(e, key))?;

        sqlx::query(
            r#"INSERT INTO checkout_audit (id, order_id, stage, detail, created_at)
               VALUES ($1, $2, 'CONFIRMED', $3, $4)"#,
        )
        .bind(Uuid::new_v4())
        .bind(&registration.gateway_order_id)
        .bind(&registration.gateway_payment_id)
        .bind(registration.registration_date)
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
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(audit.id)
        .bind(&audit.order_id)
        .bind(audit.stage.as_str())
        .bind(&audit.detail)
        .bind(audit.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_checkout_audit(&self, order_id: &str) -> Result<Vec<CheckoutAudit>, RepoError> {
        let rows: Vec<DbCheckoutAudit> = sqlx::query_as(
            r#"SELECT id, order_id, stage, detail, created_at
               FROM checkout_audit
               WHERE order_id = $1
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
               FROM registrations WHERE id = $1"#,
        )
        .bind(id.as_uuid())
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
               WHERE student_id = $1
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
                       WHERE event_id = $1 AND subevent_id = $2
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
                       WHERE event_id = $1
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
                       WHERE event_id = $1 AND subevent_id = $2 AND payment_status = 'paid'"#,
                )
                .bind(event_id.value())
                .bind(subevent_id.value())
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r#"SELECT COUNT(*) FROM registrations
                       WHERE event_id = $1 AND payment_status = 'paid'"#,
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
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        let row: Option<DbRegistration> = sqlx::query_as(
            r#"SELECT id, student_id, event_id, subevent_id, student_name, student_email,
                      fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                      attendance, rank, registration_date
               FROM registrations WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let registration = row.ok_or(RepoError::NotFound)?.into_domain()?;

        if !registration.is_paid() {
            return Err(RepoError::Domain(DomainError::UnpaidRegistration(id)));
        }

        sqlx::query(r#"UPDATE registrations SET attendance = $1 WHERE id = $2"#)
            .bind(present)
            .bind(id.as_uuid())
            .execute(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

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
            r#"UPDATE registrations SET attendance = $1
               WHERE event_id = $2 AND subevent_id = $3 AND payment_status = 'paid'"#,
        )
        .bind(present)
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
               WHERE event_id = $1 AND subevent_id = $2 AND payment_status = 'paid'
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
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        let row: Option<DbRegistration> = sqlx::query_as(
            r#"SELECT id, student_id, event_id, subevent_id, student_name, student_email,
                      fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                      attendance, rank, registration_date
               FROM registrations WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let registration = row.ok_or(RepoError::NotFound)?.into_domain()?;

        if !registration.is_paid() {
            return Err(RepoError::Domain(DomainError::UnpaidRegistration(id)));
        }

        sqlx::query(r#"UPDATE registrations SET rank = $1 WHERE id = $2"#)
            .bind(rank)
            .bind(id.as_uuid())
            .execute(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

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
               WHERE event_id = $1 AND subevent_id = $2
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
        let result = sqlx::query(r#"DELETE FROM registrations WHERE event_id = $1"#)
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
               WHERE key_hash = $1 AND is_active = TRUE"#,
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
               VALUES ($1, $2, $3, TRUE, $4)"#,
        )
        .bind(api_key.id.as_uuid())
        .bind(&api_key.name)
        .bind(&api_key.key_hash)
        .bind(api_key.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok((api_key, prefixed_key))
    }

    async fn count_api_keys(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_keys WHERE is_active = TRUE")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, RepoError> {
        let rows: Vec<DbApiKey> = sqlx::query_as(
            r#"SELECT id, name, key_hash, is_active, created_at, last_used_at
               FROM api_keys
               WHERE is_active = TRUE
               ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbApiKey::into_domain).collect()
    }

    async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"UPDATE api_keys SET is_active = FALSE WHERE id = $1"#)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
