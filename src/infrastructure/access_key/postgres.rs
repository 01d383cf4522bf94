//! PostgreSQL key repository implementation
//!
//! Creation relies on `INSERT ... ON CONFLICT DO NOTHING` against the primary
//! key. Bind-or-match runs in a transaction holding a `FOR UPDATE` row lock, so
//! concurrent first validations of one key serialize on that row. A dropped
//! request rolls the transaction back; a bind is either committed or absent.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};

use crate::domain::DomainError;
use crate::domain::access_key::{
    BindVerdict, Identity, IdentityPolicy, InsertOutcome, KeyRecord, KeyRepository, bind_or_match,
};

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            connect_timeout_secs: 30,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// PostgreSQL implementation of KeyRepository
#[derive(Debug, Clone)]
pub struct PostgresKeyRepository {
    pool: PgPool,
}

impl PostgresKeyRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the key table exists
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(StdDuration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        let repository = Self::new(pool);
        repository.ensure_table().await?;

        Ok(repository)
    }

    /// Ensures the key table exists
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS access_keys (
                key TEXT PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                bound_identity JSONB
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl KeyRepository for PostgresKeyRepository {
    async fn insert(&self, record: KeyRecord) -> Result<InsertOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO access_keys (key, created_at, expires_at, bound_identity)
            VALUES ($1, $2, $3, NULL)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(record.key())
        .bind(record.created_at())
        .bind(record.expires_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to insert key: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Collision)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn try_bind_or_match(
        &self,
        key: &str,
        identity: &Identity,
        policy: &IdentityPolicy,
        now: DateTime<Utc>,
    ) -> Result<BindVerdict, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        let row = sqlx::query(
            r#"
            SELECT key, created_at, expires_at, bound_identity
            FROM access_keys
            WHERE key = $1
            FOR UPDATE
            "#,
        )
        .bind(key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to lock key: {}", e)))?;

        let mut record = row.as_ref().map(row_to_record).transpose()?;
        let verdict = bind_or_match(record.as_mut(), identity, policy, now);

        if let BindVerdict::Bound { first: true, .. } = verdict {
            let bound = serde_json::to_value(identity)
                .map_err(|e| DomainError::internal(format!("Failed to encode identity: {}", e)))?;

            sqlx::query(
                r#"
                UPDATE access_keys
                SET bound_identity = $2
                WHERE key = $1 AND bound_identity IS NULL
                "#,
            )
            .bind(key)
            .bind(bound)
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to bind key: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit bind: {}", e)))?;

        Ok(verdict)
    }

    async fn get(&self, key: &str) -> Result<Option<KeyRecord>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT key, created_at, expires_at, bound_identity
            FROM access_keys
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get key: {}", e)))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM access_keys WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to purge keys: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM access_keys")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count keys: {}", e)))?;

        let total: i64 = row.get("total");
        Ok(total.max(0) as usize)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("PostgreSQL is unreachable: {}", e)))?;

        Ok(())
    }
}

fn row_to_record(row: &PgRow) -> Result<KeyRecord, DomainError> {
    let key: String = row.get("key");
    let created_at: DateTime<Utc> = row.get("created_at");
    let expires_at: DateTime<Utc> = row.get("expires_at");
    let bound_identity: Option<serde_json::Value> = row.get("bound_identity");

    let bound_identity = bound_identity
        .map(serde_json::from_value::<Identity>)
        .transpose()
        .map_err(|e| DomainError::storage(format!("Invalid identity in database: {}", e)))?;

    Ok(KeyRecord::from_parts(
        key,
        created_at,
        expires_at,
        bound_identity,
    ))
}
