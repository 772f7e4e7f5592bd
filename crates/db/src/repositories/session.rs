use std::time::Duration;

use chrono::Utc;
use sqlx::Row;

use glassdesk_core::domain::session::SessionKey;

use super::{RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn expires_at_epoch(ttl: Duration) -> i64 {
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    Utc::now().timestamp().saturating_add(ttl_secs)
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn load(&self, key: &SessionKey) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query(
            "SELECT payload_json FROM chat_session WHERE session_key = ? AND expires_at > ?",
        )
        .bind(key.as_str())
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            row.try_get::<String, _>("payload_json")
                .map_err(|error| RepositoryError::Decode(error.to_string()))
        })
        .transpose()
    }

    async fn store(
        &self,
        key: &SessionKey,
        document: String,
        ttl: Duration,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_session (session_key, payload_json, expires_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(session_key) DO UPDATE SET
                 payload_json = excluded.payload_json,
                 expires_at = excluded.expires_at,
                 updated_at = excluded.updated_at",
        )
        .bind(key.as_str())
        .bind(document)
        .bind(expires_at_epoch(ttl))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM chat_session WHERE session_key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_session WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
