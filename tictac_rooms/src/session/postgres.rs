//! PostgreSQL session bindings.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::{sync::Arc, time::Duration};

use super::{ClientSession, DEFAULT_SESSION_MAX_AGE, SessionBinder, SessionBinding};
use crate::db::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};
use crate::room::Seat;
use crate::store::{StoreError, StoreResult};

/// Session bindings kept in the `session_bindings` table
pub struct PgSessionBinder {
    pool: Arc<PgPool>,
    max_age: Duration,
    query_timeout: Duration,
}

impl PgSessionBinder {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            max_age: DEFAULT_SESSION_MAX_AGE,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

#[async_trait]
impl SessionBinder for PgSessionBinder {
    async fn binding(&self, session: ClientSession) -> StoreResult<Option<SessionBinding>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT room_id, player_number
                FROM session_bindings
                WHERE session_id = $1 AND expires_at > $2
                "#,
            )
            .bind(session.as_uuid())
            .bind(chrono::Utc::now().naive_utc())
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let room_id: i64 = row.try_get("room_id")?;
        let number: i16 = row.try_get("player_number")?;
        let player_number = u8::try_from(number)
            .ok()
            .and_then(Seat::from_number)
            .ok_or_else(|| StoreError::Corrupt {
                room_id: Some(room_id),
                reason: format!("session bound to seat {number}"),
            })?;

        Ok(Some(SessionBinding {
            room_id,
            player_number,
        }))
    }

    async fn bind(&self, session: ClientSession, binding: SessionBinding) -> StoreResult<()> {
        let max_age = chrono::Duration::from_std(self.max_age)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        let expires_at = (chrono::Utc::now() + max_age).naive_utc();

        with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                INSERT INTO session_bindings (session_id, room_id, player_number, expires_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (session_id) DO UPDATE
                SET room_id = EXCLUDED.room_id,
                    player_number = EXCLUDED.player_number,
                    expires_at = EXCLUDED.expires_at
                "#,
            )
            .bind(session.as_uuid())
            .bind(binding.room_id)
            .bind(i16::from(binding.player_number.number()))
            .bind(expires_at)
            .execute(self.pool.as_ref()),
        )
        .await?;

        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query("DELETE FROM session_bindings WHERE expires_at <= $1")
                .bind(chrono::Utc::now().naive_utc())
                .execute(self.pool.as_ref()),
        )
        .await?;

        Ok(result.rows_affected())
    }
}
