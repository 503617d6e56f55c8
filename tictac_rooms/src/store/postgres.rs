//! PostgreSQL room store.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use std::{sync::Arc, time::Duration};

use super::{DEFAULT_RESERVATION_TTL, RoomStore, StoreError, StoreResult};
use crate::db::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};
use crate::room::{GameStatus, Player, Room, RoomId, Seat};

const ROOM_COLUMNS: &str =
    "id, game_session_id, is_private, blocked, players, current_turn_seat, move_count, revision";

/// Room store backed by the `rooms` table
pub struct PgRoomStore {
    pool: Arc<PgPool>,
    query_timeout: Duration,
    reservation_ttl: Duration,
}

impl PgRoomStore {
    /// Create a new room store
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            reservation_ttl: DEFAULT_RESERVATION_TTL,
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn with_reservation_ttl(mut self, reservation_ttl: Duration) -> Self {
        self.reservation_ttl = reservation_ttl;
        self
    }
}

fn room_from_row(row: &PgRow) -> StoreResult<Room> {
    let id: i64 = row.try_get("id")?;
    let players: Json<Vec<Player>> = row.try_get("players")?;
    let turn_seat: i16 = row.try_get("current_turn_seat")?;
    let move_count: i32 = row.try_get("move_count")?;

    let current_turn_seat = u8::try_from(turn_seat)
        .ok()
        .and_then(Seat::from_number)
        .ok_or_else(|| StoreError::Corrupt {
            room_id: Some(id),
            reason: format!("current turn seat {turn_seat}"),
        })?;

    let game_status = GameStatus {
        current_turn_seat,
        move_count: u32::try_from(move_count).unwrap_or_default(),
    };

    Room::from_parts(
        id,
        row.try_get("game_session_id")?,
        row.try_get("is_private")?,
        players.0,
        game_status,
        row.try_get("blocked")?,
        row.try_get("revision")?,
    )
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn find_available_and_reserve(&self, exclude: Option<RoomId>) -> StoreResult<Option<Room>> {
        // Selection and reservation are one statement; SKIP LOCKED lets
        // concurrent callers move on to the next candidate. A reservation
        // with no timestamp predates reserved_at and counts as abandoned.
        let query = format!(
            r#"
            UPDATE rooms
            SET blocked = TRUE, reserved_at = NOW(), updated_at = NOW()
            WHERE id = (
                SELECT id FROM rooms
                WHERE is_private = FALSE
                  AND player_count < 2
                  AND ($1::BIGINT IS NULL OR id <> $1)
                  AND (
                      blocked = FALSE
                      OR reserved_at IS NULL
                      OR reserved_at < NOW() - make_interval(secs => $2)
                  )
                ORDER BY id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            AND (
                blocked = FALSE
                OR reserved_at IS NULL
                OR reserved_at < NOW() - make_interval(secs => $2)
            )
            RETURNING {ROOM_COLUMNS}
            "#
        );

        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&query)
                .bind(exclude)
                .bind(self.reservation_ttl.as_secs_f64())
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(room_from_row).transpose()
    }

    async fn save(&self, room: &mut Room) -> StoreResult<RoomId> {
        let status = room.game_status();
        let players = Json(room.players());
        let player_count = players.0.len() as i16;
        let turn_seat = i16::from(status.current_turn_seat.number());
        let move_count = i32::try_from(status.move_count).unwrap_or(i32::MAX);

        let Some(room_id) = room.id() else {
            let row = with_timeout(
                self.query_timeout,
                sqlx::query(
                    r#"
                    INSERT INTO rooms (
                        game_session_id, is_private, blocked, players, player_count,
                        current_turn_seat, move_count, revision
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, 1)
                    RETURNING id, revision
                    "#,
                )
                .bind(room.game_session_id())
                .bind(room.is_private())
                .bind(room.is_blocked())
                .bind(&players)
                .bind(player_count)
                .bind(turn_seat)
                .bind(move_count)
                .fetch_one(self.pool.as_ref()),
            )
            .await?;

            let room_id: i64 = row.try_get("id")?;
            room.assign_id(room_id);
            room.set_revision(row.try_get("revision")?);
            log::debug!("Inserted room {}", room_id);
            return Ok(room_id);
        };

        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                UPDATE rooms
                SET blocked = $2,
                    reserved_at = CASE WHEN $2 THEN reserved_at ELSE NULL END,
                    players = $3,
                    player_count = $4,
                    current_turn_seat = $5,
                    move_count = $6,
                    revision = revision + 1,
                    updated_at = NOW()
                WHERE id = $1 AND revision = $7
                RETURNING revision
                "#,
            )
            .bind(room_id)
            .bind(room.is_blocked())
            .bind(&players)
            .bind(player_count)
            .bind(turn_seat)
            .bind(move_count)
            .bind(room.revision())
            .fetch_optional(self.pool.as_ref()),
        )
        .await?
        .ok_or(StoreError::Conflict(room_id))?;

        room.set_revision(row.try_get("revision")?);
        Ok(room_id)
    }

    async fn release_by_id(&self, room_id: RoomId) -> StoreResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query("UPDATE rooms SET blocked = FALSE, reserved_at = NULL, updated_at = NOW() WHERE id = $1")
                .bind(room_id)
                .execute(self.pool.as_ref()),
        )
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, room_id: RoomId) -> StoreResult<Option<Room>> {
        let query = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1");
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&query)
                .bind(room_id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(room_from_row).transpose()
    }

    async fn health_check(&self) -> StoreResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query("SELECT 1").execute(self.pool.as_ref()),
        )
        .await?;
        Ok(())
    }
}
