//! Participant storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_datetime_opt, parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{IdentityKind, Participant, ParticipantInfo, GUEST_PREFIX};

/// How an upsert resolved against the existing row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First join: a new row was written
    Inserted,
    /// A left row was brought back to active
    Reactivated,
    /// The row was already active; nothing changed
    AlreadyActive,
}

pub struct ParticipantStore<'a> {
    conn: &'a Connection,
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        room_id: parse_uuid(&row.get::<_, String>(1)?)?,
        user_id: parse_uuid(&row.get::<_, String>(2)?)?,
        joined_at: parse_datetime(&row.get::<_, String>(3)?)?,
        left_at: parse_datetime_opt(row.get::<_, Option<String>>(4)?)?,
        is_speaker: row.get::<_, i32>(5)? != 0,
    })
}

impl<'a> ParticipantStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Make (room, user) active in one statement.
    ///
    /// The UNIQUE(room_id, user_id) constraint turns concurrent first joins
    /// into one insert plus one no-op update, so two active rows cannot exist.
    #[instrument(skip(self))]
    pub fn upsert_active(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        is_speaker: bool,
    ) -> Result<(Participant, Upsert)> {
        let candidate = Participant::new(room_id, user_id, is_speaker);
        let changed = self.conn.execute(
            "INSERT INTO room_participants (id, room_id, user_id, joined_at, left_at, is_speaker)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5)
             ON CONFLICT(room_id, user_id) DO UPDATE SET
                 joined_at = excluded.joined_at,
                 left_at = NULL,
                 is_speaker = excluded.is_speaker
             WHERE room_participants.left_at IS NOT NULL",
            params![
                candidate.id.to_string(),
                room_id.to_string(),
                user_id.to_string(),
                candidate.joined_at.to_rfc3339(),
                is_speaker as i32,
            ],
        )?;

        let stored = self
            .find(room_id, user_id)?
            .ok_or_else(|| Error::NotFound(format!("participant {user_id} in room {room_id}")))?;

        let outcome = match (changed, stored.id == candidate.id) {
            (0, _) => Upsert::AlreadyActive,
            (_, true) => Upsert::Inserted,
            (_, false) => Upsert::Reactivated,
        };
        Ok((stored, outcome))
    }

    /// Find the (room, user) row, active or not
    #[instrument(skip(self))]
    pub fn find(&self, room_id: Uuid, user_id: Uuid) -> Result<Option<Participant>> {
        let participant = self
            .conn
            .query_row(
                "SELECT id, room_id, user_id, joined_at, left_at, is_speaker
                 FROM room_participants WHERE room_id = ?1 AND user_id = ?2",
                params![room_id.to_string(), user_id.to_string()],
                participant_from_row,
            )
            .optional()?;
        Ok(participant)
    }

    pub fn find_active(&self, room_id: Uuid, user_id: Uuid) -> Result<Option<Participant>> {
        Ok(self.find(room_id, user_id)?.filter(Participant::is_active))
    }

    /// Active roster with user info, earliest join first
    #[instrument(skip(self))]
    pub fn list_active(&self, room_id: Uuid) -> Result<Vec<ParticipantInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, u.id, u.username, u.wallet_address, u.kind, p.is_speaker, p.joined_at
             FROM room_participants p
             INNER JOIN users u ON u.id = p.user_id
             WHERE p.room_id = ?1 AND p.left_at IS NULL
             ORDER BY p.joined_at ASC, p.id ASC",
        )?;

        let roster = stmt
            .query_map(params![room_id.to_string()], |row| {
                let username: String = row.get(2)?;
                let kind: String = row.get(4)?;
                Ok(ParticipantInfo {
                    participant_id: parse_uuid(&row.get::<_, String>(0)?)?,
                    user_id: parse_uuid(&row.get::<_, String>(1)?)?,
                    is_guest: kind == IdentityKind::Guest.as_str()
                        || username.starts_with(GUEST_PREFIX),
                    username,
                    wallet_address: row.get(3)?,
                    is_speaker: row.get::<_, i32>(5)? != 0,
                    joined_at: parse_datetime(&row.get::<_, String>(6)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(roster)
    }

    #[instrument(skip(self))]
    pub fn count_active(&self, room_id: Uuid) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM room_participants WHERE room_id = ?1 AND left_at IS NULL",
            params![room_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Mark an active participant as left. Returns false if none was active.
    #[instrument(skip(self))]
    pub fn mark_left(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE room_participants SET left_at = ?1
             WHERE room_id = ?2 AND user_id = ?3 AND left_at IS NULL",
            params![
                Utc::now().to_rfc3339(),
                room_id.to_string(),
                user_id.to_string()
            ],
        )?;
        Ok(changed > 0)
    }

    /// Mark every active participant of a room as left
    #[instrument(skip(self))]
    pub fn mark_all_left(&self, room_id: Uuid) -> Result<u64> {
        let changed = self.conn.execute(
            "UPDATE room_participants SET left_at = ?1 WHERE room_id = ?2 AND left_at IS NULL",
            params![Utc::now().to_rfc3339(), room_id.to_string()],
        )?;
        Ok(changed as u64)
    }

    /// Set the speaker flag on an active participant
    #[instrument(skip(self))]
    pub fn set_speaker(&self, room_id: Uuid, user_id: Uuid, is_speaker: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE room_participants SET is_speaker = ?1
             WHERE room_id = ?2 AND user_id = ?3 AND left_at IS NULL",
            params![is_speaker as i32, room_id.to_string(), user_id.to_string()],
        )?;
        Ok(changed > 0)
    }
}
