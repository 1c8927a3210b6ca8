//! Room storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_speaker_mode, parse_uuid, parse_voice_quality, OptionalExt,
};
use crate::error::Result;
use crate::models::{Room, RoomSummary, UserSummary};

const ROOM_COLUMNS: &str = "r.id, r.name, r.description, r.category, r.is_public, r.max_participants, \
     r.speaker_mode, r.voice_quality, r.is_recording, r.is_closed, r.host_id, r.external_url, r.created_at";

pub struct RoomStore<'a> {
    conn: &'a Connection,
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        is_public: row.get::<_, i32>(4)? != 0,
        max_participants: row.get(5)?,
        speaker_mode: parse_speaker_mode(&row.get::<_, String>(6)?)?,
        voice_quality: parse_voice_quality(&row.get::<_, String>(7)?),
        is_recording: row.get::<_, i32>(8)? != 0,
        // Column is nullable until every row has been written post-migration
        is_closed: row.get::<_, Option<i32>>(9)?.is_some_and(|v| v != 0),
        host_id: parse_uuid(&row.get::<_, String>(10)?)?,
        external_url: row.get(11)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?)?,
    })
}

impl<'a> RoomStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new room
    #[instrument(skip(self, room), fields(room_id = %room.id, room_name = %room.name))]
    pub fn create(&self, room: &Room) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rooms (id, name, description, category, is_public, max_participants,
                                speaker_mode, voice_quality, is_recording, is_closed, host_id,
                                external_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                room.id.to_string(),
                room.name,
                room.description,
                room.category,
                room.is_public as i32,
                room.max_participants,
                room.speaker_mode.as_str(),
                room.voice_quality.as_str(),
                room.is_recording as i32,
                room.is_closed as i32,
                room.host_id.to_string(),
                room.external_url,
                room.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find room by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Room>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.id = ?1");
        let room = self
            .conn
            .query_row(&sql, params![id.to_string()], room_from_row)
            .optional()?;
        Ok(room)
    }

    /// Find every room with an exact name
    #[instrument(skip(self))]
    pub fn find_by_name(&self, name: &str) -> Result<Vec<Room>> {
        let sql =
            format!("SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.name = ?1 ORDER BY r.created_at");
        let mut stmt = self.conn.prepare(&sql)?;
        let rooms = stmt
            .query_map(params![name], room_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rooms)
    }

    /// Persist the editable settings of a room
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    pub fn update_settings(&self, room: &Room) -> Result<()> {
        self.conn.execute(
            "UPDATE rooms SET name = ?1, description = ?2, category = ?3, is_public = ?4,
                              max_participants = ?5, speaker_mode = ?6, voice_quality = ?7
             WHERE id = ?8",
            params![
                room.name,
                room.description,
                room.category,
                room.is_public as i32,
                room.max_participants,
                room.speaker_mode.as_str(),
                room.voice_quality.as_str(),
                room.id.to_string(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn set_closed(&self, room_id: Uuid, closed: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE rooms SET is_closed = ?1 WHERE id = ?2",
            params![closed as i32, room_id.to_string()],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn set_recording(&self, room_id: Uuid, recording: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE rooms SET is_recording = ?1 WHERE id = ?2",
            params![recording as i32, room_id.to_string()],
        )?;
        Ok(())
    }

    /// Delete a room. Children go with it through foreign-key cascades.
    #[instrument(skip(self))]
    pub fn delete(&self, room_id: Uuid) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM rooms WHERE id = ?1",
            params![room_id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// Page through public rooms, newest first
    #[instrument(skip(self))]
    pub fn list_public(&self, limit: u32, offset: u32) -> Result<Vec<RoomSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, r.description, r.is_public, r.is_closed, r.max_participants,
                    r.speaker_mode, r.created_at,
                    u.id, u.username, u.wallet_address, u.is_verified,
                    (SELECT COUNT(*) FROM room_participants p
                     WHERE p.room_id = r.id AND p.left_at IS NULL)
             FROM rooms r
             INNER JOIN users u ON u.id = r.host_id
             WHERE r.is_public = 1
             ORDER BY r.created_at DESC
             LIMIT ?1 OFFSET ?2",
        )?;

        let rooms = stmt
            .query_map(params![limit, offset], |row| {
                Ok(RoomSummary {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    is_public: row.get::<_, i32>(3)? != 0,
                    is_closed: row.get::<_, Option<i32>>(4)?.is_some_and(|v| v != 0),
                    max_participants: row.get(5)?,
                    speaker_mode: parse_speaker_mode(&row.get::<_, String>(6)?)?,
                    created_at: parse_datetime(&row.get::<_, String>(7)?)?,
                    host: UserSummary {
                        id: parse_uuid(&row.get::<_, String>(8)?)?,
                        username: row.get(9)?,
                        wallet_address: row.get(10)?,
                        is_verified: row.get::<_, i32>(11)? != 0,
                    },
                    participant_count: row.get(12)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rooms)
    }

    #[instrument(skip(self))]
    pub fn count_public(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM rooms WHERE is_public = 1", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewRoom, User};
    use crate::storage::{migrations, Database};
    use rusqlite::Connection;

    fn host(db: &Database) -> User {
        let user = User::account("host".into(), "host@x.io".into());
        db.users().create(&user).unwrap();
        user
    }

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let host = host(&db);
        let room = Room::new(&NewRoom::named("gm"), 10, host.id, "https://d.co/gm".into());
        db.rooms().create(&room).unwrap();

        let found = db.rooms().find_by_id(room.id).unwrap().unwrap();
        assert_eq!(found.name, "gm");
        assert_eq!(found.host_id, host.id);
        assert_eq!(found.max_participants, 10);
        assert_eq!(found.external_url, "https://d.co/gm");
        assert!(!found.is_closed);
        assert!(db.rooms().find_by_id(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_null_closed_column_reads_as_open() {
        // A row written by code that predates the closed-flag migration
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        migrations::migrate_to(&conn, 2).unwrap();

        let host = User::account("old".into(), "old@x.io".into());
        crate::storage::UserStore::new(&conn).create(&host).unwrap();
        let room_id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO rooms (id, name, max_participants, host_id, external_url, created_at)
             VALUES (?1, 'legacy', 10, ?2, 'https://d.co/legacy', ?3)",
            params![room_id.to_string(), host.id.to_string(), chrono::Utc::now().to_rfc3339()],
        )
        .unwrap();

        migrations::run_migrations(&conn).unwrap();

        let room = RoomStore::new(&conn).find_by_id(room_id).unwrap().unwrap();
        assert!(!room.is_closed);
        assert!(room.is_public);
    }

    #[test]
    fn test_list_public_hides_private_rooms() {
        let db = Database::open_in_memory().unwrap();
        let host = host(&db);

        let public = Room::new(&NewRoom::named("open"), 10, host.id, "https://d.co/a".into());
        let mut draft = NewRoom::named("secret");
        draft.is_public = false;
        let private = Room::new(&draft, 10, host.id, "https://d.co/b".into());
        db.rooms().create(&public).unwrap();
        db.rooms().create(&private).unwrap();

        let page = db.rooms().list_public(20, 0).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "open");
        assert_eq!(page[0].participant_count, 0);
        assert_eq!(page[0].host.id, host.id);
        assert_eq!(db.rooms().count_public().unwrap(), 1);
    }

    #[test]
    fn test_find_by_name() {
        let db = Database::open_in_memory().unwrap();
        let host = host(&db);
        for url in ["https://d.co/1", "https://d.co/2"] {
            let room = Room::new(&NewRoom::named("dup"), 10, host.id, url.into());
            db.rooms().create(&room).unwrap();
        }
        assert_eq!(db.rooms().find_by_name("dup").unwrap().len(), 2);
        assert!(db.rooms().find_by_name("none").unwrap().is_empty());
    }
}
