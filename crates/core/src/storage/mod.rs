//! SQLite storage layer for Jeetspace

mod history;
pub(crate) mod migrations;
mod moderation;
mod parse;
mod participants;
mod rooms;
mod traits;
mod users;

use rusqlite::Connection;
use std::path::Path;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    BannedUser, CoHost, HistoryAction, HistoryEntry, HistoryEvent, Participant, ParticipantInfo,
    Room, RoomSummary, Session, User, UserSummary,
};

pub use history::HistoryStore;
pub use migrations::latest_version;
pub use moderation::ModerationStore;
pub use participants::{ParticipantStore, Upsert};
pub use rooms::RoomStore;
pub use traits::{
    HistoryRepository, ModerationRepository, ParticipantRepository, RoomRepository, Storage,
    UserRepository,
};
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    pub fn rooms(&self) -> RoomStore<'_> {
        RoomStore::new(&self.conn)
    }

    pub fn participants(&self) -> ParticipantStore<'_> {
        ParticipantStore::new(&self.conn)
    }

    pub fn moderation(&self) -> ModerationStore<'_> {
        ModerationStore::new(&self.conn)
    }

    pub fn history(&self) -> HistoryStore<'_> {
        HistoryStore::new(&self.conn)
    }

    /// End every active membership and delete the room atomically
    #[instrument(skip(self))]
    fn delete_room_cascade(&self, room_id: Uuid) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let left = ParticipantStore::new(&tx).mark_all_left(room_id)?;
        let deleted = RoomStore::new(&tx).delete(room_id)?;
        tx.commit()?;
        if deleted {
            info!(%room_id, participants_ended = left, "Room deleted");
        }
        Ok(deleted)
    }

    #[instrument(skip(self, ban), fields(banned = ban.is_some()))]
    fn remove_member_atomic(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        ban: Option<&BannedUser>,
    ) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        if !ParticipantStore::new(&tx).mark_left(room_id, user_id)? {
            return Ok(false);
        }
        if let Some(ban) = ban {
            ModerationStore::new(&tx).upsert_ban(ban)?;
        }
        tx.commit()?;
        Ok(true)
    }

    /// Drop the history table so every history write fails
    #[cfg(test)]
    pub(crate) fn drop_history_table(&self) {
        self.conn.execute_batch("DROP TABLE room_history").unwrap();
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl UserRepository for Database {
    fn create_user(&self, user: &User) -> Result<()> {
        self.users().create(user)
    }

    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.users().find_by_id(id)
    }

    fn find_user_by_wallet(&self, address: &str) -> Result<Option<User>> {
        self.users().find_by_wallet(address)
    }

    fn search_users(&self, prefix: &str, limit: u32) -> Result<Vec<User>> {
        self.users().search(prefix, limit)
    }

    fn create_session(&self, session: &Session) -> Result<()> {
        self.users().create_session(session)
    }

    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        self.users().find_valid_session(session_id)
    }

    fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.users().cleanup_expired_sessions()
    }
}

impl RoomRepository for Database {
    fn create_room(&self, room: &Room) -> Result<()> {
        self.rooms().create(room)
    }

    fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>> {
        self.rooms().find_by_id(id)
    }

    fn find_rooms_by_name(&self, name: &str) -> Result<Vec<Room>> {
        self.rooms().find_by_name(name)
    }

    fn update_room_settings(&self, room: &Room) -> Result<()> {
        self.rooms().update_settings(room)
    }

    fn set_room_closed(&self, room_id: Uuid, closed: bool) -> Result<()> {
        self.rooms().set_closed(room_id, closed)
    }

    fn set_room_recording(&self, room_id: Uuid, recording: bool) -> Result<()> {
        self.rooms().set_recording(room_id, recording)
    }

    fn delete_room(&self, room_id: Uuid) -> Result<bool> {
        self.delete_room_cascade(room_id)
    }

    fn list_public_rooms(&self, limit: u32, offset: u32) -> Result<Vec<RoomSummary>> {
        self.rooms().list_public(limit, offset)
    }

    fn count_public_rooms(&self) -> Result<u64> {
        self.rooms().count_public()
    }
}

impl ParticipantRepository for Database {
    fn upsert_participant(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        is_speaker: bool,
    ) -> Result<(Participant, Upsert)> {
        self.participants()
            .upsert_active(room_id, user_id, is_speaker)
    }

    fn find_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<Option<Participant>> {
        self.participants().find(room_id, user_id)
    }

    fn list_active_participants(&self, room_id: Uuid) -> Result<Vec<ParticipantInfo>> {
        self.participants().list_active(room_id)
    }

    fn count_active_participants(&self, room_id: Uuid) -> Result<u32> {
        self.participants().count_active(room_id)
    }

    fn mark_participant_left(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.participants().mark_left(room_id, user_id)
    }

    fn set_speaker(&self, room_id: Uuid, user_id: Uuid, is_speaker: bool) -> Result<bool> {
        self.participants().set_speaker(room_id, user_id, is_speaker)
    }
}

impl ModerationRepository for Database {
    fn add_co_host(&self, grant: &CoHost) -> Result<bool> {
        self.moderation().add_co_host(grant)
    }

    fn remove_co_host(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.moderation().remove_co_host(room_id, user_id)
    }

    fn is_co_host(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.moderation().is_co_host(room_id, user_id)
    }

    fn list_co_hosts(&self, room_id: Uuid) -> Result<Vec<UserSummary>> {
        self.moderation().list_co_hosts(room_id)
    }

    fn find_ban(&self, room_id: Uuid, user_id: Uuid) -> Result<Option<BannedUser>> {
        self.moderation().find_ban(room_id, user_id)
    }

    fn insert_ban(&self, ban: &BannedUser) -> Result<bool> {
        self.moderation().insert_ban(ban)
    }

    fn remove_ban(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.moderation().remove_ban(room_id, user_id)
    }

    fn remove_member(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        ban: Option<&BannedUser>,
    ) -> Result<bool> {
        self.remove_member_atomic(room_id, user_id, ban)
    }
}

impl HistoryRepository for Database {
    fn append_history(&self, event: &HistoryEvent) -> Result<()> {
        self.history().append(event)
    }

    fn list_history(&self, room_id: Uuid, limit: u32) -> Result<Vec<HistoryEntry>> {
        self.history().list_recent(room_id, limit)
    }

    fn count_history_actions(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        action: HistoryAction,
    ) -> Result<u32> {
        self.history().count_actions(room_id, user_id, action)
    }
}
