//! Storage repository traits
//!
//! The room service only talks to storage through these traits, so a
//! different backend can stand in for SQLite.

use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    BannedUser, CoHost, HistoryAction, HistoryEntry, HistoryEvent, Participant, ParticipantInfo,
    Room, RoomSummary, Session, User, UserSummary,
};

use super::participants::Upsert;

/// User repository operations
pub trait UserRepository {
    /// Create a new user
    fn create_user(&self, user: &User) -> Result<()>;

    /// Find user by ID
    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Find user by wallet address
    fn find_user_by_wallet(&self, address: &str) -> Result<Option<User>>;

    /// Username prefix search, guests excluded
    fn search_users(&self, prefix: &str, limit: u32) -> Result<Vec<User>>;

    /// Create a session
    fn create_session(&self, session: &Session) -> Result<()>;

    /// Find a valid (non-expired) session
    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>>;

    /// Clean up expired sessions
    fn cleanup_expired_sessions(&self) -> Result<u64>;
}

/// Room repository operations
pub trait RoomRepository {
    fn create_room(&self, room: &Room) -> Result<()>;

    fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>>;

    fn find_rooms_by_name(&self, name: &str) -> Result<Vec<Room>>;

    /// Persist name, description, category, visibility, capacity, mode and quality
    fn update_room_settings(&self, room: &Room) -> Result<()>;

    fn set_room_closed(&self, room_id: Uuid, closed: bool) -> Result<()>;

    fn set_room_recording(&self, room_id: Uuid, recording: bool) -> Result<()>;

    /// Mark every active participant left, then delete the room and its
    /// children, all in one transaction. Returns false if the room was gone.
    fn delete_room(&self, room_id: Uuid) -> Result<bool>;

    fn list_public_rooms(&self, limit: u32, offset: u32) -> Result<Vec<RoomSummary>>;

    fn count_public_rooms(&self) -> Result<u64>;
}

/// Participant repository operations
pub trait ParticipantRepository {
    /// Make (room, user) active, reusing any existing row
    fn upsert_participant(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        is_speaker: bool,
    ) -> Result<(Participant, Upsert)>;

    /// Find the (room, user) row, active or not
    fn find_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<Option<Participant>>;

    /// Active roster, earliest join first
    fn list_active_participants(&self, room_id: Uuid) -> Result<Vec<ParticipantInfo>>;

    fn count_active_participants(&self, room_id: Uuid) -> Result<u32>;

    fn mark_participant_left(&self, room_id: Uuid, user_id: Uuid) -> Result<bool>;

    fn set_speaker(&self, room_id: Uuid, user_id: Uuid, is_speaker: bool) -> Result<bool>;
}

/// Co-host and ban operations
pub trait ModerationRepository {
    fn add_co_host(&self, grant: &CoHost) -> Result<bool>;

    fn remove_co_host(&self, room_id: Uuid, user_id: Uuid) -> Result<bool>;

    fn is_co_host(&self, room_id: Uuid, user_id: Uuid) -> Result<bool>;

    fn list_co_hosts(&self, room_id: Uuid) -> Result<Vec<UserSummary>>;

    fn find_ban(&self, room_id: Uuid, user_id: Uuid) -> Result<Option<BannedUser>>;

    fn insert_ban(&self, ban: &BannedUser) -> Result<bool>;

    fn remove_ban(&self, room_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// End an active membership and, if `ban` is given, upsert it in the
    /// same transaction. Returns false without writing if the user was not
    /// active.
    fn remove_member(&self, room_id: Uuid, user_id: Uuid, ban: Option<&BannedUser>)
        -> Result<bool>;
}

/// Append-only room history
pub trait HistoryRepository {
    fn append_history(&self, event: &HistoryEvent) -> Result<()>;

    /// Newest first
    fn list_history(&self, room_id: Uuid, limit: u32) -> Result<Vec<HistoryEntry>>;

    fn count_history_actions(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        action: HistoryAction,
    ) -> Result<u32>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
pub trait Storage:
    UserRepository
    + RoomRepository
    + ParticipantRepository
    + ModerationRepository
    + HistoryRepository
{
}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where
    T: UserRepository
        + RoomRepository
        + ParticipantRepository
        + ModerationRepository
        + HistoryRepository
{
}
