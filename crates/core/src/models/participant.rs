//! Room participation and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles within a single room, in priority order (highest to lowest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RoomRole {
    /// Owner - sole authority for destructive and structural actions
    Host = 4,
    /// Granted by the host - moderation short of removing the host
    CoHost = 3,
    /// Active member of the room
    Participant = 2,
    /// Anyone else
    Visitor = 1,
}

impl RoomRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            RoomRole::Host => "Host",
            RoomRole::CoHost => "Co-host",
            RoomRole::Participant => "Participant",
            RoomRole::Visitor => "Visitor",
        }
    }

    /// Host or co-host
    pub fn is_moderator(&self) -> bool {
        *self >= RoomRole::CoHost
    }
}

impl std::fmt::Display for RoomRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A user's membership row in a room. At most one per (room, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    /// `None` while active
    pub left_at: Option<DateTime<Utc>>,
    pub is_speaker: bool,
}

impl Participant {
    pub fn new(room_id: Uuid, user_id: Uuid, is_speaker: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            user_id,
            joined_at: Utc::now(),
            left_at: None,
            is_speaker,
        }
    }

    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

/// An active participant with user info, for rosters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub participant_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub wallet_address: Option<String>,
    pub is_guest: bool,
    pub is_speaker: bool,
    pub joined_at: DateTime<Utc>,
}

/// Speaker flag and presence of one user in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantStatus {
    pub is_speaker: bool,
    pub is_active: bool,
}

impl From<&Participant> for ParticipantStatus {
    fn from(p: &Participant) -> Self {
        Self {
            is_speaker: p.is_speaker,
            is_active: p.is_active(),
        }
    }
}
