//! Co-host grants and bans

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user elevated by the host in one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoHost {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl CoHost {
    pub fn new(room_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// Exclusion of a user from one room, until unbanned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedUser {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BannedUser {
    pub fn new(room_id: Uuid, user_id: Uuid, reason: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            user_id,
            reason,
            created_at: Utc::now(),
        }
    }
}
