//! Room session manager
//!
//! Owns room lifecycle, membership and role resolution. Every check is
//! re-derived from storage per call; nothing about "who is host" is cached.
//!
//! Storage sits behind a synchronous mutex. Guards are always dropped before
//! awaiting the media provider.

mod lifecycle;
mod membership;
mod roles;


use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::{Credentials, Identity, IdentityResolver};
use crate::models::{HistoryEvent, Participant, Room, RoomRole};
use crate::permissions::{PermissionMatrix, RoomAction};
use crate::provider::MediaProvider;
use crate::storage::Storage;

/// Default page size for room history
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
/// Kicks at which a user is banned automatically
pub const AUTO_BAN_KICKS: u32 = 2;

/// Result of a successful join
#[derive(Debug, Clone, Serialize)]
pub struct JoinOutcome {
    pub room: Room,
    pub participant: Participant,
    /// `None` when the provider could not mint one; the room is still joined
    pub token: Option<String>,
    pub already_joined: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KickOutcome {
    pub kick_count: u32,
    pub auto_banned: bool,
    /// Whether the provider confirmed ejecting the live session
    pub ejected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SpeakRequest {
    AlreadySpeaker,
    Requested { user_id: Uuid, username: String },
}

/// Per-name results of an admin bulk delete
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminDeleteReport {
    pub deleted: Vec<(String, Uuid)>,
    pub errors: Vec<(String, String)>,
}

pub struct RoomService<D: Storage + Send> {
    store: Arc<Mutex<D>>,
    provider: Arc<dyn MediaProvider>,
    config: Arc<Config>,
}

impl<D: Storage + Send> Clone for RoomService<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
            config: Arc::clone(&self.config),
        }
    }
}

impl<D: Storage + Send> RoomService<D> {
    pub fn new(store: D, provider: Arc<dyn MediaProvider>, config: Config) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            provider,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lock storage. A panic in another holder leaves SQLite consistent,
    /// so a poisoned lock is recovered rather than propagated.
    fn db(&self) -> MutexGuard<'_, D> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve request credentials into an identity
    pub fn resolve(&self, credentials: &Credentials) -> Result<Identity> {
        let db = self.db();
        let resolver = IdentityResolver::new(&*db);
        resolver.resolve(credentials)
    }

    /// Delete expired sessions. Returns how many were removed.
    #[instrument(skip(self))]
    pub fn prune_sessions(&self) -> Result<u64> {
        let removed = self.db().cleanup_expired_sessions()?;
        if removed > 0 {
            info!(removed, "Expired sessions pruned");
        }
        Ok(removed)
    }

    /// Resolve the role a user holds in a room
    pub fn room_role(&self, room_id: Uuid, user_id: Uuid) -> Result<RoomRole> {
        let db = self.db();
        let room = load_room(&*db, room_id)?;
        role_in(&*db, &room, user_id)
    }
}

pub(crate) fn load_room<D: Storage>(db: &D, room_id: Uuid) -> Result<Room> {
    db.find_room_by_id(room_id)?
        .ok_or_else(|| Error::NotFound(format!("room {room_id}")))
}

pub(crate) fn role_in<D: Storage>(db: &D, room: &Room, user_id: Uuid) -> Result<RoomRole> {
    if room.is_host(user_id) {
        return Ok(RoomRole::Host);
    }
    if db.is_co_host(room.id, user_id)? {
        return Ok(RoomRole::CoHost);
    }
    let active = db
        .find_participant(room.id, user_id)?
        .is_some_and(|p| p.is_active());
    Ok(if active {
        RoomRole::Participant
    } else {
        RoomRole::Visitor
    })
}

pub(crate) fn authorize(role: RoomRole, action: RoomAction, denial: &str) -> Result<()> {
    if PermissionMatrix::can_perform(role, action) {
        Ok(())
    } else {
        Err(Error::Forbidden(denial.to_string()))
    }
}

pub(crate) fn reject_self_target(actor: &Identity, target: Uuid, what: &str) -> Result<()> {
    if actor.id() == target {
        return Err(Error::SelfTarget(format!("you cannot {what} yourself")));
    }
    Ok(())
}

/// Append a history event. Failures are logged and swallowed.
pub(crate) fn record<D: Storage>(db: &D, event: HistoryEvent) {
    if let Err(e) = db.append_history(&event) {
        warn!(
            room_id = %event.room_id,
            action = %event.action,
            error = %e,
            "History log failed (non-critical)"
        );
    }
}
