//! Room lifecycle: create, read, edit, open/close, recording, delete

use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{authorize, load_room, record, role_in, AdminDeleteReport, RoomService};
use crate::error::{Error, Result};
use crate::hosting::{HostClaim, HostContext};
use crate::identity::Identity;
use crate::invariants::{assert_room_invariants, assert_roster_invariants};
use crate::models::{
    HistoryAction, HistoryEntry, HistoryEvent, NewRoom, Room, RoomDetails, RoomPage, RoomPatch,
    RoomRole, UserSummary, MAX_ROOM_NAME_LEN, MIN_CAPACITY,
};
use crate::permissions::RoomAction;
use crate::provider::sanitize_room_name;
use crate::storage::Storage;

/// Largest page the public directory returns
pub const MAX_PAGE_SIZE: u32 = 100;

fn validate_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Room name is required".into()));
    }
    if name.chars().count() > MAX_ROOM_NAME_LEN {
        return Err(Error::Validation(format!(
            "Room name must be {MAX_ROOM_NAME_LEN} characters or less"
        )));
    }
    Ok(())
}

fn validate_capacity(capacity: u32) -> Result<()> {
    if capacity < MIN_CAPACITY {
        return Err(Error::Validation(format!(
            "Room capacity must be at least {MIN_CAPACITY}"
        )));
    }
    Ok(())
}

impl<D: Storage + Send> RoomService<D> {
    /// Create a room with `actor` as host.
    ///
    /// The provider room is allocated first; no row is written without it.
    #[instrument(skip(self, actor, draft), fields(host_id = %actor.id(), name = %draft.name))]
    pub async fn create_room(&self, actor: &Identity, draft: NewRoom) -> Result<Room> {
        validate_name(&draft.name)?;
        let capacity = draft
            .max_participants
            .unwrap_or(self.config.provider.default_capacity);
        validate_capacity(capacity)?;

        let sanitized = sanitize_room_name(&draft.name);
        let media = self
            .provider
            .create_room(&sanitized, capacity)
            .await
            .map_err(|e| match e {
                Error::ProviderUnavailable(_) => e,
                other => Error::ProviderUnavailable(other.to_string()),
            })?;

        let room = Room::new(&draft, capacity, actor.id(), media.url);
        assert_room_invariants(&room);

        let db = self.db();
        db.create_room(&room)?;
        record(
            &*db,
            HistoryEvent::new(room.id, Some(actor.id()), HistoryAction::RoomCreated).with_details(
                json!({
                    "name": room.name,
                    "providerRoom": media.name,
                    "speakerMode": room.speaker_mode.as_str(),
                }),
            ),
        );

        info!(room_id = %room.id, provider_room = %media.name, "Room created");
        Ok(room)
    }

    /// Room with its active roster and co-hosts
    #[instrument(skip(self))]
    pub fn get_room(&self, room_id: Uuid) -> Result<RoomDetails> {
        let db = self.db();
        let room = load_room(&*db, room_id)?;
        let host = db
            .find_user_by_id(room.host_id)?
            .as_ref()
            .map(UserSummary::from);
        let participants = db.list_active_participants(room_id)?;
        let co_hosts = db.list_co_hosts(room_id)?;
        assert_roster_invariants(&room, &participants);

        Ok(RoomDetails {
            room,
            host,
            participants,
            co_hosts,
        })
    }

    /// Public directory, newest first
    #[instrument(skip(self))]
    pub fn list_public_rooms(&self, limit: u32, offset: u32) -> Result<RoomPage> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let db = self.db();
        let rooms = db.list_public_rooms(limit, offset)?;
        let total = db.count_public_rooms()?;
        Ok(RoomPage {
            rooms,
            limit,
            offset,
            total,
        })
    }

    /// Host-only partial update of room settings
    #[instrument(skip(self, actor, patch), fields(actor_id = %actor.id()))]
    pub fn edit_room(&self, room_id: Uuid, actor: &Identity, patch: RoomPatch) -> Result<Room> {
        if patch.is_empty() {
            return Err(Error::Validation("No editable fields provided".into()));
        }
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(capacity) = patch.max_participants {
            validate_capacity(capacity)?;
        }

        let db = self.db();
        let mut room = load_room(&*db, room_id)?;
        let role = role_in(&*db, &room, actor.id())?;
        authorize(role, RoomAction::EditRoom, "Only the host can edit room settings")?;

        room.apply(&patch);
        assert_room_invariants(&room);
        db.update_room_settings(&room)?;

        match serde_json::to_value(&patch) {
            Ok(changes) => record(
                &*db,
                HistoryEvent::new(room_id, Some(actor.id()), HistoryAction::RoomEdited)
                    .with_details(changes),
            ),
            Err(e) => warn!(error = %e, "Could not snapshot room edit"),
        }

        info!(%room_id, "Room settings updated");
        Ok(room)
    }

    /// Open or close a room to new joins
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub fn set_closed(&self, room_id: Uuid, actor: &Identity, closed: bool) -> Result<Room> {
        let db = self.db();
        let mut room = load_room(&*db, room_id)?;
        let mut role = role_in(&*db, &room, actor.id())?;

        if !role.is_moderator() {
            let host_is_guest = db
                .find_user_by_id(room.host_id)?
                .is_some_and(|host| host.is_guest());
            let roster = db.list_active_participants(room_id)?;
            let ctx = HostContext {
                room: &room,
                host_is_guest,
                roster: &roster,
            };
            let policy = self.config.rooms.guest_host_fallback;
            if let HostClaim::StandIn { participant } =
                ctx.claim(actor.id(), actor.is_guest(), policy)
            {
                info!(%room_id, %participant, ?policy, "Guest accepted as stand-in host");
                role = RoomRole::Host;
            }
        }

        authorize(
            role,
            RoomAction::ToggleClosed,
            "Only host or co-host can close/open the room",
        )?;

        db.set_room_closed(room_id, closed)?;
        room.is_closed = closed;

        let action = if closed {
            HistoryAction::RoomClosed
        } else {
            HistoryAction::RoomOpened
        };
        record(&*db, HistoryEvent::new(room_id, Some(actor.id()), action));

        info!(%room_id, closed, "Room closed flag changed");
        Ok(room)
    }

    /// Start or stop recording
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub fn set_recording(&self, room_id: Uuid, actor: &Identity, recording: bool) -> Result<Room> {
        let db = self.db();
        let mut room = load_room(&*db, room_id)?;
        let role = role_in(&*db, &room, actor.id())?;
        authorize(
            role,
            RoomAction::ControlRecording,
            "Only host or co-host can control recording",
        )?;

        db.set_room_recording(room_id, recording)?;
        room.is_recording = recording;

        let action = if recording {
            HistoryAction::RecordingStarted
        } else {
            HistoryAction::RecordingStopped
        };
        record(&*db, HistoryEvent::new(room_id, Some(actor.id()), action));
        Ok(room)
    }

    /// Delete a room. Host or configured admin only.
    ///
    /// Active members are marked left first, in the same transaction. The
    /// provider room is left to expire on its own.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub fn delete_room(&self, room_id: Uuid, actor: &Identity) -> Result<()> {
        let db = self.db();
        let room = load_room(&*db, room_id)?;

        if !self.config.is_admin(&actor.user) {
            let role = role_in(&*db, &room, actor.id())?;
            authorize(role, RoomAction::DeleteRoom, "Only the host can delete this room")?;
        }

        if !db.delete_room(room_id)? {
            return Err(Error::NotFound(format!("room {room_id}")));
        }
        Ok(())
    }

    /// Admin bulk delete by exact room name. Per-name failures are collected.
    #[instrument(skip(self, actor, names), fields(actor_id = %actor.id(), count = names.len()))]
    pub fn admin_delete_by_names(
        &self,
        actor: &Identity,
        names: &[String],
    ) -> Result<AdminDeleteReport> {
        if !self.config.is_admin(&actor.user) {
            return Err(Error::Forbidden("Admin access required".into()));
        }

        let mut report = AdminDeleteReport::default();
        let db = self.db();
        for name in names {
            let rooms = match db.find_rooms_by_name(name) {
                Ok(rooms) => rooms,
                Err(e) => {
                    report.errors.push((name.clone(), e.to_string()));
                    continue;
                }
            };
            if rooms.is_empty() {
                report.errors.push((name.clone(), "Room not found".into()));
                continue;
            }
            for room in rooms {
                match db.delete_room(room.id) {
                    Ok(true) => report.deleted.push((name.clone(), room.id)),
                    Ok(false) => debug!(room_id = %room.id, "Room already gone"),
                    Err(e) => report.errors.push((name.clone(), e.to_string())),
                }
            }
        }

        info!(
            deleted = report.deleted.len(),
            errors = report.errors.len(),
            "Admin bulk delete finished"
        );
        Ok(report)
    }

    /// Recent history, newest first
    #[instrument(skip(self))]
    pub fn history(&self, room_id: Uuid, limit: Option<u32>) -> Result<Vec<HistoryEntry>> {
        let limit = limit
            .unwrap_or(super::DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_PAGE_SIZE);
        let db = self.db();
        load_room(&*db, room_id)?;
        db.list_history(room_id, limit)
    }

    /// Eject a live provider session from a room.
    ///
    /// Unlike the best-effort eject inside `kick`, failures surface here.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub async fn eject_session(
        &self,
        room_id: Uuid,
        actor: &Identity,
        session_id: &str,
    ) -> Result<()> {
        if session_id.trim().is_empty() {
            return Err(Error::Validation("Session id is required".into()));
        }

        let external_url = {
            let db = self.db();
            let room = load_room(&*db, room_id)?;
            if !self.config.is_admin(&actor.user) {
                let role = role_in(&*db, &room, actor.id())?;
                authorize(
                    role,
                    RoomAction::KickMembers,
                    "Only host or co-host can eject sessions",
                )?;
            }
            room.external_url
        };

        self.provider
            .eject_session(&external_url, session_id)
            .await
            .map_err(|e| match e {
                Error::ProviderUnavailable(_) => e,
                other => Error::ProviderUnavailable(other.to_string()),
            })?;
        info!(%room_id, session_id, "Provider session ejected");
        Ok(())
    }
}
