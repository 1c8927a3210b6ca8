//! Co-hosts, speakers and in-room signals

use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::lifecycle::MAX_PAGE_SIZE;
use super::{authorize, load_room, record, reject_self_target, role_in, RoomService, SpeakRequest};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::models::{CoHost, HistoryAction, HistoryEvent, SpeakerMode, UserSummary};
use crate::permissions::RoomAction;
use crate::storage::Storage;

impl<D: Storage + Send> RoomService<D> {
    /// Durable users whose name starts with `prefix`, for picking co-hosts.
    /// Guests never appear.
    #[instrument(skip(self))]
    pub fn search_users(&self, prefix: &str, limit: u32) -> Result<Vec<UserSummary>> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(Error::Validation("search prefix is required".into()));
        }
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let users = self.db().search_users(prefix, limit)?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    /// Grant co-host. Host only.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub fn add_co_host(&self, room_id: Uuid, actor: &Identity, target: Uuid) -> Result<()> {
        let db = self.db();
        let room = load_room(&*db, room_id)?;
        let role = role_in(&*db, &room, actor.id())?;
        authorize(role, RoomAction::ManageCoHosts, "Only the host can manage co-hosts")?;
        reject_self_target(actor, target, "add as co-host")?;

        if db.find_user_by_id(target)?.is_none() {
            return Err(Error::NotFound(format!("user {target}")));
        }
        if !db.add_co_host(&CoHost::new(room_id, target))? {
            return Err(Error::AlreadyCoHost);
        }
        record(
            &*db,
            HistoryEvent::new(room_id, Some(target), HistoryAction::CoHostAdded)
                .with_details(json!({ "addedBy": actor.id() })),
        );

        info!(%room_id, %target, "Co-host added");
        Ok(())
    }

    /// Revoke co-host. Host only; revoking a missing grant is a no-op.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub fn remove_co_host(&self, room_id: Uuid, actor: &Identity, target: Uuid) -> Result<()> {
        let db = self.db();
        let room = load_room(&*db, room_id)?;
        let role = role_in(&*db, &room, actor.id())?;
        authorize(role, RoomAction::ManageCoHosts, "Only the host can manage co-hosts")?;
        reject_self_target(actor, target, "remove as co-host")?;

        if !db.remove_co_host(room_id, target)? {
            debug!(%room_id, %target, "No co-host grant to remove");
        }
        record(
            &*db,
            HistoryEvent::new(room_id, Some(target), HistoryAction::CoHostRemoved)
                .with_details(json!({ "removedBy": actor.id() })),
        );
        Ok(())
    }

    /// Grant or revoke speaking in a nominated-mode room.
    ///
    /// The mode is checked before the actor, so every role sees `InvalidMode`
    /// in an open room.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub fn set_speaker(
        &self,
        room_id: Uuid,
        actor: &Identity,
        target: Uuid,
        is_speaker: bool,
    ) -> Result<()> {
        let db = self.db();
        let room = load_room(&*db, room_id)?;
        if room.speaker_mode != SpeakerMode::Nominated {
            return Err(Error::InvalidMode);
        }
        let role = role_in(&*db, &room, actor.id())?;
        authorize(
            role,
            RoomAction::ManageSpeakers,
            "Only host or co-host can manage speakers",
        )?;

        if !db.set_speaker(room_id, target, is_speaker)? {
            return Err(Error::NotInRoom);
        }
        let action = if is_speaker {
            HistoryAction::SpeakerNominated
        } else {
            HistoryAction::SpeakerRemoved
        };
        record(
            &*db,
            HistoryEvent::new(room_id, Some(target), action)
                .with_details(json!({ "managedBy": actor.id() })),
        );

        info!(%room_id, %target, is_speaker, "Speaker status changed");
        Ok(())
    }

    /// Ask the hosts for the floor. Only a hint; nothing is queued.
    #[instrument(skip(self, identity), fields(user_id = %identity.id()))]
    pub fn request_to_speak(&self, room_id: Uuid, identity: &Identity) -> Result<SpeakRequest> {
        let db = self.db();
        let room = load_room(&*db, room_id)?;
        if room.speaker_mode != SpeakerMode::Nominated {
            return Err(Error::InvalidMode);
        }

        let participant = db
            .find_participant(room_id, identity.id())?
            .filter(|p| p.is_active())
            .ok_or(Error::NotInRoom)?;
        if participant.is_speaker {
            return Ok(SpeakRequest::AlreadySpeaker);
        }

        record(
            &*db,
            HistoryEvent::new(room_id, Some(identity.id()), HistoryAction::RequestedToSpeak),
        );
        Ok(SpeakRequest::Requested {
            user_id: identity.id(),
            username: identity.display_name.clone(),
        })
    }

    /// Record a mute hint. Muting itself happens in the media client.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub fn set_muted(
        &self,
        room_id: Uuid,
        actor: &Identity,
        target: Uuid,
        muted: bool,
    ) -> Result<()> {
        let db = self.db();
        let room = load_room(&*db, room_id)?;
        let role = role_in(&*db, &room, actor.id())?;
        authorize(
            role,
            RoomAction::MuteMembers,
            "Only host or co-host can mute participants",
        )?;
        if db.find_user_by_id(target)?.is_none() {
            return Err(Error::NotFound(format!("user {target}")));
        }

        let action = if muted {
            HistoryAction::Muted
        } else {
            HistoryAction::Unmuted
        };
        record(
            &*db,
            HistoryEvent::new(room_id, Some(target), action)
                .with_details(json!({ "mutedBy": actor.id() })),
        );
        Ok(())
    }

    /// Send a reaction (raised hand, emoji)
    #[instrument(skip(self, identity), fields(user_id = %identity.id()))]
    pub fn react(&self, room_id: Uuid, identity: &Identity, reaction: &str) -> Result<()> {
        let reaction = reaction.trim();
        if reaction.is_empty() {
            return Err(Error::Validation("reaction is required".into()));
        }

        let db = self.db();
        load_room(&*db, room_id)?;
        let active = db
            .find_participant(room_id, identity.id())?
            .is_some_and(|p| p.is_active());
        if !active {
            return Err(Error::NotInRoom);
        }

        record(
            &*db,
            HistoryEvent::new(room_id, Some(identity.id()), HistoryAction::Reaction)
                .with_details(json!({ "reaction": reaction })),
        );
        Ok(())
    }
}
