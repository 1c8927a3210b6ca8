//! Membership: join, leave, kick, ban

use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    authorize, load_room, record, reject_self_target, role_in, JoinOutcome, KickOutcome,
    RoomService, AUTO_BAN_KICKS,
};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::invariants::assert_participant_invariants;
use crate::models::{BannedUser, HistoryAction, HistoryEvent, ParticipantStatus};
use crate::permissions::{PermissionMatrix, RoomAction};
use crate::storage::{Storage, Upsert};

impl<D: Storage + Send> RoomService<D> {
    /// Join a room.
    ///
    /// Rejects closed, banned and full in that order. An already-active
    /// member gets the existing row back without being counted twice. The
    /// join token and the participant upsert run concurrently; a token
    /// failure leaves the join in place with no token.
    #[instrument(skip(self, identity), fields(user_id = %identity.id()))]
    pub async fn join(&self, room_id: Uuid, identity: &Identity) -> Result<JoinOutcome> {
        let user_id = identity.id();

        let (room, existing) = {
            let db = self.db();
            let room = load_room(&*db, room_id)?;
            let existing = db
                .find_participant(room_id, user_id)?
                .filter(|p| p.is_active());

            if existing.is_none() {
                if room.is_closed {
                    return Err(Error::Closed);
                }
                if db.find_ban(room_id, user_id)?.is_some() {
                    return Err(Error::Banned);
                }
                if db.count_active_participants(room_id)? >= room.max_participants {
                    return Err(Error::Full);
                }
            }
            (room, existing)
        };

        let token_fut = self
            .provider
            .mint_join_token(&room.external_url, user_id, &identity.display_name);

        let upsert_fut = async {
            if let Some(participant) = existing.clone() {
                return Ok::<_, Error>((participant, Upsert::AlreadyActive));
            }
            let db = self.db();
            // Capacity again under the same lock as the write
            let upserted = db.upsert_participant(room_id, user_id, room.initial_speaker_flag())?;
            if upserted.1 != Upsert::AlreadyActive
                && db.count_active_participants(room_id)? > room.max_participants
            {
                db.mark_participant_left(room_id, user_id)?;
                return Err(Error::Full);
            }
            Ok::<_, Error>(upserted)
        };

        let (token, upserted) = tokio::join!(token_fut, upsert_fut);
        let (participant, outcome) = upserted?;
        assert_participant_invariants(&participant);

        let token = match token {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(%room_id, %user_id, error = %e, "Join token unavailable");
                None
            }
        };

        let already_joined = outcome == Upsert::AlreadyActive;
        if already_joined {
            debug!(%room_id, %user_id, "Already an active participant");
        } else {
            let db = self.db();
            record(
                &*db,
                HistoryEvent::new(room_id, Some(user_id), HistoryAction::Joined).with_details(
                    json!({
                        "speakerMode": room.speaker_mode.as_str(),
                        "isSpeaker": participant.is_speaker,
                    }),
                ),
            );
            info!(%room_id, %user_id, rejoin = outcome == Upsert::Reactivated, "Joined room");
        }

        Ok(JoinOutcome {
            room,
            participant,
            token,
            already_joined,
        })
    }

    /// Leave a room. Safe to fire without awaiting a response.
    #[instrument(skip(self, identity), fields(user_id = %identity.id()))]
    pub fn leave(&self, room_id: Uuid, identity: &Identity) -> Result<()> {
        let db = self.db();
        if !db.mark_participant_left(room_id, identity.id())? {
            return Err(Error::NotInRoom);
        }
        debug!(%room_id, "Left room");
        Ok(())
    }

    /// Speaker flag and activity of a user in a room
    #[instrument(skip(self))]
    pub fn participant_status(&self, room_id: Uuid, user_id: Uuid) -> Result<ParticipantStatus> {
        let participant = self.db().find_participant(room_id, user_id)?;
        participant
            .as_ref()
            .map(ParticipantStatus::from)
            .ok_or_else(|| Error::NotFound("Participant not found".into()))
    }

    /// Kick an active participant.
    ///
    /// The kick count comes from durable history; reaching `AUTO_BAN_KICKS`
    /// bans the target. `provider_session` is the target's live media
    /// session, if the caller knows it; ejecting it is best-effort.
    #[instrument(skip(self, actor, provider_session), fields(actor_id = %actor.id()))]
    pub async fn kick(
        &self,
        room_id: Uuid,
        actor: &Identity,
        target: Uuid,
        provider_session: Option<&str>,
    ) -> Result<KickOutcome> {
        reject_self_target(actor, target, "kick")?;

        let (external_url, kick_count, auto_banned) = {
            let db = self.db();
            let room = load_room(&*db, room_id)?;
            let actor_role = role_in(&*db, &room, actor.id())?;
            authorize(
                actor_role,
                RoomAction::KickMembers,
                "Only host or co-host can kick participants",
            )?;
            let target_role = role_in(&*db, &room, target)?;
            if !PermissionMatrix::can_target(actor_role, target_role) {
                return Err(Error::Forbidden("You cannot kick the host".into()));
            }

            let active = db
                .find_participant(room_id, target)?
                .is_some_and(|p| p.is_active());
            if !active {
                return Err(Error::NotFound("Participant not found in room".into()));
            }

            // Every read happens before the first write
            let prior = db.count_history_actions(room_id, target, HistoryAction::Kicked)?;
            let kick_count = prior + 1;
            let auto_banned = kick_count >= AUTO_BAN_KICKS;
            let reason = format!("Kicked {kick_count} times");
            let ban = auto_banned.then(|| BannedUser::new(room_id, target, Some(reason.clone())));

            if !db.remove_member(room_id, target, ban.as_ref())? {
                return Err(Error::NotFound("Participant not found in room".into()));
            }
            record(
                &*db,
                HistoryEvent::new(room_id, Some(target), HistoryAction::Kicked).with_details(
                    json!({ "kickedBy": actor.id(), "kickCount": kick_count }),
                ),
            );

            if auto_banned {
                record(
                    &*db,
                    HistoryEvent::new(room_id, Some(target), HistoryAction::Banned).with_details(
                        json!({ "bannedBy": actor.id(), "reason": reason, "automatic": true }),
                    ),
                );
                info!(%room_id, %target, kick_count, "Auto-banned after repeated kicks");
            }

            (room.external_url, kick_count, auto_banned)
        };

        let ejected = match provider_session {
            Some(session_id) => match self.provider.eject_session(&external_url, session_id).await
            {
                Ok(()) => true,
                Err(e) => {
                    warn!(%room_id, %target, error = %e, "Provider eject failed");
                    false
                }
            },
            None => false,
        };

        info!(%room_id, %target, kick_count, "Participant kicked");
        Ok(KickOutcome {
            kick_count,
            auto_banned,
            ejected,
        })
    }

    /// Ban a user from a room, ending any active membership
    #[instrument(skip(self, actor, reason), fields(actor_id = %actor.id()))]
    pub fn ban(
        &self,
        room_id: Uuid,
        actor: &Identity,
        target: Uuid,
        reason: Option<String>,
    ) -> Result<()> {
        reject_self_target(actor, target, "ban")?;

        let db = self.db();
        let room = load_room(&*db, room_id)?;
        let actor_role = role_in(&*db, &room, actor.id())?;
        authorize(
            actor_role,
            RoomAction::BanMembers,
            "Only host or co-host can ban users",
        )?;
        if !PermissionMatrix::can_target(actor_role, role_in(&*db, &room, target)?) {
            return Err(Error::Forbidden("You cannot ban the host".into()));
        }
        if db.find_user_by_id(target)?.is_none() {
            return Err(Error::NotFound(format!("user {target}")));
        }
        if db.find_ban(room_id, target)?.is_some() {
            return Err(Error::AlreadyBanned);
        }

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        db.mark_participant_left(room_id, target)?;
        if !db.insert_ban(&BannedUser::new(room_id, target, reason.clone()))? {
            return Err(Error::AlreadyBanned);
        }
        record(
            &*db,
            HistoryEvent::new(room_id, Some(target), HistoryAction::Banned)
                .with_details(json!({ "bannedBy": actor.id(), "reason": reason })),
        );

        info!(%room_id, %target, "User banned");
        Ok(())
    }

    /// Lift a ban. A missing ban is not an error.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id()))]
    pub fn unban(&self, room_id: Uuid, actor: &Identity, target: Uuid) -> Result<()> {
        reject_self_target(actor, target, "unban")?;

        let db = self.db();
        let room = load_room(&*db, room_id)?;
        let role = role_in(&*db, &room, actor.id())?;
        authorize(role, RoomAction::BanMembers, "Only host or co-host can unban users")?;

        if !db.remove_ban(room_id, target)? {
            debug!(%room_id, %target, "No ban to lift");
        }
        record(
            &*db,
            HistoryEvent::new(room_id, Some(target), HistoryAction::Unbanned)
                .with_details(json!({ "unbannedBy": actor.id() })),
        );
        Ok(())
    }
}
