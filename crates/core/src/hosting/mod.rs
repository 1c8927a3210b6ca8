//! Host resolution for guest-hosted rooms
//!
//! A room created by a guest records that guest as host, but the creator's
//! next request arrives as a freshly minted guest. The fallback here lets a
//! guest requester stand in for a guest host under a configured policy.
//! It is a heuristic and can pick the wrong guest when several join at once.

use uuid::Uuid;

use crate::config::GuestHostFallback;
use crate::models::{ParticipantInfo, Room};

/// How a requester's host claim was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostClaim {
    /// The requester is the recorded host
    Recorded,
    /// The requester stands in for a guest host
    StandIn { participant: Uuid },
    /// Not the host
    Denied,
}

impl HostClaim {
    pub fn is_host(&self) -> bool {
        !matches!(self, HostClaim::Denied)
    }
}

/// Inputs for settling a host claim
#[derive(Debug, Clone, Copy)]
pub struct HostContext<'a> {
    pub room: &'a Room,
    pub host_is_guest: bool,
    /// Active roster ordered by join time, earliest first
    pub roster: &'a [ParticipantInfo],
}

impl<'a> HostContext<'a> {
    /// Settle whether `requester` may act as host
    pub fn claim(
        &self,
        requester: Uuid,
        requester_is_guest: bool,
        policy: GuestHostFallback,
    ) -> HostClaim {
        if self.room.is_host(requester) {
            return HostClaim::Recorded;
        }

        if policy == GuestHostFallback::Disabled || !self.host_is_guest || !requester_is_guest {
            return HostClaim::Denied;
        }

        let Some(first) = self.roster.first() else {
            return HostClaim::Denied;
        };

        // Earliest participant asking in person
        if first.user_id == requester {
            return HostClaim::StandIn {
                participant: first.participant_id,
            };
        }

        if !first.is_guest {
            return HostClaim::Denied;
        }

        let eligible = match policy {
            GuestHostFallback::EarliestActive => true,
            GuestHostFallback::SoleActive => self.roster.len() == 1,
            GuestHostFallback::Disabled => false,
        };

        if eligible {
            HostClaim::StandIn {
                participant: first.participant_id,
            }
        } else {
            HostClaim::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRoom;
    use chrono::{Duration, Utc};

    fn member(is_guest: bool, offset_secs: i64) -> ParticipantInfo {
        ParticipantInfo {
            participant_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            username: if is_guest { "guest_1_abcdefg" } else { "alice" }.to_string(),
            wallet_address: None,
            is_guest,
            is_speaker: true,
            joined_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    fn room() -> Room {
        Room::new(&NewRoom::named("gm"), 10, Uuid::new_v4(), "https://d.co/gm".into())
    }

    #[test]
    fn test_recorded_host() {
        let room = room();
        let ctx = HostContext {
            room: &room,
            host_is_guest: true,
            roster: &[],
        };
        assert_eq!(
            ctx.claim(room.host_id, false, GuestHostFallback::Disabled),
            HostClaim::Recorded
        );
    }

    #[test]
    fn test_sole_guest_stands_in() {
        let room = room();
        let roster = vec![member(true, 0)];
        let ctx = HostContext {
            room: &room,
            host_is_guest: true,
            roster: &roster,
        };

        let claim = ctx.claim(Uuid::new_v4(), true, GuestHostFallback::SoleActive);
        assert!(claim.is_host());
        assert!(!ctx
            .claim(Uuid::new_v4(), true, GuestHostFallback::Disabled)
            .is_host());
        // A durable requester never stands in
        assert!(!ctx
            .claim(Uuid::new_v4(), false, GuestHostFallback::SoleActive)
            .is_host());
    }

    #[test]
    fn test_sole_active_rejects_crowded_room() {
        let room = room();
        let roster = vec![member(true, 0), member(true, 5)];
        let ctx = HostContext {
            room: &room,
            host_is_guest: true,
            roster: &roster,
        };

        assert_eq!(
            ctx.claim(Uuid::new_v4(), true, GuestHostFallback::SoleActive),
            HostClaim::Denied
        );
        assert!(ctx
            .claim(Uuid::new_v4(), true, GuestHostFallback::EarliestActive)
            .is_host());
        // The earliest participant itself always qualifies
        assert!(ctx
            .claim(roster[0].user_id, true, GuestHostFallback::SoleActive)
            .is_host());
    }

    #[test]
    fn test_durable_host_has_no_stand_in() {
        let room = room();
        let roster = vec![member(true, 0)];
        let ctx = HostContext {
            room: &room,
            host_is_guest: false,
            roster: &roster,
        };
        assert!(!ctx
            .claim(Uuid::new_v4(), true, GuestHostFallback::EarliestActive)
            .is_host());
    }

    #[test]
    fn test_durable_first_participant_blocks_fallback() {
        let room = room();
        let roster = vec![member(false, 0)];
        let ctx = HostContext {
            room: &room,
            host_is_guest: true,
            roster: &roster,
        };
        assert!(!ctx
            .claim(Uuid::new_v4(), true, GuestHostFallback::EarliestActive)
            .is_host());
    }
}
