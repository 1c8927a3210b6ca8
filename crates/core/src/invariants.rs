//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{Participant, ParticipantInfo, Room, MAX_ROOM_NAME_LEN, MIN_CAPACITY};

/// Validate that a room's state is internally consistent
pub fn assert_room_invariants(room: &Room) {
    debug_assert!(
        !room.name.trim().is_empty() && room.name.chars().count() <= MAX_ROOM_NAME_LEN,
        "Room {} has invalid name {:?}",
        room.id,
        room.name
    );

    debug_assert!(
        room.max_participants >= MIN_CAPACITY,
        "Room {} has capacity {} below minimum",
        room.id,
        room.max_participants
    );

    debug_assert!(
        room.host_id != Uuid::nil(),
        "Room {} has nil host",
        room.id
    );
}

/// Validate a single participant row
pub fn assert_participant_invariants(participant: &Participant) {
    if let Some(left_at) = participant.left_at {
        debug_assert!(
            left_at >= participant.joined_at,
            "Participant {} left before joining",
            participant.id
        );
    }

    debug_assert!(
        participant.user_id != Uuid::nil() && participant.room_id != Uuid::nil(),
        "Participant {} has nil ids",
        participant.id
    );
}

/// Validate that an active roster has one entry per user
pub fn assert_roster_invariants(room: &Room, roster: &[ParticipantInfo]) {
    let unique: HashSet<Uuid> = roster.iter().map(|p| p.user_id).collect();
    debug_assert!(
        unique.len() == roster.len(),
        "Room {} has {} active rows for {} users",
        room.id,
        roster.len(),
        unique.len()
    );

    debug_assert!(
        roster.windows(2).all(|w| w[0].joined_at <= w[1].joined_at),
        "Room {} roster is not ordered by join time",
        room.id
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRoom;
    use chrono::Utc;

    fn info(user_id: Uuid) -> ParticipantInfo {
        ParticipantInfo {
            participant_id: Uuid::new_v4(),
            user_id,
            username: "alice".into(),
            wallet_address: None,
            is_guest: false,
            is_speaker: true,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_room() {
        let room = Room::new(&NewRoom::named("gm"), 2, Uuid::new_v4(), "https://d.co/gm".into());
        assert_room_invariants(&room);
    }

    #[test]
    fn test_left_participant() {
        let mut participant = Participant::new(Uuid::new_v4(), Uuid::new_v4(), false);
        participant.left_at = Some(Utc::now());
        assert_participant_invariants(&participant);
    }

    #[test]
    fn test_distinct_roster() {
        let room = Room::new(&NewRoom::named("gm"), 10, Uuid::new_v4(), "https://d.co/gm".into());
        let roster = vec![info(Uuid::new_v4()), info(Uuid::new_v4())];
        assert_roster_invariants(&room, &roster);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "active rows")]
    fn test_duplicate_active_rows() {
        let room = Room::new(&NewRoom::named("gm"), 10, Uuid::new_v4(), "https://d.co/gm".into());
        let user = Uuid::new_v4();
        assert_roster_invariants(&room, &[info(user), info(user)]);
    }
}
