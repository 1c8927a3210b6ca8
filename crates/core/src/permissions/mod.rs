//! Permission system for room operations

use crate::models::RoomRole;

/// Actions that can be performed in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    // Room management
    DeleteRoom,
    EditRoom,
    ToggleClosed,
    ControlRecording,

    // Roles
    ManageCoHosts,
    ManageSpeakers,

    // Member management
    KickMembers,
    BanMembers,
    MuteMembers,

    // Participation
    RequestToSpeak,
    React,
}

/// Permission matrix for room roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: RoomRole, action: RoomAction) -> bool {
        match action {
            // Structural - Host only
            RoomAction::DeleteRoom => role == RoomRole::Host,
            RoomAction::EditRoom => role == RoomRole::Host,
            RoomAction::ManageCoHosts => role == RoomRole::Host,

            // Moderation - Host and co-hosts
            RoomAction::ToggleClosed => role >= RoomRole::CoHost,
            RoomAction::ControlRecording => role >= RoomRole::CoHost,
            RoomAction::ManageSpeakers => role >= RoomRole::CoHost,
            RoomAction::KickMembers => role >= RoomRole::CoHost,
            RoomAction::BanMembers => role >= RoomRole::CoHost,
            RoomAction::MuteMembers => role >= RoomRole::CoHost,

            // Anyone in the room
            RoomAction::RequestToSpeak => role >= RoomRole::Participant,
            RoomAction::React => role >= RoomRole::Participant,
        }
    }

    /// Check if a moderator may act against a target (kick, ban).
    ///
    /// Nobody may target the host; self-targeting is rejected separately.
    pub fn can_target(actor_role: RoomRole, target_role: RoomRole) -> bool {
        if target_role == RoomRole::Host {
            return false;
        }

        actor_role.is_moderator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_permissions() {
        assert!(PermissionMatrix::can_perform(RoomRole::Host, RoomAction::DeleteRoom));
        assert!(PermissionMatrix::can_perform(RoomRole::Host, RoomAction::ManageCoHosts));
        assert!(PermissionMatrix::can_perform(RoomRole::Host, RoomAction::KickMembers));
    }

    #[test]
    fn test_co_host_permissions() {
        assert!(!PermissionMatrix::can_perform(RoomRole::CoHost, RoomAction::DeleteRoom));
        assert!(!PermissionMatrix::can_perform(RoomRole::CoHost, RoomAction::ManageCoHosts));
        assert!(!PermissionMatrix::can_perform(RoomRole::CoHost, RoomAction::EditRoom));
        assert!(PermissionMatrix::can_perform(RoomRole::CoHost, RoomAction::ToggleClosed));
        assert!(PermissionMatrix::can_perform(RoomRole::CoHost, RoomAction::ControlRecording));
        assert!(PermissionMatrix::can_perform(RoomRole::CoHost, RoomAction::BanMembers));
    }

    #[test]
    fn test_participant_permissions() {
        assert!(PermissionMatrix::can_perform(RoomRole::Participant, RoomAction::React));
        assert!(!PermissionMatrix::can_perform(RoomRole::Participant, RoomAction::KickMembers));
        assert!(!PermissionMatrix::can_perform(RoomRole::Visitor, RoomAction::RequestToSpeak));
    }

    #[test]
    fn test_targeting() {
        // Co-host cannot touch the host
        assert!(!PermissionMatrix::can_target(RoomRole::CoHost, RoomRole::Host));
        // Host can remove a co-host
        assert!(PermissionMatrix::can_target(RoomRole::Host, RoomRole::CoHost));
        assert!(PermissionMatrix::can_target(RoomRole::CoHost, RoomRole::Participant));
        // Plain participants cannot moderate
        assert!(!PermissionMatrix::can_target(RoomRole::Participant, RoomRole::Visitor));
    }
}
