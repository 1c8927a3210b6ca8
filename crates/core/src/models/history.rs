//! Append-only room history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actions recorded in a room's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    RoomCreated,
    RoomEdited,
    RoomClosed,
    RoomOpened,
    Joined,
    Kicked,
    Banned,
    Unbanned,
    CoHostAdded,
    CoHostRemoved,
    RecordingStarted,
    RecordingStopped,
    SpeakerNominated,
    SpeakerRemoved,
    RequestedToSpeak,
    Muted,
    Unmuted,
    Reaction,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::RoomCreated => "room_created",
            HistoryAction::RoomEdited => "room_edited",
            HistoryAction::RoomClosed => "room_closed",
            HistoryAction::RoomOpened => "room_opened",
            HistoryAction::Joined => "joined",
            HistoryAction::Kicked => "kicked",
            HistoryAction::Banned => "banned",
            HistoryAction::Unbanned => "unbanned",
            HistoryAction::CoHostAdded => "co_host_added",
            HistoryAction::CoHostRemoved => "co_host_removed",
            HistoryAction::RecordingStarted => "recording_started",
            HistoryAction::RecordingStopped => "recording_stopped",
            HistoryAction::SpeakerNominated => "speaker_nominated",
            HistoryAction::SpeakerRemoved => "speaker_removed",
            HistoryAction::RequestedToSpeak => "requested_to_speak",
            HistoryAction::Muted => "muted",
            HistoryAction::Unmuted => "unmuted",
            HistoryAction::Reaction => "reaction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|a| a.as_str() == value)
    }

    pub fn all() -> &'static [HistoryAction] {
        &[
            HistoryAction::RoomCreated,
            HistoryAction::RoomEdited,
            HistoryAction::RoomClosed,
            HistoryAction::RoomOpened,
            HistoryAction::Joined,
            HistoryAction::Kicked,
            HistoryAction::Banned,
            HistoryAction::Unbanned,
            HistoryAction::CoHostAdded,
            HistoryAction::CoHostRemoved,
            HistoryAction::RecordingStarted,
            HistoryAction::RecordingStopped,
            HistoryAction::SpeakerNominated,
            HistoryAction::SpeakerRemoved,
            HistoryAction::RequestedToSpeak,
            HistoryAction::Muted,
            HistoryAction::Unmuted,
            HistoryAction::Reaction,
        ]
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A write-once history row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub id: Uuid,
    pub room_id: Uuid,
    /// Subject of the action (the kicked user, the new co-host, ...)
    pub user_id: Option<Uuid>,
    pub action: HistoryAction,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEvent {
    pub fn new(room_id: Uuid, user_id: Option<Uuid>, action: HistoryAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            user_id,
            action,
            details: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// History row joined with the subject's username, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub event: HistoryEvent,
    pub username: Option<String>,
}
