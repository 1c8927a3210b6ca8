//! Voice room model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{ParticipantInfo, UserSummary};

/// Maximum length of a room name, in characters
pub const MAX_ROOM_NAME_LEN: usize = 100;

/// Smallest capacity a room may have
pub const MIN_CAPACITY: u32 = 2;

/// Who may transmit audio on join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpeakerMode {
    /// Everyone joins unmuted
    #[default]
    Open,
    /// Participants join silent until nominated
    Nominated,
}

impl SpeakerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerMode::Open => "OPEN",
            SpeakerMode::Nominated => "NOMINATED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPEN" => Some(SpeakerMode::Open),
            "NOMINATED" => Some(SpeakerMode::Nominated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceQuality {
    Low,
    Standard,
    #[default]
    High,
}

impl VoiceQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceQuality::Low => "low",
            VoiceQuality::Standard => "standard",
            VoiceQuality::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(VoiceQuality::Low),
            "standard" => Some(VoiceQuality::Standard),
            "high" => Some(VoiceQuality::High),
            _ => None,
        }
    }
}

/// A voice room backed by a hosted media room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_public: bool,
    pub max_participants: u32,
    pub speaker_mode: SpeakerMode,
    pub voice_quality: VoiceQuality,
    pub is_recording: bool,
    /// Blocks new joins only. Defaults to `false` when the column is unset.
    pub is_closed: bool,
    pub host_id: Uuid,
    /// Media provider room URL
    pub external_url: String,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(draft: &NewRoom, capacity: u32, host_id: Uuid, external_url: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_string(),
            description: trimmed_or_none(draft.description.as_deref()),
            category: trimmed_or_none(draft.category.as_deref()),
            is_public: draft.is_public,
            max_participants: capacity,
            speaker_mode: draft.speaker_mode,
            voice_quality: draft.voice_quality,
            is_recording: false,
            is_closed: false,
            host_id,
            external_url,
            created_at: Utc::now(),
        }
    }

    pub fn is_host(&self, user_id: Uuid) -> bool {
        self.host_id == user_id
    }

    /// Speaker flag a participant receives on (re)join
    pub fn initial_speaker_flag(&self) -> bool {
        self.speaker_mode == SpeakerMode::Open
    }

    /// Apply a partial update; fields left as `None` stay untouched
    pub fn apply(&mut self, patch: &RoomPatch) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = trimmed_or_none(description.as_deref());
        }
        if let Some(category) = &patch.category {
            self.category = trimmed_or_none(category.as_deref());
        }
        if let Some(max) = patch.max_participants {
            self.max_participants = max;
        }
        if let Some(mode) = patch.speaker_mode {
            self.speaker_mode = mode;
        }
        if let Some(quality) = patch.voice_quality {
            self.voice_quality = quality;
        }
        if let Some(is_public) = patch.is_public {
            self.is_public = is_public;
        }
    }
}

fn trimmed_or_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Input for creating a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoom {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    /// Falls back to the configured default capacity
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub speaker_mode: SpeakerMode,
    #[serde(default)]
    pub voice_quality: VoiceQuality,
}

fn default_true() -> bool {
    true
}

impl NewRoom {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            category: None,
            is_public: true,
            max_participants: None,
            speaker_mode: SpeakerMode::Open,
            voice_quality: VoiceQuality::High,
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.max_participants = Some(capacity);
        self
    }

    pub fn with_speaker_mode(mut self, mode: SpeakerMode) -> Self {
        self.speaker_mode = mode;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Partial room update. The whitelist of editable fields is the struct itself.
///
/// `description` and `category` are doubly optional: `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_mode: Option<SpeakerMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_quality: Option<VoiceQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// A field that is present deserializes to `Some`, even when it is `null`.
/// Absent fields fall back to `None` through `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl RoomPatch {
    pub fn is_empty(&self) -> bool {
        *self == RoomPatch::default()
    }
}

/// Room with its live roster, as returned by lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDetails {
    pub room: Room,
    pub host: Option<UserSummary>,
    pub participants: Vec<ParticipantInfo>,
    pub co_hosts: Vec<UserSummary>,
}

impl RoomDetails {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}

/// Listing entry for the public room directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub is_closed: bool,
    pub max_participants: u32,
    pub speaker_mode: SpeakerMode,
    pub host: UserSummary,
    pub participant_count: u32,
    pub created_at: DateTime<Utc>,
}

/// A page of the room directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPage {
    pub rooms: Vec<RoomSummary>,
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}
