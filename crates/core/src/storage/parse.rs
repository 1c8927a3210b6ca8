//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, Utc};
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::models::{HistoryAction, IdentityKind, SpeakerMode, VoiceQuality};

fn conversion_error<E>(e: E) -> SqlError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {column} value: {value}")]
struct UnknownValue {
    column: &'static str,
    value: String,
}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(conversion_error)
}

/// Parse an optional UUID from a database string column
pub fn parse_uuid_opt(s: Option<String>) -> Result<Option<Uuid>, SqlError> {
    s.map(|s| parse_uuid(&s)).transpose()
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(&s)).transpose()
}

pub fn parse_speaker_mode(s: &str) -> Result<SpeakerMode, SqlError> {
    SpeakerMode::parse(s).ok_or_else(|| {
        conversion_error(UnknownValue {
            column: "speaker_mode",
            value: s.to_string(),
        })
    })
}

/// Unknown qualities fall back to the default rather than failing the read
pub fn parse_voice_quality(s: &str) -> VoiceQuality {
    VoiceQuality::parse(s).unwrap_or_default()
}

pub fn parse_identity_kind(s: &str) -> Result<IdentityKind, SqlError> {
    IdentityKind::parse(s).ok_or_else(|| {
        conversion_error(UnknownValue {
            column: "kind",
            value: s.to_string(),
        })
    })
}

pub fn parse_history_action(s: &str) -> Result<HistoryAction, SqlError> {
    HistoryAction::parse(s).ok_or_else(|| {
        conversion_error(UnknownValue {
            column: "action",
            value: s.to_string(),
        })
    })
}

/// Parse an optional JSON document column
pub fn parse_json_opt(s: Option<String>) -> Result<Option<serde_json::Value>, SqlError> {
    s.map(|s| serde_json::from_str(&s).map_err(conversion_error))
        .transpose()
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
