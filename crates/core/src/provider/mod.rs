//! Media room provider contract
//!
//! The hosted SFU behind voice rooms. The room service only needs these
//! three calls; the HTTP client lives in `jeetspace-net`.
//!
//! ```text
//! RoomService
//!       |
//!       v
//! MediaProvider (trait)
//!       |
//!       +---> DailyClient (jeetspace-net)
//!       |
//!       +---> FakeProvider (tests)
//! ```

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

#[cfg(test)]
pub(crate) mod fake;

/// A room allocated on the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRoom {
    /// Provider-side room name
    pub name: String,
    /// Join URL, stored as the room's external handle
    pub url: String,
}

#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Allocate a remote room. Failures map to `Error::ProviderUnavailable`.
    async fn create_room(&self, sanitized_name: &str, capacity: u32) -> Result<MediaRoom>;

    /// Mint a per-user join token. Failures map to `Error::TokenUnavailable`.
    async fn mint_join_token(
        &self,
        external_url: &str,
        user_id: Uuid,
        display_name: &str,
    ) -> Result<String>;

    /// Forcibly eject a live media session
    async fn eject_session(&self, external_url: &str, session_id: &str) -> Result<()>;
}

/// Provider-safe room name.
///
/// Lowercase, whitespace to `-`, only `[a-z0-9-]`, no repeated or
/// edge hyphens. Falls back to a timestamp name when nothing survives.
pub fn sanitize_room_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        let c = if c.is_whitespace() { '-' } else { c };
        let keep = c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';
        if !keep || (c == '-' && out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        format!("room-{}", Utc::now().timestamp_millis())
    } else {
        trimmed.to_string()
    }
}
