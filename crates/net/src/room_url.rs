//! Provider room URL parsing
//!
//! Room URLs look like `https://<domain>.daily.co/<room-name>`. The room
//! name is the last non-empty path segment.

use std::str::FromStr;

use crate::error::{Error, Result};

/// A parsed provider room URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomUrl {
    pub url: String,
    pub room_name: String,
}

impl RoomUrl {
    pub fn parse(s: &str) -> Result<Self> {
        let url = s.trim();
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| Error::InvalidRoomUrl(format!("'{}' is not an http(s) URL", url)))?;

        // Drop query and fragment before splitting the path
        let rest = rest.split(['?', '#']).next().unwrap_or_default();

        let mut segments = rest.split('/');
        let host = segments.next().unwrap_or_default();
        if host.is_empty() {
            return Err(Error::InvalidRoomUrl(format!("'{}' has no host", url)));
        }

        let room_name = segments
            .filter(|s| !s.is_empty())
            .last()
            .ok_or_else(|| Error::InvalidRoomUrl(format!("'{}' has no room name", url)))?;

        Ok(Self {
            url: url.to_string(),
            room_name: room_name.to_string(),
        })
    }
}

impl std::fmt::Display for RoomUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl FromStr for RoomUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Room name from a stored external handle
pub fn room_name_from_url(url: &str) -> Result<String> {
    RoomUrl::parse(url).map(|u| u.room_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_room_url() {
        let url = RoomUrl::parse("https://jeet.daily.co/gm-frens").unwrap();
        assert_eq!(url.room_name, "gm-frens");
        assert_eq!(url.to_string(), "https://jeet.daily.co/gm-frens");
    }

    #[test]
    fn test_parse_trailing_slash_and_query() {
        assert_eq!(
            room_name_from_url("https://jeet.daily.co/gm-frens/").unwrap(),
            "gm-frens"
        );
        assert_eq!(
            room_name_from_url("https://jeet.daily.co/moon?t=abc#x").unwrap(),
            "moon"
        );
        let parsed: RoomUrl = " http://localhost:8080/rooms/abc ".parse().unwrap();
        assert_eq!(parsed.room_name, "abc");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(RoomUrl::parse("jeet.daily.co/room").is_err());
        assert!(RoomUrl::parse("https://jeet.daily.co/").is_err());
        assert!(RoomUrl::parse("https://jeet.daily.co").is_err());
        assert!(RoomUrl::parse("https:///room").is_err());
    }
}
