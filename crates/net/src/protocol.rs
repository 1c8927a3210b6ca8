//! Provider REST payloads
//!
//! All bodies are JSON. Field names follow the provider's snake_case API.

use serde::{Deserialize, Serialize};

/// `POST /rooms`
#[derive(Debug, Clone, Serialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub properties: RoomProperties,
}

/// Audio-first room settings
#[derive(Debug, Clone, Serialize)]
pub struct RoomProperties {
    pub max_participants: u32,
    pub enable_chat: bool,
    pub enable_prejoin_ui: bool,
    pub start_video_off: bool,
    pub enable_screenshare: bool,
    pub enable_echo_cancellation: bool,
    pub enable_noise_suppression: bool,
    pub enable_automatic_gain_control: bool,
}

impl RoomProperties {
    /// Voice room defaults: no prejoin camera prompt, video off, audio cleanup on
    pub fn voice(max_participants: u32) -> Self {
        Self {
            max_participants,
            enable_chat: true,
            enable_prejoin_ui: false,
            start_video_off: true,
            enable_screenshare: false,
            enable_echo_cancellation: true,
            enable_noise_suppression: true,
            enable_automatic_gain_control: true,
        }
    }
}

/// Room as returned by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct RoomResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// `POST /meeting-tokens`
#[derive(Debug, Clone, Serialize)]
pub struct MeetingTokenRequest {
    pub properties: TokenProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenProperties {
    pub room_name: String,
    pub user_id: String,
    pub user_name: String,
    /// Expiry as unix seconds
    pub exp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `POST /rooms/{name}/eject`
#[derive(Debug, Clone, Serialize)]
pub struct EjectRequest {
    pub ids: Vec<String>,
}

/// Error body. The provider is inconsistent about which field it fills.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Best human-readable message from a raw error response
    pub fn message_from(raw: &str) -> String {
        let parsed: ApiErrorBody = serde_json::from_str(raw).unwrap_or_default();
        parsed
            .error
            .or(parsed.message)
            .or(parsed.info)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                let raw = raw.trim();
                if raw.is_empty() {
                    "Unknown error".to_string()
                } else {
                    raw.chars().take(500).collect()
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_room_body() {
        let req = CreateRoomRequest {
            name: "gm-frens".into(),
            properties: RoomProperties::voice(25),
        };
        let body = serde_json::to_value(&req).unwrap();

        assert_eq!(body["name"], "gm-frens");
        assert_eq!(body["properties"]["max_participants"], 25);
        assert_eq!(body["properties"]["enable_prejoin_ui"], false);
        assert_eq!(body["properties"]["start_video_off"], true);
        assert_eq!(body["properties"]["enable_noise_suppression"], true);
    }

    #[test]
    fn test_token_body() {
        let req = MeetingTokenRequest {
            properties: TokenProperties {
                room_name: "gm-frens".into(),
                user_id: "u1".into(),
                user_name: "alice".into(),
                exp: 1_700_000_000,
            },
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"properties": {
                "room_name": "gm-frens",
                "user_id": "u1",
                "user_name": "alice",
                "exp": 1_700_000_000
            }})
        );
    }

    #[test]
    fn test_room_response_tolerates_missing_fields() {
        let room: RoomResponse = serde_json::from_str(r#"{"name":"abc","extra":1}"#).unwrap();
        assert_eq!(room.name, "abc");
        assert!(room.url.is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            ApiErrorBody::message_from(r#"{"error":"invalid-request-error","info":"x"}"#),
            "invalid-request-error"
        );
        assert_eq!(ApiErrorBody::message_from(r#"{"info":"bad name"}"#), "bad name");
        assert_eq!(ApiErrorBody::message_from("gateway timeout"), "gateway timeout");
        assert_eq!(ApiErrorBody::message_from(""), "Unknown error");
    }
}
