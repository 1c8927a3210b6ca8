//! HTTP client for the hosted media provider

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use jeetspace_core::config::ProviderConfig;
use jeetspace_core::{MediaProvider, MediaRoom};

use crate::error::{Error, Result};
use crate::protocol::{
    ApiErrorBody, CreateRoomRequest, EjectRequest, MeetingTokenRequest, RoomProperties,
    RoomResponse, TokenProperties, TokenResponse,
};
use crate::room_url::room_name_from_url;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the provider's REST API
#[derive(Clone)]
pub struct DailyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    token_ttl_hours: i64,
}

impl std::fmt::Debug for DailyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyClient")
            .field("base_url", &self.base_url)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish_non_exhaustive()
    }
}

impl DailyClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(Error::MissingApiKey)?
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            token_ttl_hours: config.token_ttl_hours,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let text = self.send(path, body).await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Protocol(format!("Unexpected response from {}: {}", path, e)))
    }

    async fn send<B>(&self, path: &str, body: &B) -> Result<String>
    where
        B: Serialize + ?Sized,
    {
        let resp = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        debug!(path, status = status.as_u16(), "Provider responded");

        if !status.is_success() {
            return Err(api_error(status, &text));
        }
        Ok(text)
    }

    /// Create a voice room with the given provider-safe name
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str, max_participants: u32) -> Result<MediaRoom> {
        let req = CreateRoomRequest {
            name: name.to_string(),
            properties: RoomProperties::voice(max_participants),
        };
        let room: RoomResponse = self.post("rooms", &req).await?;

        let url = room
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Protocol("Room response is missing its URL".into()))?;

        info!(name = %room.name, %url, "Provider room created");
        Ok(MediaRoom {
            name: room.name,
            url,
        })
    }

    /// Mint a meeting token scoped to one room and user
    #[instrument(skip(self))]
    pub async fn meeting_token(
        &self,
        room_name: &str,
        user_id: Uuid,
        user_name: &str,
    ) -> Result<String> {
        let exp = Utc::now().timestamp() + self.token_ttl_hours * 60 * 60;
        let req = MeetingTokenRequest {
            properties: TokenProperties {
                room_name: room_name.to_string(),
                user_id: user_id.to_string(),
                user_name: user_name.to_string(),
                exp,
            },
        };
        let resp: TokenResponse = self.post("meeting-tokens", &req).await?;
        Ok(resp.token)
    }

    /// Eject live sessions from a room
    #[instrument(skip(self))]
    pub async fn eject(&self, room_name: &str, session_ids: &[&str]) -> Result<()> {
        let req = EjectRequest {
            ids: session_ids.iter().map(|s| s.to_string()).collect(),
        };
        self.send(&format!("rooms/{}/eject", room_name), &req).await?;
        info!(room_name, count = session_ids.len(), "Sessions ejected");
        Ok(())
    }
}

fn api_error(status: StatusCode, body: &str) -> Error {
    Error::Api {
        status: status.as_u16(),
        message: ApiErrorBody::message_from(body),
    }
}

#[async_trait]
impl MediaProvider for DailyClient {
    async fn create_room(
        &self,
        sanitized_name: &str,
        capacity: u32,
    ) -> jeetspace_core::Result<MediaRoom> {
        self.create(sanitized_name, capacity).await.map_err(|e| {
            warn!(name = sanitized_name, "Room creation failed: {}", e);
            jeetspace_core::Error::ProviderUnavailable(e.to_string())
        })
    }

    async fn mint_join_token(
        &self,
        external_url: &str,
        user_id: Uuid,
        display_name: &str,
    ) -> jeetspace_core::Result<String> {
        let unavailable = |e: Error| jeetspace_core::Error::TokenUnavailable(e.to_string());
        let room_name = room_name_from_url(external_url).map_err(unavailable)?;
        self.meeting_token(&room_name, user_id, display_name)
            .await
            .map_err(unavailable)
    }

    async fn eject_session(
        &self,
        external_url: &str,
        session_id: &str,
    ) -> jeetspace_core::Result<()> {
        let unavailable = |e: Error| jeetspace_core::Error::ProviderUnavailable(e.to_string());
        let room_name = room_name_from_url(external_url).map_err(unavailable)?;
        self.eject(&room_name, &[session_id])
            .await
            .map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn config(api_url: &str) -> ProviderConfig {
        ProviderConfig {
            api_url: api_url.to_string(),
            api_key: Some("test-key".to_string()),
            ..ProviderConfig::default()
        }
    }

    /// Serve one canned HTTP response and hand back the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (format!("http://{}/v1", addr), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..split]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= split + 4 + length
    }

    #[test]
    fn test_missing_api_key() {
        let mut cfg = config("https://api.daily.co/v1");
        cfg.api_key = None;
        assert!(matches!(DailyClient::new(&cfg), Err(Error::MissingApiKey)));

        cfg.api_key = Some("   ".into());
        assert!(matches!(DailyClient::new(&cfg), Err(Error::MissingApiKey)));
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let client = DailyClient::new(&config("https://api.daily.co/v1/")).unwrap();
        assert_eq!(client.endpoint("rooms"), "https://api.daily.co/v1/rooms");
        assert_eq!(
            client.endpoint("/meeting-tokens"),
            "https://api.daily.co/v1/meeting-tokens"
        );
    }

    #[tokio::test]
    async fn test_create_room_posts_voice_settings() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"id":"r1","name":"gm-frens","url":"https://jeet.daily.co/gm-frens"}"#,
        )
        .await;
        let client = DailyClient::new(&config(&url)).unwrap();

        let room = client.create_room("gm-frens", 30).await.unwrap();
        assert_eq!(room.name, "gm-frens");
        assert_eq!(room.url, "https://jeet.daily.co/gm-frens");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/rooms "));
        assert!(request.to_lowercase().contains("authorization: bearer test-key"));
        assert!(request.contains(r#""max_participants":30"#));
        assert!(request.contains(r#""start_video_off":true"#));
    }

    #[tokio::test]
    async fn test_create_room_api_error() {
        let (url, server) = serve_once(
            "400 Bad Request",
            r#"{"error":"invalid-request-error","info":"room name taken"}"#,
        )
        .await;
        let client = DailyClient::new(&config(&url)).unwrap();

        let err = client.create("gm-frens", 30).await.unwrap_err();
        match &err {
            Error::Api { status, message } => {
                assert_eq!(*status, 400);
                assert_eq!(message, "invalid-request-error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_create_room_without_url_is_protocol_error() {
        let (url, server) = serve_once("200 OK", r#"{"name":"gm-frens"}"#).await;
        let client = DailyClient::new(&config(&url)).unwrap();

        let err = client.create_room("gm-frens", 30).await.unwrap_err();
        assert!(matches!(err, jeetspace_core::Error::ProviderUnavailable(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_mint_token_uses_room_name_from_url() {
        let (url, server) = serve_once("200 OK", r#"{"token":"tok-123"}"#).await;
        let client = DailyClient::new(&config(&url)).unwrap();
        let user_id = Uuid::new_v4();

        let token = client
            .mint_join_token("https://jeet.daily.co/gm-frens", user_id, "alice")
            .await
            .unwrap();
        assert_eq!(token, "tok-123");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/meeting-tokens "));
        assert!(request.contains(r#""room_name":"gm-frens""#));
        assert!(request.contains(&user_id.to_string()));
    }

    #[tokio::test]
    async fn test_mint_token_bad_url_is_token_unavailable() {
        let client = DailyClient::new(&config("http://127.0.0.1:9/v1")).unwrap();
        let err = client
            .mint_join_token("not a url", Uuid::new_v4(), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, jeetspace_core::Error::TokenUnavailable(_)));
    }

    #[tokio::test]
    async fn test_eject_session() {
        let (url, server) = serve_once("200 OK", r#"{"ejected":["sess-1"]}"#).await;
        let client = DailyClient::new(&config(&url)).unwrap();

        client
            .eject_session("https://jeet.daily.co/gm-frens", "sess-1")
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/rooms/gm-frens/eject "));
        assert!(request.contains(r#"{"ids":["sess-1"]}"#));
    }
}
