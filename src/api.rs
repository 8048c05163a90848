//! REST lookups for room identity and connection endpoints.
//!
//! Two read-only endpoints feed the engine: the room identity lookup (which
//! room to join, resolved from a short id if needed) and the room auth lookup
//! (token plus connect-host list). Both wrap their payload in a
//! `{ code, message, ttl, data }` envelope; a nonzero code is a rejection.
//!
//! Host selection and retry policy stay with the caller — the engine consumes
//! the token and one chosen host:port.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, RoomcastError};

/// Path of the room auth lookup, keyed by room id.
const ROOM_AUTH_PATH: &str = "/xlive/web-room/v1/index/getDanmuInfo";

/// Path of the room identity lookup, keyed by room id or short id.
const ROOM_IDENTITY_PATH: &str = "/room/v1/Room/room_init";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Generic REST response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    #[allow(dead_code)]
    #[serde(default)]
    ttl: i64,
    data: Option<T>,
}

/// One connect host offered by the auth lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct HostEntry {
    /// Hostname to connect to.
    pub host: String,
    /// Raw TCP port.
    pub port: u16,
    /// TLS websocket port.
    pub wss_port: u16,
    /// Plaintext websocket port.
    pub ws_port: u16,
}

impl HostEntry {
    /// Port for the chosen transport security.
    pub fn ws_port_for(&self, tls: bool) -> u16 {
        if tls {
            self.wss_port
        } else {
            self.ws_port
        }
    }
}

/// Room auth lookup result: token, host list, and timing hints.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomAuthInfo {
    /// Authorization token for the binary handshake.
    pub token: String,
    /// Candidate connect hosts, caller picks one.
    pub host_list: Vec<HostEntry>,
    /// Token refresh interval hint, seconds.
    #[serde(default)]
    pub refresh_rate: u32,
    /// Jitter factor applied to the refresh interval.
    #[serde(default)]
    pub refresh_row_factor: f64,
    /// Upper bound on refresh delay, seconds.
    #[serde(default)]
    pub max_delay: u32,
}

/// Room identity lookup result.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomIdentity {
    /// Numeric room id (the long form used by the handshake).
    pub room_id: u64,
    /// Short vanity id, 0 when absent.
    #[serde(default)]
    pub short_id: u64,
    /// Owner user id.
    pub uid: u64,
    /// Live status flag (1 = live).
    #[serde(default)]
    pub live_status: i32,
    /// Whether the room is hidden.
    #[serde(default)]
    pub is_hidden: bool,
    /// Whether the room is locked.
    #[serde(default)]
    pub is_locked: bool,
    /// Live-start timestamp, seconds since epoch.
    #[serde(default)]
    pub live_time: i64,
}

impl RoomIdentity {
    /// Whether the room is currently broadcasting.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.live_status == 1
    }
}

/// REST client for the room directory endpoints.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl DirectoryClient {
    /// Create a client against the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: trim_trailing_slash(base_url.into()),
        })
    }

    /// Create a client with a caller-provided `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: trim_trailing_slash(base_url.into()),
        }
    }

    /// Resolve the auth token and connect-host list for a room.
    pub async fn room_auth(&self, room_id: u64) -> Result<RoomAuthInfo> {
        let url = format!("{}{}?id={}", self.base_url, ROOM_AUTH_PATH, room_id);
        let envelope: Envelope<RoomAuthInfo> =
            self.http.get(&url).send().await?.error_for_status()?.json().await?;
        let info = unwrap_envelope(envelope)?;
        debug!(room_id, hosts = info.host_list.len(), "resolved room auth");
        Ok(info)
    }

    /// Resolve a room's identity from its id or short id.
    pub async fn room_identity(&self, room_id: u64) -> Result<RoomIdentity> {
        let url = format!("{}{}?id={}", self.base_url, ROOM_IDENTITY_PATH, room_id);
        let envelope: Envelope<RoomIdentity> =
            self.http.get(&url).send().await?.error_for_status()?.json().await?;
        let identity = unwrap_envelope(envelope)?;
        debug!(room_id = identity.room_id, "resolved room identity");
        Ok(identity)
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T> {
    if envelope.code != 0 {
        return Err(RoomcastError::ApiRejected {
            code: envelope.code,
            message: envelope.message,
        });
    }
    envelope.data.ok_or(RoomcastError::ApiRejected {
        code: 0,
        message: "missing data field".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_payload_parses() {
        let json = r#"{
            "code": 0,
            "message": "ok",
            "ttl": 1,
            "data": {
                "group": "live",
                "business_id": 0,
                "refresh_row_factor": 0.125,
                "refresh_rate": 100,
                "max_delay": 5000,
                "token": "tok-123",
                "host_list": [
                    {"host": "a.example.com", "port": 2243, "wss_port": 443, "ws_port": 2244},
                    {"host": "b.example.com", "port": 2243, "wss_port": 443, "ws_port": 2244}
                ]
            }
        }"#;

        let envelope: Envelope<RoomAuthInfo> = serde_json::from_str(json).unwrap();
        let info = unwrap_envelope(envelope).unwrap();

        assert_eq!(info.token, "tok-123");
        assert_eq!(info.host_list.len(), 2);
        assert_eq!(info.host_list[0].ws_port_for(true), 443);
        assert_eq!(info.host_list[0].ws_port_for(false), 2244);
        assert_eq!(info.refresh_rate, 100);
        assert!((info.refresh_row_factor - 0.125).abs() < f64::EPSILON);
    }

    #[test]
    fn identity_payload_parses() {
        let json = r#"{
            "code": 0,
            "message": "ok",
            "ttl": 1,
            "data": {
                "room_id": 910884,
                "short_id": 3,
                "uid": 11153765,
                "need_p2p": 0,
                "is_hidden": false,
                "is_locked": false,
                "live_status": 1,
                "live_time": 1700000000
            }
        }"#;

        let envelope: Envelope<RoomIdentity> = serde_json::from_str(json).unwrap();
        let identity = unwrap_envelope(envelope).unwrap();

        assert_eq!(identity.room_id, 910884);
        assert_eq!(identity.short_id, 3);
        assert_eq!(identity.uid, 11153765);
        assert!(identity.is_live());
        assert!(!identity.is_hidden);
    }

    #[test]
    fn nonzero_code_is_rejection() {
        let json = r#"{"code": 60004, "message": "room not found", "ttl": 1, "data": null}"#;
        let envelope: Envelope<RoomIdentity> = serde_json::from_str(json).unwrap();

        match unwrap_envelope(envelope) {
            Err(RoomcastError::ApiRejected { code, message }) => {
                assert_eq!(code, 60004);
                assert_eq!(message, "room not found");
            }
            other => panic!("expected rejection, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn base_url_slash_trimmed() {
        assert_eq!(
            trim_trailing_slash("https://api.example.com/".to_string()),
            "https://api.example.com"
        );
        assert_eq!(
            trim_trailing_slash("https://api.example.com".to_string()),
            "https://api.example.com"
        );
    }
}
