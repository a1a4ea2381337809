//! Wire types for the bridge HTTP contract.
//!
//! Field names follow the bridge's camelCase JSON. Optional fields are
//! genuinely optional on the wire; the accessors below encode the rules
//! callers must apply instead of reading raw fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::ConnectAck;

/// The zero date the bridge sends when it has no expiry information.
pub const ZERO_DATE: &str = "0001-01-01T00:00:00Z";

/// `GET /health` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(default)]
    pub xxdk_ready: bool,
}

/// Tunnel lifecycle as reported by `GET /status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelState {
    #[default]
    Idle,
    Connecting,
    Secure,
}

/// `GET /status` response - the payload the connect flow polls for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub state: TunnelState,
    #[serde(default)]
    pub xxdk_ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Round-trip latency in milliseconds, when the bridge measured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
}

impl StatusResponse {
    /// Whether the tunnel is ready for traffic. Either signal suffices:
    /// bridges in the health-only phase report `xxdkReady`, later phases
    /// report `state: "secure"`.
    pub fn is_ready(&self) -> bool {
        self.xxdk_ready || self.state == TunnelState::Secure
    }
}

/// `POST /connect` success payload.
///
/// The bridge answers with either the minimal body or the richer ack
/// envelope depending on which protocol phase it runs; modeling the two as
/// a union keeps phase-specific fields out of reach of the wrong phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectResponse {
    Ack(ConnectAck),
    Simple { success: bool },
}

impl ConnectResponse {
    /// Collapse both phases into a single success bit.
    pub fn succeeded(&self) -> bool {
        match self {
            ConnectResponse::Simple { success } => *success,
            ConnectResponse::Ack(ack) => ack.ack,
        }
    }
}

impl Default for ConnectResponse {
    fn default() -> Self {
        ConnectResponse::Simple { success: false }
    }
}

/// `GET /unlock/status` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockStatus {
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl UnlockStatus {
    /// Expiry after applying the sentinel rules: a locked session has no
    /// expiry regardless of the wire value, and the zero date (or an
    /// unparseable timestamp) means the TTL is unknown.
    pub fn effective_expiry(&self) -> Option<DateTime<Utc>> {
        if !self.unlocked {
            return None;
        }
        let raw = self.expires_at.as_deref()?;
        if raw == ZERO_DATE {
            return None;
        }
        raw.parse::<DateTime<Utc>>().ok()
    }

    /// Remaining TTL relative to `now`, when a concrete expiry is known.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.effective_expiry().map(|at| at - now)
    }
}

/// `POST /unlock` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

/// `POST /lock` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResponse {
    pub success: bool,
}

/// Error envelope the bridge attaches to non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Default for ErrorBody {
    fn default() -> Self {
        Self {
            error: "unknown".to_string(),
            message: "Request failed".to_string(),
            code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn locked_status_never_has_expiry() {
        for expires_at in [
            None,
            Some(ZERO_DATE.to_string()),
            Some("2099-06-01T12:00:00Z".to_string()),
        ] {
            let status = UnlockStatus {
                unlocked: false,
                expires_at,
            };
            assert_eq!(status.effective_expiry(), None);
        }
    }

    #[test]
    fn unlocked_zero_date_means_unknown_ttl() {
        let status = UnlockStatus {
            unlocked: true,
            expires_at: Some(ZERO_DATE.to_string()),
        };
        assert_eq!(status.effective_expiry(), None);
    }

    #[test]
    fn unlocked_with_real_expiry() {
        let status = UnlockStatus {
            unlocked: true,
            expires_at: Some("2099-06-01T12:00:00Z".to_string()),
        };
        let expected = Utc.with_ymd_and_hms(2099, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(status.effective_expiry(), Some(expected));

        let now = Utc.with_ymd_and_hms(2099, 6, 1, 11, 0, 0).unwrap();
        assert_eq!(status.remaining(now), Some(chrono::Duration::hours(1)));
    }

    #[test]
    fn garbled_expiry_is_unknown_not_fatal() {
        let status = UnlockStatus {
            unlocked: true,
            expires_at: Some("not-a-date".to_string()),
        };
        assert_eq!(status.effective_expiry(), None);
    }

    #[test]
    fn readiness_from_either_signal() {
        let health_phase = StatusResponse {
            state: TunnelState::Idle,
            xxdk_ready: true,
            ..Default::default()
        };
        assert!(health_phase.is_ready());

        let status_phase = StatusResponse {
            state: TunnelState::Secure,
            ..Default::default()
        };
        assert!(status_phase.is_ready());

        let neither = StatusResponse {
            state: TunnelState::Connecting,
            ..Default::default()
        };
        assert!(!neither.is_ready());
    }

    #[test]
    fn connect_response_parses_both_phases() {
        let simple: ConnectResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(simple.succeeded());
        assert!(matches!(simple, ConnectResponse::Simple { .. }));

        let ack: ConnectResponse = serde_json::from_str(
            r#"{
                "v": 1,
                "type": "connect_ack",
                "requestId": "req_1",
                "sessionId": "sess_1",
                "ack": true,
                "status": "connected"
            }"#,
        )
        .unwrap();
        assert!(ack.succeeded());
        assert!(matches!(ack, ConnectResponse::Ack(_)));
    }

    #[test]
    fn status_response_parses_full_payload() {
        let status: StatusResponse = serde_json::from_str(
            r#"{
                "state": "secure",
                "xxdkReady": true,
                "version": "0.4.0",
                "targetUrl": "https://example.com",
                "sessionId": "sess_42",
                "latency": 120
            }"#,
        )
        .unwrap();
        assert_eq!(status.state, TunnelState::Secure);
        assert_eq!(status.target_url.as_deref(), Some("https://example.com"));
        assert_eq!(status.latency, Some(120));
    }

    #[test]
    fn error_body_default_matches_fallback_envelope() {
        let body = ErrorBody::default();
        assert_eq!(body.error, "unknown");
        assert_eq!(body.message, "Request failed");
        assert_eq!(body.code, None);
    }
}
