//! Phase-D control-channel messages.
//!
//! The richer connect protocol exchanges a client `connect_intent` and a
//! server `connect_ack` over the bridge. Both sides carry the schema
//! version so the wire format can evolve; request and session ids are
//! client-generated and must round-trip unchanged.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current control-message schema version.
pub const SCHEMA_VERSION: u8 = 1;

const INTENT_TYPE: &str = "connect_intent";
const ACK_TYPE: &str = "connect_ack";

/// Client -> server request to open a private connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectIntent {
    pub v: u8,
    #[serde(rename = "type")]
    pub message_type: String,
    /// Client-generated, unique per attempt.
    pub request_id: String,
    /// Client-generated session identifier for this connection attempt.
    pub session_id: String,
    /// URL the user asked to reach.
    pub target_url: String,
    /// ISO 8601 client clock reading.
    pub client_time: String,
}

impl ConnectIntent {
    /// Build a fresh intent for `target_url` with new request/session ids.
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            v: SCHEMA_VERSION,
            message_type: INTENT_TYPE.to_string(),
            request_id: format!("req_{}", short_id()),
            session_id: format!("sess_{}", short_id()),
            target_url: target_url.into(),
            client_time: Utc::now().to_rfc3339(),
        }
    }
}

/// Server -> client confirmation (or rejection) of a connect intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectAck {
    pub v: u8,
    #[serde(rename = "type")]
    pub message_type: String,
    /// Must match the intent's request id.
    pub request_id: String,
    /// Must match the intent's session id. Some bridge builds omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// True only when the connection was accepted.
    pub ack: bool,
    pub status: AckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ConnectErrorCode>,
}

/// Outcome field of a [`ConnectAck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Connected,
    Error,
}

/// Error codes a bridge may return in a rejected ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectErrorCode {
    InvalidUrl,
    InvalidMessage,
    ServerBusy,
    Timeout,
    NetworkError,
}

/// Why an ack failed validation against its intent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AckValidationError {
    #[error("Invalid message type")]
    WrongType,
    #[error("Request ID mismatch")]
    RequestIdMismatch,
    #[error("Session ID mismatch")]
    SessionIdMismatch,
    #[error("Connection rejected: {0}")]
    Rejected(String),
}

/// Check that `ack` answers `intent` and confirms the connection.
pub fn validate_ack(intent: &ConnectIntent, ack: &ConnectAck) -> Result<(), AckValidationError> {
    if ack.message_type != ACK_TYPE {
        return Err(AckValidationError::WrongType);
    }
    if ack.request_id != intent.request_id {
        return Err(AckValidationError::RequestIdMismatch);
    }
    if let Some(session_id) = &ack.session_id {
        if *session_id != intent.session_id {
            return Err(AckValidationError::SessionIdMismatch);
        }
    }
    if !ack.ack {
        let reason = ack
            .error_code
            .map(|code| format!("{code:?}"))
            .unwrap_or_else(|| "rejected by bridge".to_string());
        return Err(AckValidationError::Rejected(reason));
    }
    Ok(())
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ack_for(intent: &ConnectIntent) -> ConnectAck {
        ConnectAck {
            v: SCHEMA_VERSION,
            message_type: ACK_TYPE.to_string(),
            request_id: intent.request_id.clone(),
            session_id: Some(intent.session_id.clone()),
            ack: true,
            status: AckStatus::Connected,
            server_time: None,
            error_code: None,
        }
    }

    #[test]
    fn fresh_intents_get_unique_ids() {
        let a = ConnectIntent::new("https://example.com");
        let b = ConnectIntent::new("https://example.com");
        assert_ne!(a.request_id, b.request_id);
        assert_ne!(a.session_id, b.session_id);
        assert!(a.request_id.starts_with("req_"));
        assert!(a.session_id.starts_with("sess_"));
        assert_eq!(a.v, SCHEMA_VERSION);
    }

    #[test]
    fn matching_ack_validates() {
        let intent = ConnectIntent::new("https://example.com");
        assert_eq!(validate_ack(&intent, &ack_for(&intent)), Ok(()));
    }

    #[test]
    fn ack_without_session_id_still_validates() {
        let intent = ConnectIntent::new("https://example.com");
        let mut ack = ack_for(&intent);
        ack.session_id = None;
        assert_eq!(validate_ack(&intent, &ack), Ok(()));
    }

    #[test]
    fn mismatched_ids_are_rejected() {
        let intent = ConnectIntent::new("https://example.com");

        let mut wrong_request = ack_for(&intent);
        wrong_request.request_id = "req_other".to_string();
        assert_eq!(
            validate_ack(&intent, &wrong_request),
            Err(AckValidationError::RequestIdMismatch)
        );

        let mut wrong_session = ack_for(&intent);
        wrong_session.session_id = Some("sess_other".to_string());
        assert_eq!(
            validate_ack(&intent, &wrong_session),
            Err(AckValidationError::SessionIdMismatch)
        );
    }

    #[test]
    fn negative_ack_carries_error_code() {
        let intent = ConnectIntent::new("https://example.com");
        let mut ack = ack_for(&intent);
        ack.ack = false;
        ack.status = AckStatus::Error;
        ack.error_code = Some(ConnectErrorCode::ServerBusy);
        match validate_ack(&intent, &ack) {
            Err(AckValidationError::Rejected(reason)) => assert!(reason.contains("ServerBusy")),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn ack_wire_format_round_trips() {
        let json = r#"{
            "v": 1,
            "type": "connect_ack",
            "requestId": "req_abc12345",
            "sessionId": "sess_def67890",
            "ack": true,
            "status": "connected",
            "serverTime": "2026-01-01T00:00:00Z"
        }"#;
        let ack: ConnectAck = serde_json::from_str(json).unwrap();
        assert_eq!(ack.message_type, "connect_ack");
        assert_eq!(ack.status, AckStatus::Connected);
        assert_eq!(ack.session_id.as_deref(), Some("sess_def67890"));

        let back = serde_json::to_value(&ack).unwrap();
        assert_eq!(back["requestId"], "req_abc12345");
        assert_eq!(back["type"], "connect_ack");
    }

    #[test]
    fn error_codes_use_wire_spelling() {
        let json = serde_json::to_string(&ConnectErrorCode::InvalidUrl).unwrap();
        assert_eq!(json, "\"INVALID_URL\"");
    }
}
