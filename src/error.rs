//! Bridge error taxonomy.
//!
//! Every failure surfaced by the bridge client is a [`BridgeError`]. The
//! session-locked case is distinguished from everything else: it is the only
//! error that should send the caller back to re-authentication rather than
//! an inline retry.

use thiserror::Error;

/// Error code the bridge attaches to a 403 when the identity session has
/// lapsed mid-use.
pub const SESSION_LOCKED_CODE: &str = "session_locked";

/// Message substrings that mark a textual bridge error as network-class
/// when the transport layer gives us nothing more structured to go on.
const NETWORK_MARKERS: &[&str] = &[
    "network",
    "timeout",
    "unreachable",
    "failed to fetch",
    "connection",
];

/// Errors produced by bridge calls.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// HTTP 403 with body `code: "session_locked"`. The identity session
    /// must be unlocked before the operation can proceed.
    #[error("{message}")]
    SessionLocked {
        code: String,
        status: u16,
        message: String,
    },

    /// Any other non-2xx response. The message carries the server's
    /// `X-Correlation-Id` as a `(ref: <id>)` suffix when one was returned.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Transport failure before a response was produced.
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BridgeError {
    /// True for the distinguished session-locked error.
    pub fn is_session_locked(&self) -> bool {
        matches!(self, BridgeError::SessionLocked { .. })
    }

    /// Whether this failure means "bridge unreachable, retry later" rather
    /// than "re-authenticate". Transport errors are network-class
    /// structurally; textual bridge errors fall back to message sniffing.
    pub fn is_network_class(&self) -> bool {
        match self {
            BridgeError::Network(_) => true,
            BridgeError::SessionLocked { .. } => false,
            BridgeError::Http { message, .. } | BridgeError::InvalidResponse(message) => {
                let lower = message.to_lowercase();
                NETWORK_MARKERS.iter().any(|marker| lower.contains(marker))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_network_class() {
        let err = BridgeError::Network("connection refused".to_string());
        assert!(err.is_network_class());
        assert!(!err.is_session_locked());
    }

    #[test]
    fn session_locked_is_never_network_class() {
        let err = BridgeError::SessionLocked {
            code: SESSION_LOCKED_CODE.to_string(),
            status: 403,
            message: "Identity session is locked. Call POST /unlock first.".to_string(),
        };
        assert!(err.is_session_locked());
        assert!(!err.is_network_class());
    }

    #[test]
    fn textual_errors_classify_by_message() {
        let offline = BridgeError::Http {
            status: 502,
            message: "upstream timeout".to_string(),
        };
        assert!(offline.is_network_class());

        let auth = BridgeError::Http {
            status: 401,
            message: "invalid_password".to_string(),
        };
        assert!(!auth.is_network_class());

        let fetch = BridgeError::InvalidResponse("Failed to Fetch".to_string());
        assert!(fetch.is_network_class());
    }

    #[test]
    fn display_uses_server_message() {
        let err = BridgeError::Http {
            status: 500,
            message: "internal error (ref: ab12cd34)".to_string(),
        };
        assert_eq!(err.to_string(), "internal error (ref: ab12cd34)");
    }
}
