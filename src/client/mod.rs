//! Bridge transport seam.
//!
//! [`BridgeTransport`] is the trait both state machines drive. The real
//! implementation is [`HttpBridgeClient`]; [`MockBridgeClient`] serves
//! offline use and tests with scripted responses.

use async_trait::async_trait;

use crate::error::BridgeError;

pub mod http;
pub mod mock;
pub mod types;

pub use http::HttpBridgeClient;
pub use mock::MockBridgeClient;
pub use types::{
    ConnectResponse, ErrorBody, HealthResponse, LockResponse, StatusResponse, TunnelState,
    UnlockResponse, UnlockStatus,
};

/// Supplies the bearer token attached to bridge requests.
///
/// Absence of a token is not an error - anonymous calls are permitted where
/// the bridge allows them. Implementations are queried per call, so token
/// rotation is picked up naturally without any client-side cache.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// Fixed token, for tests and service accounts.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// No authentication.
pub struct Anonymous;

#[async_trait]
impl TokenProvider for Anonymous {
    async fn access_token(&self) -> Option<String> {
        None
    }
}

/// Operations the bridge exposes to this client.
///
/// No retries happen at this layer and no call holds state between
/// invocations; retry loops and state transitions are caller concerns.
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    /// `GET /health`
    async fn health(&self) -> Result<HealthResponse, BridgeError>;

    /// `POST /connect`
    async fn connect(&self, target_url: &str) -> Result<ConnectResponse, BridgeError>;

    /// `GET /status`
    async fn status(&self) -> Result<StatusResponse, BridgeError>;

    /// `POST /unlock`
    async fn unlock(&self, password: &str) -> Result<UnlockResponse, BridgeError>;

    /// `POST /lock`
    async fn lock(&self) -> Result<LockResponse, BridgeError>;

    /// `GET /unlock/status`
    async fn unlock_status(&self) -> Result<UnlockStatus, BridgeError>;
}
