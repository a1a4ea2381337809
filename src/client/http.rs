//! HTTP implementation of the bridge transport.
//!
//! Each call is independent: the token is re-fetched, a correlation id is
//! minted, one request goes out, and the response is mapped to a typed
//! result. Retries and state transitions live with the callers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::types::{
    ConnectResponse, ErrorBody, HealthResponse, LockResponse, StatusResponse, UnlockResponse,
    UnlockStatus,
};
use super::{BridgeTransport, TokenProvider};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, SESSION_LOCKED_CODE};

const CORRELATION_HEADER: &str = "X-Correlation-Id";

/// Bridge client over HTTP, the production transport.
pub struct HttpBridgeClient {
    base_url: String,
    http: reqwest::Client,
    token: Arc<dyn TokenProvider>,
    request_timeout: Option<Duration>,
}

impl HttpBridgeClient {
    /// Build a client from configuration and a token source.
    pub fn new(config: &BridgeConfig, token: Arc<dyn TokenProvider>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            token,
            request_timeout: config.request_timeout,
        }
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, BridgeError>
    where
        T: DeserializeOwned + Default,
    {
        let correlation = short_id();
        let started = Instant::now();

        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .header(CORRELATION_HEADER, &correlation);

        if let Some(token) = self.token.access_token().await {
            req = req.bearer_auth(token);
        }
        if let Some(timeout) = self.request_timeout {
            req = req.timeout(timeout);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        let latency_ms = started.elapsed().as_millis() as u64;
        let status = res.status();
        let server_ref = res
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body = res.json::<ErrorBody>().await.unwrap_or_default();
            debug!(path, status = status.as_u16(), latency_ms, %correlation, "bridge request failed");
            return Err(map_error(status.as_u16(), body, server_ref.as_deref()));
        }

        debug!(path, latency_ms, %correlation, "bridge request ok");

        if status == StatusCode::NO_CONTENT {
            return Ok(T::default());
        }
        res.json::<T>()
            .await
            .map_err(|e| BridgeError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl BridgeTransport for HttpBridgeClient {
    async fn health(&self) -> Result<HealthResponse, BridgeError> {
        self.request(Method::GET, "/health", None).await
    }

    async fn connect(&self, target_url: &str) -> Result<ConnectResponse, BridgeError> {
        self.request(
            Method::POST,
            "/connect",
            Some(json!({ "targetUrl": target_url })),
        )
        .await
    }

    async fn status(&self) -> Result<StatusResponse, BridgeError> {
        self.request(Method::GET, "/status", None).await
    }

    async fn unlock(&self, password: &str) -> Result<UnlockResponse, BridgeError> {
        self.request(Method::POST, "/unlock", Some(json!({ "password": password })))
            .await
    }

    async fn lock(&self) -> Result<LockResponse, BridgeError> {
        self.request(Method::POST, "/lock", None).await
    }

    async fn unlock_status(&self) -> Result<UnlockStatus, BridgeError> {
        self.request(Method::GET, "/unlock/status", None).await
    }
}

/// Map a non-2xx response to a typed error.
///
/// A 403 whose body carries `code: "session_locked"` becomes the
/// distinguished [`BridgeError::SessionLocked`]; everything else becomes
/// [`BridgeError::Http`]. The server correlation id, when present, is
/// appended to the message as `(ref: <id>)`.
fn map_error(status: u16, body: ErrorBody, server_ref: Option<&str>) -> BridgeError {
    let message = match server_ref {
        Some(id) => format!("{} (ref: {})", body.message, id),
        None => body.message,
    };

    if status == 403 && body.code.as_deref() == Some(SESSION_LOCKED_CODE) {
        return BridgeError::SessionLocked {
            code: SESSION_LOCKED_CODE.to_string(),
            status,
            message,
        };
    }
    BridgeError::Http { status, message }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
