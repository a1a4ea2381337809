//! Scripted in-memory bridge for offline use and tests.
//!
//! Each endpoint has a response queue and a call counter. A drained queue
//! falls back to a benign default, so the mock also works as a standing
//! demo bridge without any scripting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{
    ConnectResponse, HealthResponse, LockResponse, StatusResponse, UnlockResponse, UnlockStatus,
};
use super::BridgeTransport;
use crate::error::BridgeError;

type Script<T> = Mutex<VecDeque<Result<T, BridgeError>>>;

/// In-memory [`BridgeTransport`] with scripted responses.
#[derive(Default)]
pub struct MockBridgeClient {
    delay: Option<Duration>,
    health_script: Script<HealthResponse>,
    connect_script: Script<ConnectResponse>,
    status_script: Script<StatusResponse>,
    unlock_script: Script<UnlockResponse>,
    lock_script: Script<LockResponse>,
    unlock_status_script: Script<UnlockStatus>,
    health_calls: AtomicU32,
    connect_calls: AtomicU32,
    status_calls: AtomicU32,
    unlock_calls: AtomicU32,
    lock_calls: AtomicU32,
    unlock_status_calls: AtomicU32,
}

impl MockBridgeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `delay`, so tests can observe in-flight overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn enqueue_health(&self, response: Result<HealthResponse, BridgeError>) {
        self.health_script.lock().unwrap().push_back(response);
    }

    pub fn enqueue_connect(&self, response: Result<ConnectResponse, BridgeError>) {
        self.connect_script.lock().unwrap().push_back(response);
    }

    pub fn enqueue_status(&self, response: Result<StatusResponse, BridgeError>) {
        self.status_script.lock().unwrap().push_back(response);
    }

    pub fn enqueue_unlock(&self, response: Result<UnlockResponse, BridgeError>) {
        self.unlock_script.lock().unwrap().push_back(response);
    }

    pub fn enqueue_lock(&self, response: Result<LockResponse, BridgeError>) {
        self.lock_script.lock().unwrap().push_back(response);
    }

    pub fn enqueue_unlock_status(&self, response: Result<UnlockStatus, BridgeError>) {
        self.unlock_status_script.lock().unwrap().push_back(response);
    }

    pub fn health_calls(&self) -> u32 {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn unlock_calls(&self) -> u32 {
        self.unlock_calls.load(Ordering::SeqCst)
    }

    pub fn lock_calls(&self) -> u32 {
        self.lock_calls.load(Ordering::SeqCst)
    }

    pub fn unlock_status_calls(&self) -> u32 {
        self.unlock_status_calls.load(Ordering::SeqCst)
    }

    async fn take<T>(
        &self,
        script: &Script<T>,
        counter: &AtomicU32,
        fallback: T,
    ) -> Result<T, BridgeError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = script.lock().unwrap().pop_front();
        next.unwrap_or(Ok(fallback))
    }
}

#[async_trait]
impl BridgeTransport for MockBridgeClient {
    async fn health(&self) -> Result<HealthResponse, BridgeError> {
        self.take(
            &self.health_script,
            &self.health_calls,
            HealthResponse {
                status: "ok".to_string(),
                version: "0.0.0-mock".to_string(),
                xxdk_ready: true,
            },
        )
        .await
    }

    async fn connect(&self, _target_url: &str) -> Result<ConnectResponse, BridgeError> {
        self.take(
            &self.connect_script,
            &self.connect_calls,
            ConnectResponse::Simple { success: true },
        )
        .await
    }

    async fn status(&self) -> Result<StatusResponse, BridgeError> {
        self.take(&self.status_script, &self.status_calls, StatusResponse::default())
            .await
    }

    async fn unlock(&self, _password: &str) -> Result<UnlockResponse, BridgeError> {
        self.take(
            &self.unlock_script,
            &self.unlock_calls,
            UnlockResponse {
                success: true,
                ..Default::default()
            },
        )
        .await
    }

    async fn lock(&self) -> Result<LockResponse, BridgeError> {
        self.take(&self.lock_script, &self.lock_calls, LockResponse { success: true })
            .await
    }

    async fn unlock_status(&self) -> Result<UnlockStatus, BridgeError> {
        self.take(
            &self.unlock_status_script,
            &self.unlock_status_calls,
            UnlockStatus::default(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::TunnelState;

    #[tokio::test]
    async fn scripted_responses_drain_in_order() {
        let mock = MockBridgeClient::new();
        mock.enqueue_status(Ok(StatusResponse {
            state: TunnelState::Connecting,
            ..Default::default()
        }));
        mock.enqueue_status(Err(BridgeError::Network("down".to_string())));

        let first = mock.status().await.unwrap();
        assert_eq!(first.state, TunnelState::Connecting);

        let second = mock.status().await;
        assert!(matches!(second, Err(BridgeError::Network(_))));
        assert_eq!(mock.status_calls(), 2);
    }

    #[tokio::test]
    async fn drained_queue_falls_back_to_defaults() {
        let mock = MockBridgeClient::new();
        let health = mock.health().await.unwrap();
        assert_eq!(health.status, "ok");
        assert!(health.xxdk_ready);

        let unlock_status = mock.unlock_status().await.unwrap();
        assert!(!unlock_status.unlocked);
    }
}
