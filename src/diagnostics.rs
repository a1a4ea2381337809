//! One-shot bridge health probe.
//!
//! Wraps `GET /health` with latency measurement and a coarse verdict the
//! diagnostics surface can render directly.

use std::time::{Duration, Instant};

use crate::client::types::TunnelState;
use crate::client::BridgeTransport;
use crate::error::BridgeError;

/// Fallback wait when the bridge rate-limits without a retry hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Outcome of a health probe.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthVerdict {
    /// Bridge answered. `state` is derived: a healthy bridge is idle and
    /// ready to connect.
    Reachable {
        state: TunnelState,
        xxdk_ready: bool,
        version: String,
    },
    /// HTTP 429; try again after the given wait.
    RateLimited { retry_after: Duration },
    /// Transport or server failure.
    Unreachable { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub verdict: HealthVerdict,
    pub latency_ms: u64,
}

impl HealthReport {
    pub fn is_reachable(&self) -> bool {
        matches!(self.verdict, HealthVerdict::Reachable { .. })
    }
}

/// Probe bridge health once.
pub async fn probe_health(transport: &dyn BridgeTransport) -> HealthReport {
    let started = Instant::now();
    let verdict = match transport.health().await {
        Ok(health) => HealthVerdict::Reachable {
            state: TunnelState::Idle,
            xxdk_ready: health.xxdk_ready,
            version: health.version,
        },
        Err(BridgeError::Http { status: 429, .. }) => HealthVerdict::RateLimited {
            retry_after: DEFAULT_RETRY_AFTER,
        },
        Err(err) => HealthVerdict::Unreachable {
            message: err.to_string(),
        },
    };
    HealthReport {
        verdict,
        latency_ms: started.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockBridgeClient;

    #[tokio::test]
    async fn healthy_bridge_is_reachable() {
        let mock = MockBridgeClient::new();
        let report = probe_health(&mock).await;
        assert!(report.is_reachable());
        match report.verdict {
            HealthVerdict::Reachable { state, xxdk_ready, .. } => {
                assert_eq!(state, TunnelState::Idle);
                assert!(xxdk_ready);
            }
            other => panic!("expected reachable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_maps_to_retry_after() {
        let mock = MockBridgeClient::new();
        mock.enqueue_health(Err(BridgeError::Http {
            status: 429,
            message: "slow down".to_string(),
        }));
        let report = probe_health(&mock).await;
        assert_eq!(
            report.verdict,
            HealthVerdict::RateLimited {
                retry_after: DEFAULT_RETRY_AFTER
            }
        );
    }

    #[tokio::test]
    async fn network_failure_is_unreachable() {
        let mock = MockBridgeClient::new();
        mock.enqueue_health(Err(BridgeError::Network("dns failure".to_string())));
        let report = probe_health(&mock).await;
        match report.verdict {
            HealthVerdict::Unreachable { message } => assert!(message.contains("dns failure")),
            other => panic!("expected unreachable, got {other:?}"),
        }
    }
}
