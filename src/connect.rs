//! Connect flow with bounded readiness polling.
//!
//! `connect()` issues the connect call, then probes `/status` once
//! immediately and once per second after that, ten attempts in total.
//! Attempt ten without readiness is a timeout; a session-locked error at
//! any point short-circuits the whole flow. Polls within a run are
//! strictly sequential, and a newer `connect()` or a `reset()` supersedes
//! the run: late results are discarded before any state update.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::types::StatusResponse;
use crate::client::BridgeTransport;
use crate::error::BridgeError;

/// Fixed spacing between status probes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Total probe budget per connect, the immediate first probe included.
pub const MAX_POLL_ATTEMPTS: u32 = 10;

/// User-facing message for polling exhaustion.
pub const TIMEOUT_MESSAGE: &str = "Connection pending — try again";

/// Connect flow states. The four right-hand states are terminal until the
/// next `connect()` or `reset()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Idle,
    Connecting,
    Polling,
    Secure,
    Timeout,
    SessionLocked,
    Error,
}

/// Point-in-time view of a connect run. Created fresh on every
/// `connect()` and fully replaced by `reset()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectSnapshot {
    pub state: ConnectState,
    pub status: Option<StatusResponse>,
    pub error: Option<String>,
    pub poll_attempt: u32,
}

impl ConnectSnapshot {
    fn idle() -> Self {
        Self {
            state: ConnectState::Idle,
            status: None,
            error: None,
            poll_attempt: 0,
        }
    }

    pub fn is_connecting(&self) -> bool {
        self.state == ConnectState::Connecting
    }

    pub fn is_polling(&self) -> bool {
        self.state == ConnectState::Polling
    }

    pub fn is_secure(&self) -> bool {
        self.state == ConnectState::Secure
    }

    pub fn is_timeout(&self) -> bool {
        self.state == ConnectState::Timeout
    }

    pub fn is_session_locked(&self) -> bool {
        self.state == ConnectState::SessionLocked
    }
}

/// Drives the connect-with-polling flow against a bridge transport.
///
/// Cancellation is generation-based: every `connect()` and `reset()` bumps
/// the generation, and state updates from a superseded run are dropped. A
/// probe already in flight when its run is superseded still completes its
/// network round-trip; only its result is discarded.
pub struct ConnectDriver {
    transport: Arc<dyn BridgeTransport>,
    inner: Mutex<ConnectSnapshot>,
    generation: AtomicU64,
    poll_interval: Duration,
    on_session_locked: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ConnectDriver {
    pub fn new(transport: Arc<dyn BridgeTransport>) -> Self {
        Self {
            transport,
            inner: Mutex::new(ConnectSnapshot::idle()),
            generation: AtomicU64::new(0),
            poll_interval: POLL_INTERVAL,
            on_session_locked: None,
        }
    }

    /// Invoke `callback` when a run ends in `SessionLocked`, so the UI can
    /// redirect to re-authentication. Fires once per run.
    pub fn on_session_locked(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_session_locked = Some(Box::new(callback));
        self
    }

    /// Override the probe spacing. The attempt bound stays at
    /// [`MAX_POLL_ATTEMPTS`].
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn snapshot(&self) -> ConnectSnapshot {
        self.inner.lock().unwrap().clone()
    }

    /// Run the connect flow against `target_url`, superseding any run
    /// still in flight. Returns the snapshot current when the run ends.
    pub async fn connect(&self, target_url: &str) -> ConnectSnapshot {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(target_url, "starting connect");
        self.update(generation, |snap| {
            *snap = ConnectSnapshot {
                state: ConnectState::Connecting,
                ..ConnectSnapshot::idle()
            };
        });

        match self.transport.connect(target_url).await {
            Err(err) if err.is_session_locked() => {
                self.finish_session_locked(generation, &err, 0);
            }
            Err(err) => {
                warn!(error = %err, "connect call failed");
                self.update(generation, |snap| {
                    snap.state = ConnectState::Error;
                    snap.error = Some(err.to_string());
                });
            }
            Ok(response) if !response.succeeded() => {
                self.update(generation, |snap| {
                    snap.state = ConnectState::Error;
                    snap.error = Some("Connection failed".to_string());
                });
            }
            Ok(_) => self.poll_until_ready(generation).await,
        }

        self.snapshot()
    }

    /// Cancel any in-flight run and return to idle. A poll scheduled by
    /// the cancelled run updates nothing once this returns.
    pub fn reset(&self) -> ConnectSnapshot {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        *inner = ConnectSnapshot::idle();
        inner.clone()
    }

    async fn poll_until_ready(&self, generation: u64) {
        for attempt in 1..=MAX_POLL_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(self.poll_interval).await;
            }
            if self.generation.load(Ordering::SeqCst) != generation {
                return; // superseded while waiting
            }
            self.update(generation, |snap| {
                snap.state = ConnectState::Polling;
                snap.poll_attempt = attempt;
            });
            debug!(attempt, "probing tunnel status");

            match self.transport.status().await {
                Ok(status) if status.is_ready() => {
                    info!(attempt, "tunnel secure");
                    self.update(generation, |snap| {
                        snap.state = ConnectState::Secure;
                        snap.status = Some(status);
                        snap.error = None;
                    });
                    return;
                }
                Ok(status) => {
                    if attempt == MAX_POLL_ATTEMPTS {
                        warn!(attempt, "tunnel never became ready");
                        self.update(generation, |snap| {
                            snap.state = ConnectState::Timeout;
                            snap.status = Some(status);
                            snap.error = Some(TIMEOUT_MESSAGE.to_string());
                        });
                        return;
                    }
                }
                Err(err) if err.is_session_locked() => {
                    self.finish_session_locked(generation, &err, attempt);
                    return;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "status probe failed");
                    self.update(generation, |snap| {
                        snap.state = ConnectState::Error;
                        snap.error = Some(err.to_string());
                    });
                    return;
                }
            }
        }
    }

    fn finish_session_locked(&self, generation: u64, err: &BridgeError, attempt: u32) {
        let applied = self.update(generation, |snap| {
            snap.state = ConnectState::SessionLocked;
            snap.status = None;
            snap.error = Some(err.to_string());
            snap.poll_attempt = attempt;
        });
        if applied {
            info!(attempt, "session locked, connect aborted");
            if let Some(callback) = &self.on_session_locked {
                callback();
            }
        }
    }

    /// Apply a state mutation unless the run was superseded. The
    /// generation is re-checked under the lock so a concurrent `reset()`
    /// cannot lose against a stale run.
    fn update(&self, generation: u64, apply: impl FnOnce(&mut ConnectSnapshot)) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        let mut inner = self.inner.lock().unwrap();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        apply(&mut inner);
        true
    }
}
