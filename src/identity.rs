//! Identity unlock session state machine.
//!
//! Tracks whether the bridge-side identity session is locked, unlocked,
//! or unreachable, driven by explicit `check_status` calls and the
//! unlock/lock actions. Long-running and re-entrant: there is no terminal
//! state, and every failure degrades to `Locked` or `Offline` instead of
//! propagating.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::client::types::UnlockStatus;
use crate::client::BridgeTransport;

/// Session state as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    Locked,
    Unlocked,
    /// First status check or a mutation in flight.
    Loading,
    /// Bridge unreachable; retry later rather than re-authenticate.
    Offline,
}

/// Where the owning user's authentication currently stands. Status checks
/// are deferred while this is `Loading` and short-circuit to `Locked`
/// while `SignedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Loading,
    SignedOut,
    SignedIn,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySnapshot {
    pub state: IdentityState,
    pub error: Option<String>,
    pub unlock_expires_at: Option<DateTime<Utc>>,
    /// True once the first status check has completed, so callers can
    /// suppress loading flicker on later polls.
    pub initialized: bool,
}

impl IdentitySnapshot {
    fn new() -> Self {
        Self {
            state: IdentityState::Locked,
            error: None,
            unlock_expires_at: None,
            initialized: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.state == IdentityState::Locked
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == IdentityState::Unlocked
    }

    pub fn is_offline(&self) -> bool {
        self.state == IdentityState::Offline
    }
}

struct Inner {
    snapshot: IdentitySnapshot,
    auth: AuthPhase,
}

/// The identity session state machine.
///
/// Owned by a single consumer; shareable behind an [`Arc`]. Overlapping
/// `check_status` calls collapse to one network request, and a
/// `check_status` racing an unlock/lock mutation yields to the mutation.
pub struct IdentitySession {
    transport: Arc<dyn BridgeTransport>,
    inner: Mutex<Inner>,
    checking: AtomicBool,
    mutating: AtomicBool,
}

impl IdentitySession {
    pub fn new(transport: Arc<dyn BridgeTransport>) -> Self {
        Self {
            transport,
            inner: Mutex::new(Inner {
                snapshot: IdentitySnapshot::new(),
                auth: AuthPhase::Loading,
            }),
            checking: AtomicBool::new(false),
            mutating: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> IdentitySnapshot {
        self.inner.lock().unwrap().snapshot.clone()
    }

    /// Record the auth phase. Signing out forces `Locked` immediately and
    /// clears the TTL; a signed-in caller should follow up with
    /// [`check_status`](Self::check_status).
    pub fn set_auth_phase(&self, phase: AuthPhase) {
        let mut inner = self.inner.lock().unwrap();
        inner.auth = phase;
        if phase == AuthPhase::SignedOut {
            inner.snapshot.state = IdentityState::Locked;
            inner.snapshot.unlock_expires_at = None;
            inner.snapshot.initialized = true;
        }
    }

    /// Ask the bridge whether the identity session is unlocked.
    ///
    /// No-op while auth is still loading, while another check is in
    /// flight, or while an unlock/lock mutation owns the state. Failures
    /// land in the snapshot, never in the return value.
    pub async fn check_status(&self) -> IdentitySnapshot {
        {
            let mut inner = self.inner.lock().unwrap();
            match inner.auth {
                AuthPhase::Loading => {
                    debug!("identity status check deferred, auth still loading");
                    return inner.snapshot.clone();
                }
                AuthPhase::SignedOut => {
                    inner.snapshot.state = IdentityState::Locked;
                    inner.snapshot.unlock_expires_at = None;
                    inner.snapshot.initialized = true;
                    return inner.snapshot.clone();
                }
                AuthPhase::SignedIn => {}
            }
        }

        if self.mutating.load(Ordering::Acquire) {
            return self.snapshot();
        }
        if self.checking.swap(true, Ordering::AcqRel) {
            debug!("identity status check already in flight");
            return self.snapshot();
        }

        {
            let mut inner = self.inner.lock().unwrap();
            if !inner.snapshot.initialized {
                inner.snapshot.state = IdentityState::Loading;
            }
            inner.snapshot.error = None;
        }

        let result = self.transport.unlock_status().await;

        let snapshot = {
            let mut inner = self.inner.lock().unwrap();
            match result {
                Ok(status) => {
                    apply_unlock_status(&mut inner.snapshot, &status, Utc::now());
                }
                Err(err) => {
                    let message = err.to_string();
                    let offline = err.is_network_class();
                    warn!(error = %message, offline, "identity status check failed");
                    inner.snapshot.error = Some(message);
                    // Stale expiry must not survive a failed check.
                    inner.snapshot.unlock_expires_at = None;
                    inner.snapshot.state = if offline {
                        IdentityState::Offline
                    } else {
                        IdentityState::Locked
                    };
                }
            }
            inner.snapshot.initialized = true;
            inner.snapshot.clone()
        };

        self.checking.store(false, Ordering::Release);
        snapshot
    }

    /// Unlock the identity session with `password`.
    ///
    /// The unlock response itself may omit the TTL, so the authoritative
    /// expiry comes from a follow-up `unlock/status` read.
    pub async fn unlock(&self, password: &str) -> bool {
        self.mutating.store(true, Ordering::Release);
        {
            let mut inner = self.inner.lock().unwrap();
            inner.snapshot.state = IdentityState::Loading;
            inner.snapshot.error = None;
        }

        let unlocked = self.run_unlock(password).await;

        self.mutating.store(false, Ordering::Release);
        unlocked
    }

    async fn run_unlock(&self, password: &str) -> bool {
        let response = match self.transport.unlock(password).await {
            Ok(response) => response,
            Err(err) => {
                self.fail_locked(err.to_string());
                return false;
            }
        };
        if !response.success {
            self.fail_locked("Unlock failed".to_string());
            return false;
        }

        let status = match self.transport.unlock_status().await {
            Ok(status) => status,
            Err(err) => {
                self.fail_locked(err.to_string());
                return false;
            }
        };

        let mut inner = self.inner.lock().unwrap();
        apply_unlock_status(&mut inner.snapshot, &status, Utc::now());
        if inner.snapshot.state == IdentityState::Unlocked {
            info!(expires_at = ?inner.snapshot.unlock_expires_at, "identity unlocked");
            true
        } else {
            inner.snapshot.error = Some("Unlock expired".to_string());
            false
        }
    }

    /// Lock the identity session.
    pub async fn lock(&self) -> bool {
        self.mutating.store(true, Ordering::Release);
        let previous = {
            let mut inner = self.inner.lock().unwrap();
            let previous = inner.snapshot.state;
            inner.snapshot.state = IdentityState::Loading;
            inner.snapshot.error = None;
            previous
        };

        let locked = match self.transport.lock().await {
            Ok(response) if response.success => {
                let mut inner = self.inner.lock().unwrap();
                inner.snapshot.state = IdentityState::Locked;
                inner.snapshot.unlock_expires_at = None;
                info!("identity locked");
                true
            }
            Ok(_) => {
                let mut inner = self.inner.lock().unwrap();
                inner.snapshot.state = previous;
                inner.snapshot.error = Some("Lock failed".to_string());
                false
            }
            Err(err) => {
                let mut inner = self.inner.lock().unwrap();
                inner.snapshot.state = previous;
                inner.snapshot.error = Some(err.to_string());
                false
            }
        };

        self.mutating.store(false, Ordering::Release);
        locked
    }

    /// Immediate transition to `Locked`, for callers reacting to a
    /// session-locked signal from another flow.
    pub fn force_locked(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.snapshot.state = IdentityState::Locked;
        inner.snapshot.unlock_expires_at = None;
        inner.snapshot.error = None;
    }

    pub fn clear_error(&self) {
        self.inner.lock().unwrap().snapshot.error = None;
    }

    fn fail_locked(&self, message: String) {
        warn!(error = %message, "identity unlock failed");
        let mut inner = self.inner.lock().unwrap();
        inner.snapshot.error = Some(message);
        inner.snapshot.state = IdentityState::Locked;
        inner.snapshot.unlock_expires_at = None;
    }
}

/// Fold an `unlock/status` payload into the snapshot.
///
/// Drives state from `unlocked` first: a locked session has no expiry no
/// matter what the wire says. An unlocked session with the zero date or a
/// missing expiry is unlocked with unknown TTL, and an expiry already in
/// the past locks immediately.
fn apply_unlock_status(snapshot: &mut IdentitySnapshot, status: &UnlockStatus, now: DateTime<Utc>) {
    if !status.unlocked {
        snapshot.state = IdentityState::Locked;
        snapshot.unlock_expires_at = None;
        return;
    }

    match status.effective_expiry() {
        None => {
            snapshot.state = IdentityState::Unlocked;
            snapshot.unlock_expires_at = None;
        }
        Some(expires_at) if expires_at <= now => {
            snapshot.state = IdentityState::Locked;
            snapshot.unlock_expires_at = None;
        }
        Some(expires_at) => {
            snapshot.state = IdentityState::Unlocked;
            snapshot.unlock_expires_at = Some(expires_at);
        }
    }
}
