//! Client SDK for the Privxx bridge.
//!
//! The bridge brokers two session concepts for Privxx front ends:
//! - an **identity unlock session**: a time-boxed unlocked state that
//!   gates tunnel usage, checked and renewed over HTTP
//! - a **tunnel connection**: a connect request followed by bounded
//!   polling until the mixnet route reports ready
//!
//! This crate provides the typed HTTP client ([`HttpBridgeClient`]), the
//! two state machines driving it ([`identity::IdentitySession`] and
//! [`connect::ConnectDriver`]), and the supporting pieces: scripted mock
//! transport, backoff retry controller, health diagnostics, and the
//! Phase-D control messages.
//!
//! All errors are caught at the state-machine boundary and folded into
//! snapshots; nothing escapes to the caller as a stray failure. The
//! session-locked error is the one distinguished case - it signals
//! "re-authenticate" instead of "retry", and both machines surface it
//! explicitly.

pub mod client;
pub mod config;
pub mod connect;
pub mod diagnostics;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod retry;

pub use client::{
    Anonymous, BridgeTransport, ConnectResponse, HealthResponse, HttpBridgeClient, LockResponse,
    MockBridgeClient, StaticToken, StatusResponse, TokenProvider, TunnelState, UnlockResponse,
    UnlockStatus,
};
pub use config::BridgeConfig;
pub use connect::{ConnectDriver, ConnectSnapshot, ConnectState};
pub use error::BridgeError;
pub use identity::{AuthPhase, IdentitySession, IdentitySnapshot, IdentityState};
