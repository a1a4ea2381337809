//! bridge-probe: diagnostic CLI for the Privxx bridge.
//!
//! Drives the real client and state machines against a live bridge, so an
//! operator can check reachability, unlock state, and the full connect
//! flow from a shell.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use chrono::Utc;

use privxx_bridge::config::DEFAULT_BASE_URL;
use privxx_bridge::diagnostics::{probe_health, HealthVerdict};
use privxx_bridge::{
    Anonymous, BridgeConfig, BridgeTransport, ConnectDriver, ConnectState, HttpBridgeClient,
    StaticToken, TokenProvider,
};

#[derive(Parser)]
#[command(name = "bridge-probe")]
#[command(about = "Diagnostic probe for the Privxx bridge")]
struct Cli {
    /// Bridge base URL
    #[arg(long, env = "PRIVXX_BRIDGE_URL", default_value = DEFAULT_BASE_URL)]
    bridge_url: String,

    /// Bearer token for authenticated endpoints
    #[arg(long, env = "PRIVXX_TOKEN")]
    token: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, env = "PRIVXX_REQUEST_TIMEOUT_MS", default_value = "30000")]
    request_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe bridge health and report latency
    Health,
    /// Show whether the identity session is unlocked
    UnlockStatus,
    /// Connect to a target URL and poll until secure or timeout
    Connect { target_url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bridge_probe=info".parse()?)
                .add_directive("privxx_bridge=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = BridgeConfig::new(&cli.bridge_url)
        .with_request_timeout(Duration::from_millis(cli.request_timeout_ms));
    config.validate().map_err(anyhow::Error::msg)?;

    let token: Arc<dyn TokenProvider> = match &cli.token {
        Some(token) => Arc::new(StaticToken(token.clone())),
        None => Arc::new(Anonymous),
    };
    let transport: Arc<dyn BridgeTransport> = Arc::new(HttpBridgeClient::new(&config, token));

    match cli.command {
        Command::Health => run_health(transport.as_ref()).await,
        Command::UnlockStatus => run_unlock_status(transport.as_ref()).await,
        Command::Connect { target_url } => run_connect(transport, &target_url).await,
    }
}

async fn run_health(transport: &dyn BridgeTransport) -> anyhow::Result<()> {
    let report = probe_health(transport).await;
    match report.verdict {
        HealthVerdict::Reachable {
            xxdk_ready,
            version,
            ..
        } => {
            println!(
                "bridge reachable: version {version}, xxdk ready: {xxdk_ready}, latency {}ms",
                report.latency_ms
            );
            Ok(())
        }
        HealthVerdict::RateLimited { retry_after } => {
            bail!("bridge rate limited, retry after {}s", retry_after.as_secs())
        }
        HealthVerdict::Unreachable { message } => bail!("bridge unreachable: {message}"),
    }
}

async fn run_unlock_status(transport: &dyn BridgeTransport) -> anyhow::Result<()> {
    let status = transport.unlock_status().await?;
    if !status.unlocked {
        println!("identity session: locked");
        return Ok(());
    }
    match status.remaining(Utc::now()) {
        Some(remaining) => println!(
            "identity session: unlocked, {}s remaining",
            remaining.num_seconds().max(0)
        ),
        None => println!("identity session: unlocked, unknown TTL"),
    }
    Ok(())
}

async fn run_connect(transport: Arc<dyn BridgeTransport>, target_url: &str) -> anyhow::Result<()> {
    let driver = ConnectDriver::new(transport)
        .on_session_locked(|| println!("identity session is locked - unlock before connecting"));

    let snapshot = driver.connect(target_url).await;
    match snapshot.state {
        ConnectState::Secure => {
            let status = snapshot.status.unwrap_or_default();
            println!(
                "secure after {} poll(s): session {} latency {}ms",
                snapshot.poll_attempt,
                status.session_id.as_deref().unwrap_or("-"),
                status.latency.map_or_else(|| "-".to_string(), |l| l.to_string()),
            );
            Ok(())
        }
        state => {
            let detail = snapshot.error.unwrap_or_else(|| format!("{state:?}"));
            bail!("connect did not reach secure: {detail}")
        }
    }
}
