//! Exponential backoff retry controller.
//!
//! Deliberately independent of the connect and identity state machines:
//! neither retries on its own, and a caller that wants auto-retry composes
//! one of these around the call instead.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Delays never drop below this, jitter included.
const MIN_DELAY_MS: f64 = 1000.0;

/// Backoff parameters.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap applied before jitter.
    pub max_delay: Duration,
    /// Retry budget; `next_delay` returns `None` once it is spent.
    pub max_retries: u32,
    /// Jitter factor in `0.0..=1.0`, applied as +/- a fraction of the
    /// capped delay.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            max_retries: 5,
            jitter: 0.2,
        }
    }
}

/// Stateful backoff sequence.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Completed attempts so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.config.max_retries
    }

    /// Rearm the sequence, e.g. after a success.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay before the next retry, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        let base_ms = self.config.base_delay.as_millis() as f64;
        let max_ms = self.config.max_delay.as_millis() as f64;
        let exponential = base_ms * 2f64.powi(self.attempt as i32);
        let capped = exponential.min(max_ms);
        let jitter = capped * self.config.jitter * rand::thread_rng().gen_range(-1.0..=1.0);
        let delay = (capped + jitter).round().max(MIN_DELAY_MS);

        self.attempt += 1;
        Some(Duration::from_millis(delay as u64))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

/// Run `op` until it succeeds or `backoff` is exhausted, sleeping the
/// backoff delay between attempts. Returns the last error on exhaustion.
pub async fn retry_with_backoff<T, E, F, Fut>(mut backoff: Backoff, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => match backoff.next_delay() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(err),
            },
        }
    }
}
