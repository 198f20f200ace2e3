//! Sleep and retry primitives for the remote job loops.
//!
//! The ATLAS queue is polled in blocking sleep-and-retry cycles. Sleeping goes
//! through [`Sleeper`] so tests can observe the requested delays without
//! waiting for them.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

/// Backoff applied when a throttling message carries no usable hint, and the
/// interval between job status checks.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);

static SECONDS_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"available in (\d+) seconds").expect("valid regex"));
static MINUTES_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"available in (\d+) minutes").expect("valid regex"));

/// Asynchronous sleep capability.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and remembers every requested delay.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in call order.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.calls.lock().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Optional upper bound on loop iterations.
///
/// `max_attempts: None` keeps retrying until the remote side settles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    /// Build from a config value where `0` means unbounded.
    pub fn from_limit(limit: u32) -> Self {
        if limit == 0 {
            Self::unbounded()
        } else {
            Self::bounded(limit)
        }
    }

    /// Whether another attempt may follow `attempts_made` completed attempts.
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts_made < max,
            None => true,
        }
    }
}

/// Extract the wait time from a throttling message.
///
/// `"... available in 45 seconds"` yields 45 s, `"... available in 2 minutes"`
/// yields 120 s, anything else yields [`DEFAULT_BACKOFF`]. Seconds win when
/// both forms appear.
pub fn parse_retry_hint(message: &str) -> Duration {
    let captured = |re: &Regex| {
        re.captures(message)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
    };

    if let Some(secs) = captured(&SECONDS_HINT) {
        Duration::from_secs(secs)
    } else if let Some(mins) = captured(&MINUTES_HINT) {
        Duration::from_secs(mins.saturating_mul(60))
    } else {
        DEFAULT_BACKOFF
    }
}
