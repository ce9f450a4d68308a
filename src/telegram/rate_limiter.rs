//! Rate limiter for outbound sends.
//!
//! Spaces out messages so a burst of lookups does not trigger Telegram's
//! flood protection, and pauses every sender when it does.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Rate limiter that enforces minimum intervals between operations.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum duration between allowed operations.
    min_interval: Duration,

    /// Earliest instant the next operation may run.
    next_allowed: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: Mutex::new(None),
        }
    }

    /// Waits until an operation is allowed, then reserves the next slot.
    ///
    /// Returns the duration waited (0 if no wait was needed).
    pub async fn acquire(&self) -> Duration {
        let mut next = self.next_allowed.lock().await;

        let wait_duration = next
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or_default();

        if !wait_duration.is_zero() {
            debug!("Rate limiter: waiting {:?} before next send", wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        *next = Some(Instant::now() + self.min_interval);
        wait_duration
    }

    /// Returns the time remaining until the next operation is allowed.
    pub async fn time_until_allowed(&self) -> Duration {
        self.next_allowed
            .lock()
            .await
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or_default()
    }

    /// Blocks all senders for the flood wait Telegram asked for.
    pub async fn handle_flood_wait(&self, wait_seconds: u32) {
        warn!("Received flood wait from Telegram: {} seconds", wait_seconds);
        let until = Instant::now() + Duration::from_secs(u64::from(wait_seconds));

        let mut next = self.next_allowed.lock().await;
        if next.is_none_or(|at| at < until) {
            *next = Some(until);
        }
    }
}

/// Extracts flood wait seconds from an error message.
#[must_use]
pub fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];
    let lower = err_msg.to_lowercase();

    for pattern in patterns {
        if let Some(idx) = lower.find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = lower[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}
