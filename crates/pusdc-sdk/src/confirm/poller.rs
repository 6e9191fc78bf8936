//! Adaptive-interval polling for a balance change.

use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    balance::{BalanceKey, BalanceRefresh, BalanceSnapshot},
    status::{Severity, StatusSink},
};

/// Default time budget for one confirmation poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Why a poll ended without observing a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("balance poll cancelled")]
    Cancelled,
    #[error("no balance change within {0:?}")]
    Timeout(Duration),
}

/// Exponential backoff between refreshes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub factor: f64,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1_000),
            factor: 1.5,
            max: Duration::from_millis(10_000),
        }
    }
}

impl BackoffPolicy {
    /// Interval after `current`, never above `max`. Overflow saturates to `max`.
    pub fn next(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.factor)
            .map_or(self.max, |next| next.min(self.max))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub key: BalanceKey,
    pub backoff: BackoffPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            key: BalanceKey::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Polls `refresh` until the balance at `config.key` differs from `previous`.
///
/// Cancellation is checked before every cycle and interrupts the sleep.
/// Refresh failures are logged and retried on the next cycle.
pub async fn wait_for_state_change<R>(
    refresh: &R,
    previous: Option<&BalanceSnapshot>,
    notify: &dyn StatusSink,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<BalanceSnapshot, PollError>
where
    R: BalanceRefresh + ?Sized,
{
    notify.notify("Waiting for confirmation...", Severity::Info);

    let start = Instant::now();
    let mut interval = config.backoff.initial;
    let mut attempt = 0u32;

    while start.elapsed() < config.timeout {
        if cancel.is_cancelled() {
            debug!("poller: cancelled before attempt {}", attempt + 1);
            return Err(PollError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("poller: cancelled while sleeping");
                return Err(PollError::Cancelled);
            }
            _ = sleep(interval) => {}
        }

        attempt += 1;
        if let Err(err) = refresh.refresh().await {
            warn!("poller: refresh attempt {attempt} failed: {err}");
        }

        let current = refresh.snapshot(config.key);
        debug!(
            "poller: attempt {attempt} after {:?}, {} = {}",
            start.elapsed(),
            config.key.as_str(),
            current
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        );
        if let Some(current) = current {
            if !previous.is_some_and(|previous| previous.same_balance(&current)) {
                return Ok(current);
            }
        }

        interval = config.backoff.next(interval);
    }

    Err(PollError::Timeout(config.timeout))
}
