use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;

/// Delay growth between resubmissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every resubmission
    #[default]
    Fixed,
    /// Delay doubles after every failure, capped at `max_delay`
    Exponential,
}

/// How often and how patiently a submission is resent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; `None` retries forever
    pub max_attempts: Option<u32>,
    pub delay: Duration,
    pub backoff: Backoff,
    pub max_delay: Duration,
}

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5000);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            delay: DEFAULT_RETRY_DELAY,
            backoff: Backoff::Fixed,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Resubmit forever with a fixed delay until the server accepts
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
            backoff: Backoff::Fixed,
            max_delay: delay,
        }
    }

    pub fn bounded(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            delay,
            backoff: Backoff::Fixed,
            max_delay: delay,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff, max_delay: Duration) -> Self {
        self.backoff = backoff;
        self.max_delay = max_delay.max(self.delay);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }

    /// Delays slept before each resubmission, in order
    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        let delays: Box<dyn Iterator<Item = Duration> + Send> = match self.backoff {
            Backoff::Fixed => Box::new(FixedInterval::new(self.delay)),
            Backoff::Exponential => {
                let cap = self.max_delay;
                Box::new(std::iter::successors(Some(self.delay), move |prev| {
                    Some(prev.saturating_mul(2).min(cap))
                }))
            }
        };

        match self.max_attempts {
            Some(attempts) => Box::new(delays.take(attempts.saturating_sub(1) as usize)),
            None => delays,
        }
    }
}
