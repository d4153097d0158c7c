//! Pacing, worker and escalation configuration.

use std::time::Duration;

use super::defaults::{
    DEFAULT_COOLDOWN_EVERY, DEFAULT_COOLDOWN_MS, DEFAULT_MAX_RETRY_ROUNDS, DEFAULT_MIN_DELAY_MS,
    DEFAULT_PAUSE_POLL_MS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_SECS,
    DEFAULT_RETRY_TIMEOUT_SECS,
};
use crate::subject::DEFAULT_SUBJECT_WIDTH;

/// Configuration for the process-wide pacer.
///
/// # Example
///
/// ```
/// use lotcheck::config::PacerConfig;
/// use std::time::Duration;
///
/// let config = PacerConfig::new().with_min_delay(Duration::from_millis(10));
/// assert_eq!(config.cooldown_every(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacerConfig {
    min_delay: Duration,
    cooldown_every: u64,
    cooldown: Duration,
}

impl PacerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay applied before every upstream call. Default: 1.5s.
    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    /// Set the number of completed results between cool-downs.
    ///
    /// Zero disables cool-downs. Default: 20.
    pub fn with_cooldown_every(mut self, every: u64) -> Self {
        self.cooldown_every = every;
        self
    }

    /// Set the cool-down length. Default: 5s.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn cooldown_every(&self) -> u64 {
        self.cooldown_every
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            cooldown_every: DEFAULT_COOLDOWN_EVERY,
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
        }
    }
}

/// Configuration for lot workers and escalation tasks.
///
/// # Example
///
/// ```
/// use lotcheck::config::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::new()
///     .with_retry_delay(Duration::from_millis(50))
///     .with_max_retry_rounds(2);
/// assert_eq!(config.max_retry_rounds(), 2);
/// assert_eq!(config.subject_width(), 11);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    subject_width: usize,
    pause_poll: Duration,
    settle_delay: Duration,
    request_timeout: Duration,
    retry_timeout: Duration,
    max_retry_rounds: u32,
    retry_delay: Duration,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the zero-padded width of subject IDs. Default: 11.
    pub fn with_subject_width(mut self, width: usize) -> Self {
        self.subject_width = width;
        self
    }

    /// Set how often a paused worker checks for resume. Default: 1s.
    pub fn with_pause_poll(mut self, interval: Duration) -> Self {
        self.pause_poll = interval;
        self
    }

    /// Set the pause a worker takes after recording each result.
    ///
    /// Default: the pacer's minimum delay (1.5s).
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the timeout of a primary evaluation. Default: 60s.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the timeout of an escalation retry. Default: 30s.
    pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = timeout;
        self
    }

    /// Set the number of escalation rounds. Default: 3.
    pub fn with_max_retry_rounds(mut self, rounds: u32) -> Self {
        self.max_retry_rounds = rounds;
        self
    }

    /// Set the delay before each escalation round. Default: 60s.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn subject_width(&self) -> usize {
        self.subject_width
    }

    pub fn pause_poll(&self) -> Duration {
        self.pause_poll
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }

    pub fn max_retry_rounds(&self) -> u32 {
        self.max_retry_rounds
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            subject_width: DEFAULT_SUBJECT_WIDTH,
            pause_poll: Duration::from_millis(DEFAULT_PAUSE_POLL_MS),
            settle_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry_timeout: Duration::from_secs(DEFAULT_RETRY_TIMEOUT_SECS),
            max_retry_rounds: DEFAULT_MAX_RETRY_ROUNDS,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}
