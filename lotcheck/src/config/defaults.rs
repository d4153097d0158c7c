//! Default values for all configuration settings.
//!
//! Contains the `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::subject::DEFAULT_SUBJECT_WIDTH;
use crate::upstream::DEFAULT_RATE_LIMIT_PATTERNS;

// =============================================================================
// [upstream]
// =============================================================================

/// Token lifetime assumed when the login response has no TTL.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Margin subtracted from the token TTL.
pub const DEFAULT_TOKEN_SAFETY_MARGIN_SECS: u64 = 60;

/// Timeout for the login exchange.
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 10;

/// Timeout for a primary evaluation request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Timeout for an escalation retry request.
pub const DEFAULT_RETRY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// [pacing]
// =============================================================================

/// Minimum spacing between upstream calls, process wide.
pub const DEFAULT_MIN_DELAY_MS: u64 = 1500;

/// Number of completed results between cool-down pauses.
pub const DEFAULT_COOLDOWN_EVERY: u64 = 20;

/// Length of the cool-down pause.
pub const DEFAULT_COOLDOWN_MS: u64 = 5000;

/// How often a paused worker checks for resume.
pub const DEFAULT_PAUSE_POLL_MS: u64 = 1000;

// =============================================================================
// [retry]
// =============================================================================

/// Escalation rounds before a throttled subject is given up on.
pub const DEFAULT_MAX_RETRY_ROUNDS: u32 = 3;

/// Delay before each escalation round.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 60;

// =============================================================================
// [server]
// =============================================================================

/// Default bind address for `lotcheck serve`.
pub const DEFAULT_SERVER_BIND: &str = "127.0.0.1:8890";

// =============================================================================
// Paths
// =============================================================================

/// Default directory for lot snapshots (~/.lotcheck/results).
pub fn default_results_dir() -> PathBuf {
    config_directory().join("results")
}

/// Default daily quota counter file (~/.lotcheck/quota.json).
pub fn default_quota_file() -> PathBuf {
    config_directory().join("quota.json")
}

/// Default log file (~/.lotcheck/lotcheck.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join("lotcheck.log")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            upstream: UpstreamSettings {
                login_url: String::new(),
                simulate_url: String::new(),
                username: String::new(),
                password: String::new(),
                token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
                token_safety_margin_secs: DEFAULT_TOKEN_SAFETY_MARGIN_SECS,
                login_timeout_secs: DEFAULT_LOGIN_TIMEOUT_SECS,
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                retry_timeout_secs: DEFAULT_RETRY_TIMEOUT_SECS,
            },
            pacing: PacingSettings {
                min_delay_ms: DEFAULT_MIN_DELAY_MS,
                cooldown_every: DEFAULT_COOLDOWN_EVERY,
                cooldown_ms: DEFAULT_COOLDOWN_MS,
                pause_poll_ms: DEFAULT_PAUSE_POLL_MS,
            },
            retry: RetrySettings {
                max_rounds: DEFAULT_MAX_RETRY_ROUNDS,
                delay_secs: DEFAULT_RETRY_DELAY_SECS,
                rate_limit_patterns: DEFAULT_RATE_LIMIT_PATTERNS
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
            },
            lots: LotsSettings {
                subject_width: DEFAULT_SUBJECT_WIDTH,
                results_dir: default_results_dir(),
                quota_file: default_quota_file(),
            },
            server: ServerSettings {
                bind: DEFAULT_SERVER_BIND.to_string(),
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
