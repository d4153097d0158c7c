//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Upstream endpoints, credentials and timeouts
    pub upstream: UpstreamSettings,
    /// Request spacing and cool-down
    pub pacing: PacingSettings,
    /// Escalation of throttled subjects
    pub retry: RetrySettings,
    /// Lot storage
    pub lots: LotsSettings,
    /// HTTP API
    pub server: ServerSettings,
    /// Logging
    pub logging: LoggingSettings,
}

/// Upstream service configuration.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Login exchange URL
    pub login_url: String,
    /// Evaluation exchange URL
    pub simulate_url: String,
    pub username: String,
    pub password: String,
    /// Token lifetime used when the login response omits one
    pub token_ttl_secs: u64,
    /// Seconds subtracted from the token lifetime
    pub token_safety_margin_secs: u64,
    pub login_timeout_secs: u64,
    /// Timeout for primary evaluation requests
    pub request_timeout_secs: u64,
    /// Timeout for escalation retry requests
    pub retry_timeout_secs: u64,
}

/// Pacing configuration.
#[derive(Debug, Clone)]
pub struct PacingSettings {
    /// Minimum delay before every upstream call, in milliseconds
    pub min_delay_ms: u64,
    /// Completed results between cool-down pauses (0 disables)
    pub cooldown_every: u64,
    /// Cool-down length in milliseconds
    pub cooldown_ms: u64,
    /// Poll interval of a paused worker in milliseconds
    pub pause_poll_ms: u64,
}

/// Escalation configuration.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Rounds attempted before giving up on a throttled subject
    pub max_rounds: u32,
    /// Delay before each round, in seconds
    pub delay_secs: u64,
    /// Case-insensitive phrases identifying a throttling response
    pub rate_limit_patterns: Vec<String>,
}

/// Lot configuration.
#[derive(Debug, Clone)]
pub struct LotsSettings {
    /// Zero-padded width of a normalized subject ID
    pub subject_width: usize,
    /// Directory holding one snapshot file per lot
    pub results_dir: PathBuf,
    /// Daily quota counter file
    pub quota_file: PathBuf,
}

/// HTTP API configuration.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Socket address to bind
    pub bind: String,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
