//! Configuration file handling for ~/.lotcheck/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::engine::{EngineConfig, PacerConfig};
use super::settings::ConfigFile;
use super::upstream::UpstreamConfig;
use crate::upstream::RateLimitPolicy;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.lotcheck/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, self.to_ini_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Render the configuration as commented INI text.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Endpoint, credential and timeout settings for the upstream client.
    pub fn upstream_config(&self) -> UpstreamConfig {
        let u = &self.upstream;
        UpstreamConfig::new(&u.login_url, &u.simulate_url)
            .with_credentials(&u.username, &u.password)
            .with_token_ttl(Duration::from_secs(u.token_ttl_secs))
            .with_safety_margin(Duration::from_secs(u.token_safety_margin_secs))
            .with_login_timeout(Duration::from_secs(u.login_timeout_secs))
            .with_request_timeout(Duration::from_secs(u.request_timeout_secs))
            .with_retry_timeout(Duration::from_secs(u.retry_timeout_secs))
    }

    /// Pacer settings.
    pub fn pacer_config(&self) -> PacerConfig {
        PacerConfig::new()
            .with_min_delay(Duration::from_millis(self.pacing.min_delay_ms))
            .with_cooldown_every(self.pacing.cooldown_every)
            .with_cooldown(Duration::from_millis(self.pacing.cooldown_ms))
    }

    /// Worker and escalation settings.
    pub fn engine_config(&self) -> EngineConfig {
        let u = &self.upstream;
        EngineConfig::new()
            .with_subject_width(self.lots.subject_width)
            .with_pause_poll(Duration::from_millis(self.pacing.pause_poll_ms))
            .with_settle_delay(Duration::from_millis(self.pacing.min_delay_ms))
            .with_request_timeout(Duration::from_secs(u.request_timeout_secs))
            .with_retry_timeout(Duration::from_secs(u.retry_timeout_secs))
            .with_max_retry_rounds(self.retry.max_rounds)
            .with_retry_delay(Duration::from_secs(self.retry.delay_secs))
    }

    /// Throttling phrase policy.
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.retry.rate_limit_patterns.iter().map(String::as_str))
    }
}

/// Get the path to the config directory (~/.lotcheck).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lotcheck")
}

/// Get the path to the config file (~/.lotcheck/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
