//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, logging initialization and registry
//! construction so command handlers stay small.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use lotcheck::config::{config_file_path, ConfigFile};
use lotcheck::engine::{EngineContext, Pacer};
use lotcheck::logging::{init_logging, LoggingGuard};
use lotcheck::lot::{LotRegistry, SnapshotStore};
use lotcheck::quota::DailyQuotaFile;
use lotcheck::upstream::{ReqwestClient, UpstreamClient};

use crate::error::CliError;

/// Registry type used by every command.
pub type Registry = LotRegistry<ReqwestClient>;

/// Global options shared by all subcommands.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Alternate configuration file
    pub config: Option<PathBuf>,
    /// Enable debug-level logging
    pub debug: bool,
}

impl GlobalOptions {
    /// Path of the configuration file in effect.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config_file_path)
    }

    /// Load the configuration file, or defaults when it does not exist.
    pub fn load_config(&self) -> Result<ConfigFile, CliError> {
        Ok(ConfigFile::load_from(&self.config_path())?)
    }
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Load config and initialize logging.
    ///
    /// # Arguments
    ///
    /// * `options` - Global command-line options
    /// * `stdout_enabled` - Mirror log events to stdout
    pub fn new(options: &GlobalOptions, stdout_enabled: bool) -> Result<Self, CliError> {
        let config = options.load_config()?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let logging_guard = init_logging(&log_dir, &log_file, stdout_enabled, options.debug)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("lotcheck v{}", lotcheck::VERSION);
        info!("lotcheck CLI: {} command", command);
    }

    /// Snapshot store over the configured results directory.
    pub fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::new(&self.config.lots.results_dir)
    }

    /// Build a registry wired to the real upstream service.
    pub fn create_registry(&self) -> Result<Registry, CliError> {
        let upstream = self.config.upstream_config();
        if !upstream.is_configured() {
            return Err(CliError::NotConfigured);
        }

        let http = ReqwestClient::new().map_err(CliError::HttpClient)?;
        let client = UpstreamClient::new(http, upstream);

        let context = EngineContext::new(client, self.snapshot_store())
            .with_pacer(Arc::new(Pacer::new(self.config.pacer_config())))
            .with_quota(Arc::new(DailyQuotaFile::new(&self.config.lots.quota_file)))
            .with_policy(self.config.rate_limit_policy())
            .with_config(self.config.engine_config());

        info!(
            results_dir = %self.config.lots.results_dir.display(),
            "Lot registry created"
        );
        Ok(LotRegistry::new(context))
    }
}

/// Split a log file path into its directory and file name.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "lotcheck.log".to_string());
    (dir, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, file) = split_log_path(Path::new("/var/log/lotcheck/app.log"));
        assert_eq!(dir, PathBuf::from("/var/log/lotcheck"));
        assert_eq!(file, "app.log");
    }

    #[test]
    fn test_split_bare_file_name() {
        let (dir, file) = split_log_path(Path::new("app.log"));
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(file, "app.log");
    }

    #[test]
    fn test_config_path_override() {
        let options = GlobalOptions {
            config: Some(PathBuf::from("/tmp/custom.ini")),
            debug: false,
        };
        assert_eq!(options.config_path(), PathBuf::from("/tmp/custom.ini"));
    }

    #[test]
    fn test_load_missing_config_gives_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let options = GlobalOptions {
            config: Some(temp.path().join("absent.ini")),
            debug: false,
        };
        let config = options.load_config().unwrap();
        assert_eq!(config.lots.subject_width, 11);
    }
}
