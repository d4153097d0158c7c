//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::io;
use std::process;

use lotcheck::config::ConfigFileError;
use lotcheck::export::ExportError;
use lotcheck::lot::{LotError, SnapshotError};
use lotcheck::upstream::TransportError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Upstream credentials or endpoints missing
    NotConfigured,
    /// Failed to build the HTTP client
    HttpClient(TransportError),
    /// Failed to read an input file
    FileRead { path: String, error: io::Error },
    /// Failed to write the report
    Export { path: String, error: ExportError },
    /// Lot lookup or snapshot failure
    Lot(LotError),
    /// HTTP server error
    Serve(io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::NotConfigured => {
                eprintln!();
                eprintln!("Set the upstream endpoints and credentials first:");
                eprintln!("  1. Run: lotcheck config init");
                eprintln!("  2. Edit the [upstream] section of the file it prints");
            }
            CliError::Lot(LotError::NotFound(_)) => {
                eprintln!();
                eprintln!("Lot snapshots are stored in the configured results_dir.");
                eprintln!("Check the lot id and the [lots] section of your config.");
            }
            CliError::Serve(_) => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Address in use: choose another one with --bind");
                eprintln!("  2. Permissions: ports below 1024 need elevated rights");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::NotConfigured => write!(f, "Upstream service is not configured"),
            CliError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read file '{}': {}", path, error)
            }
            CliError::Export { path, error } => {
                write!(f, "Failed to write report '{}': {}", path, error)
            }
            CliError::Lot(e) => write!(f, "{}", e),
            CliError::Serve(e) => write!(f, "HTTP server error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::HttpClient(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            CliError::Export { error, .. } => Some(error),
            CliError::Lot(e) => Some(e),
            CliError::Serve(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LotError> for CliError {
    fn from(e: LotError) -> Self {
        CliError::Lot(e)
    }
}

impl From<SnapshotError> for CliError {
    fn from(e: SnapshotError) -> Self {
        CliError::Lot(e.into())
    }
}
