//! Configuration for lotcheck components.
//!
//! Two layers:
//!
//! - [`ConfigFile`] - the user's `~/.lotcheck/config.ini`, one settings struct
//!   per INI section
//! - runtime objects ([`UpstreamConfig`], [`PacerConfig`], [`EngineConfig`])
//!   built from it, or directly with their `with_*` setters
//!
//! # Example
//!
//! ```
//! use lotcheck::config::{ConfigFile, EngineConfig};
//!
//! let file = ConfigFile::default();
//! let engine = file.engine_config();
//! assert_eq!(engine, EngineConfig::default());
//! ```

mod defaults;
mod engine;
mod file;
mod parser;
mod settings;
mod upstream;
mod writer;

pub use defaults::*;
pub use engine::{EngineConfig, PacerConfig};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, LoggingSettings, LotsSettings, PacingSettings, RetrySettings, ServerSettings,
    UpstreamSettings,
};
pub use upstream::UpstreamConfig;
