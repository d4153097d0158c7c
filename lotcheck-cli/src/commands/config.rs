//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use clap::Subcommand;

use lotcheck::config::ConfigFile;

use crate::error::CliError;
use crate::runner::GlobalOptions;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration
    ///
    /// Values missing from the file are shown with their defaults.
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(options: &GlobalOptions, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(options),
        ConfigCommands::Show => run_show(options),
        ConfigCommands::Init { force } => run_init(options, force),
    }
}

/// Show the configuration file path.
fn run_path(options: &GlobalOptions) -> Result<(), CliError> {
    println!("{}", options.config_path().display());
    Ok(())
}

/// Print the effective configuration.
fn run_show(options: &GlobalOptions) -> Result<(), CliError> {
    let config = options.load_config()?;
    print!("{}", config.to_ini_string());
    Ok(())
}

/// Write a default configuration file.
fn run_init(options: &GlobalOptions, force: bool) -> Result<(), CliError> {
    let path = options.config_path();
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "'{}' already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save_to(&path)?;
    println!("Created {}", path.display());
    println!("Set the [upstream] endpoints and credentials before running checks.");
    Ok(())
}
