//! lotcheck CLI - Command-line interface
//!
//! This binary provides batch runs, the HTTP API, offline recovery and
//! configuration management on top of the lotcheck library.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::recover::RecoverArgs;
use commands::run::RunArgs;
use commands::serve::ServeArgs;
use error::CliError;
use runner::GlobalOptions;

#[derive(Parser)]
#[command(name = "lotcheck")]
#[command(version = lotcheck::VERSION)]
#[command(about = "Batch eligibility checks against a rate-limited upstream", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.lotcheck/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every subject in a file and write a CSV report
    ///
    /// The file holds one identifier per line. Progress is printed until
    /// every subject has a final outcome.
    Run {
        /// Newline-separated subject identifiers
        input: PathBuf,

        /// Report path (default: ./<lot-id>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Serve the HTTP API
    ///
    /// Lots with snapshots in the results directory are resumed at startup.
    Serve {
        /// Listen address (overrides [server] bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Export a lot's report from its snapshot without resuming it
    Recover {
        /// Lot identifier
        lot_id: String,

        /// Report path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let options = GlobalOptions {
        config: cli.config,
        debug: cli.debug,
    };

    if let Err(e) = dispatch(&options, cli.command).await {
        e.exit();
    }
}

async fn dispatch(options: &GlobalOptions, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Run { input, output } => {
            commands::run::run(options, RunArgs { input, output }).await
        }
        Commands::Serve { bind } => commands::serve::run(options, ServeArgs { bind }).await,
        Commands::Recover { lot_id, output } => {
            commands::recover::run(options, RecoverArgs { lot_id, output }).await
        }
        Commands::Config(command) => commands::config::run(options, command),
    }
}
