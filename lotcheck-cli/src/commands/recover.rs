//! Recover command - export a lot straight from its snapshot.
//!
//! Reads the snapshot without starting any work, so it is safe to run while
//! a server owns the lot.

use std::path::PathBuf;

use tracing::info;

use lotcheck::export::write_csv_file;
use lotcheck::lot::{LotError, LotId};
use lotcheck::outcome::OutcomeStatus;

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Arguments for the recover command.
pub struct RecoverArgs {
    pub lot_id: String,
    pub output: PathBuf,
}

/// Run the recover command.
pub async fn run(options: &GlobalOptions, args: RecoverArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(options, false)?;
    runner.log_startup("recover");

    let lot_id = LotId::parse(&args.lot_id)
        .ok_or_else(|| CliError::Lot(LotError::NotFound(args.lot_id.clone())))?;

    let rows = runner.snapshot_store().recovered_view(&lot_id).await?;
    write_csv_file(&args.output, &rows).map_err(|e| CliError::Export {
        path: args.output.display().to_string(),
        error: e,
    })?;

    let pending = rows
        .iter()
        .filter(|o| o.status == OutcomeStatus::Pending)
        .count();
    info!(lot_id = %lot_id, rows = rows.len(), pending, "Recovered report written");
    println!("Report for lot {} written to {}", lot_id, args.output.display());
    println!("  {} subjects, {} still pending", rows.len(), pending);

    Ok(())
}
