//! Run command - check every subject in a file and write a CSV report.
//!
//! The lot is snapshotted like any other, so an interrupted run can be
//! resumed later with `lotcheck serve` or exported with `lotcheck recover`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use lotcheck::export::write_csv_file;
use lotcheck::lot::{LotId, LotStatus};
use lotcheck::subject::parse_subject_lines;

use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions, Registry};

/// Interval between progress lines.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Arguments for the run command.
pub struct RunArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

/// Run the run command.
pub async fn run(options: &GlobalOptions, args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(options, false)?;
    runner.log_startup("run");

    let raw = load_subjects(&args.input)?;

    let registry = runner.create_registry()?;
    let lot_id = registry.submit(raw).await;
    let output = args
        .output
        .unwrap_or_else(|| default_report_path(&lot_id));

    println!("Lot {} submitted", lot_id);
    println!();

    let interrupted = tokio::select! {
        result = wait_until_finalized(&registry, &lot_id) => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };
    println!();

    if interrupted {
        info!(lot_id = %lot_id, "Run interrupted");
        println!("Interrupted. Progress is saved; the report is partial.");
        println!("Resume with: lotcheck serve");
    }

    let rows = registry.report(&lot_id).await?;
    write_csv_file(&output, &rows).map_err(|e| CliError::Export {
        path: output.display().to_string(),
        error: e,
    })?;

    let status = registry.status(&lot_id).await?;
    for outcome in &status.results {
        println!("  {}", outcome.summary_line());
    }
    println!();
    println!("Report written to {}", output.display());
    println!(
        "  {} of {} completed, {} authorized",
        status.completed, status.total, status.authorized
    );
    info!(lot_id = %lot_id, path = %output.display(), "Report written");

    Ok(())
}

/// Reads newline-separated identifiers, rejecting files with none.
fn load_subjects(path: &Path) -> Result<Vec<String>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::FileRead {
        path: path.display().to_string(),
        error: e,
    })?;
    let raw: Vec<String> = parse_subject_lines(&text)
        .into_iter()
        .map(str::to_string)
        .collect();
    if raw.is_empty() {
        return Err(CliError::Config(format!(
            "No subject identifiers found in '{}'",
            path.display()
        )));
    }
    Ok(raw)
}

/// Polls the lot, printing a progress line, until it finalizes.
async fn wait_until_finalized(registry: &Registry, lot_id: &LotId) -> Result<(), CliError> {
    loop {
        let status = registry.status(lot_id).await?;
        print_progress(&status);
        if status.finalized {
            return Ok(());
        }
        tokio::time::sleep(PROGRESS_INTERVAL).await;
    }
}

fn print_progress(status: &LotStatus) {
    print!("\r{}", progress_line(status));
    let _ = std::io::stdout().flush();
}

fn progress_line(status: &LotStatus) -> String {
    let mut line = format!(
        "[{:>3}%] {}/{} completed, {} authorized",
        status.percent, status.completed, status.total, status.authorized
    );
    if status.pending_retries > 0 {
        line.push_str(&format!(", {} retrying", status.pending_retries));
    }
    line
}

fn default_report_path(lot_id: &LotId) -> PathBuf {
    Path::new(".").join(format!("{}.csv", lot_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lotcheck::lot::WorkerState;

    fn status(completed: usize, total: usize, pending_retries: usize) -> LotStatus {
        LotStatus {
            lot_id: LotId::parse("lot-1").unwrap(),
            created_at: Utc::now(),
            total,
            completed,
            percent: ((completed * 100) / total.max(1)) as u8,
            authorized: completed,
            queued: total - completed,
            pending_retries,
            paused: false,
            finalized: completed == total,
            worker: WorkerState::Running,
            results: Vec::new(),
            quota_today: 0,
        }
    }

    #[test]
    fn test_progress_line() {
        assert_eq!(
            progress_line(&status(1, 4, 0)),
            "[ 25%] 1/4 completed, 1 authorized"
        );
    }

    #[test]
    fn test_progress_line_shows_retries() {
        assert!(progress_line(&status(2, 4, 1)).ends_with(", 1 retrying"));
    }

    #[test]
    fn test_load_subjects_skips_blank_lines() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("subjects.txt");
        std::fs::write(&path, "123\r\n\n  456 \n\n").unwrap();

        assert_eq!(load_subjects(&path).unwrap(), vec!["123", "456"]);
    }

    #[test]
    fn test_load_subjects_rejects_empty_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("empty.txt");
        std::fs::write(&path, "\n\n").unwrap();

        assert!(matches!(load_subjects(&path), Err(CliError::Config(_))));
    }

    #[test]
    fn test_load_subjects_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = load_subjects(&temp.path().join("absent.txt"));
        assert!(matches!(result, Err(CliError::FileRead { .. })));
    }

    #[test]
    fn test_default_report_path_uses_lot_id() {
        let id = LotId::parse("20260101T000000000-0001").unwrap();
        assert_eq!(
            default_report_path(&id),
            Path::new(".").join("20260101T000000000-0001.csv")
        );
    }
}
