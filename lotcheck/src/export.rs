//! Lot reports.
//!
//! A report lists every subject of a lot exactly once: recorded visible
//! outcomes first, in submission order, then a `Pending` row for each
//! subject still without one. [`write_csv`] renders the rows as RFC 4180
//! CSV.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

use crate::outcome::Outcome;
use crate::subject::SubjectId;

/// CSV header line.
pub const CSV_HEADER: &str = "subject_id,gross_balance,released_amount,status,message";

/// Report export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// Builds report rows for `subjects` from their recorded outcomes.
///
/// Hidden outcomes and outcomes for subjects outside the list are skipped.
pub fn report_rows(subjects: &[SubjectId], results: &[Outcome]) -> Vec<Outcome> {
    let visible: HashMap<&SubjectId, &Outcome> = results
        .iter()
        .filter(|o| o.counts_as_completed())
        .map(|o| (&o.subject_id, o))
        .collect();

    let recorded = subjects
        .iter()
        .filter_map(|s| visible.get(s).map(|o| (*o).clone()));
    let pending = subjects
        .iter()
        .filter(|s| !visible.contains_key(s))
        .map(|s| Outcome::pending(s.clone()));

    recorded.chain(pending).collect()
}

/// Writes `rows` as CSV.
pub fn write_csv<W: Write>(mut writer: W, rows: &[Outcome]) -> Result<(), ExportError> {
    writeln!(writer, "{}", CSV_HEADER)?;
    for row in rows {
        writeln!(
            writer,
            "{},{:.2},{:.2},{},{}",
            quote(row.subject_id.as_str()),
            row.gross_balance,
            row.released_amount,
            quote(row.status.label()),
            quote(&row.message)
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `rows` as CSV to `path`, replacing any existing file.
pub fn write_csv_file(path: &Path, rows: &[Outcome]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv(io::BufWriter::new(file), rows)
}

/// Quotes a field when it contains a delimiter, quote or line break.
fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
