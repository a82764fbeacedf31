// CSV import - bulk-load course records through the ledger
// Rows go through the same validation as the HTTP surface.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::validation::NewCourse;

/// A row that failed validation
#[derive(Debug)]
pub struct RejectedRow {
    /// 1-based line in the file, header included
    pub line: u64,
    pub error: LedgerError,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub rejected: Vec<RejectedRow>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.imported + self.rejected.len()
    }
}

/// One CSV row. CSV has no `null`, so an empty cell stays an empty string for
/// the text columns; only an empty `grade` or `credits` counts as missing.
#[derive(Debug, Deserialize)]
struct CsvCourse {
    #[serde(default, deserialize_with = "text_cell")]
    student_id: Option<String>,
    #[serde(default, deserialize_with = "text_cell")]
    course_name: Option<String>,
    grade: Option<String>,
    credits: Option<f64>,
}

/// Called only when the column exists, so an empty cell is `Some("")`
fn text_cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Some)
}

impl From<CsvCourse> for NewCourse {
    fn from(row: CsvCourse) -> Self {
        NewCourse {
            student_id: row.student_id,
            course_name: row.course_name,
            grade: row.grade,
            credits: row.credits,
        }
    }
}

/// Import a CSV with headers `student_id,course_name,grade,credits`.
///
/// Invalid rows are reported and skipped. Unreadable files, malformed CSV and
/// storage faults abort the import; rows before the failure stay committed.
pub fn import_csv(ledger: &Ledger, csv_path: &Path) -> Result<ImportReport> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    import_reader(ledger, file)
}

pub fn import_reader<R: Read>(ledger: &Ledger, reader: R) -> Result<ImportReport> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut report = ImportReport::default();

    let headers = rdr.headers().context("Failed to read CSV header")?.clone();

    for result in rdr.records() {
        let record = result.context("Failed to read CSV record")?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        let row: CsvCourse = record
            .deserialize(Some(&headers))
            .with_context(|| format!("Failed to deserialize course row at line {}", line))?;

        match ledger.create(row.into()) {
            Ok(_) => report.imported += 1,
            Err(LedgerError::Storage(e)) => return Err(e.context(format!("line {}", line))),
            Err(error) => {
                tracing::warn!(line, %error, "rejected course row");
                report.rejected.push(RejectedRow { line, error });
            }
        }
    }

    tracing::info!(
        imported = report.imported,
        rejected = report.rejected.len(),
        "csv import finished"
    );

    Ok(report)
}
