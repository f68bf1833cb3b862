//! Rule result export

use crate::error::ReportError;
use crate::name::ReportName;
use chrono::SecondsFormat;
use lm_rules::ExecutorResult;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Fixed leading columns of a result report
pub const RESULT_COLUMNS: [&str; 3] = ["entity_id", "value", "anomalous"];

/// Columns prepended to a report when it is ingested
pub const STAMP_COLUMNS: [&str; 4] = ["Date", "Category", "Sheet_ID", "Label"];

/// Column name usable as a table identifier
///
/// Spaces become underscores and dots are removed.
#[must_use]
pub fn normalize_column(name: &str) -> String {
    name.replace(' ', "_").replace('.', "")
}

/// Render a rule result as CSV
///
/// Header is `entity_id,value,anomalous` followed by every extra field name
/// in sorted order. Rows follow result order; missing fields are blank.
///
/// # Errors
/// Propagates CSV encoding failures.
pub fn results_to_csv(result: &ExecutorResult) -> Result<String, ReportError> {
    let fields: BTreeSet<&str> = result
        .values
        .values()
        .flat_map(|value| value.fields.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(RESULT_COLUMNS.iter().copied().chain(fields.iter().copied()))?;
    for (entity_id, value) in &result.values {
        let anomalous = if value.anomalous { "true" } else { "false" };
        let mut record = vec![entity_id.as_str(), value.value.as_str(), anomalous];
        record.extend(
            fields
                .iter()
                .map(|field| value.fields.get(*field).map_or("", String::as_str)),
        );
        writer.write_record(&record)?;
    }
    finish(writer)
}

/// Write a rule result into `dir` under its report file name
///
/// # Errors
/// Invalid report names, CSV failures, and file system failures.
pub fn write_results(
    dir: &Path,
    name: &ReportName,
    result: &ExecutorResult,
) -> Result<PathBuf, ReportError> {
    let path = dir.join(name.format()?);
    let body = results_to_csv(result)?;
    std::fs::write(&path, body).map_err(|e| ReportError::io(&path, e))?;
    tracing::info!("Wrote {} rows to {}", result.len(), path.display());
    Ok(path)
}

/// Prefix every row of a report with the metadata from its file name
///
/// Adds `Date`, `Category`, `Sheet_ID` and `Label` columns and normalizes
/// all column names.
///
/// # Errors
/// Propagates CSV decoding and encoding failures.
pub fn stamp_report(csv_text: &str, name: &ReportName) -> Result<String, ReportError> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = reader.headers()?.clone();
    let date = name.date.to_rfc3339_opts(SecondsFormat::Millis, true);
    let stamp = [
        date.as_str(),
        name.category.as_str(),
        name.sheet_id.as_str(),
        name.label.as_str(),
    ];

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(
        STAMP_COLUMNS
            .iter()
            .copied()
            .chain(headers.iter())
            .map(normalize_column),
    )?;
    for record in reader.records() {
        let record = record?;
        writer.write_record(stamp.iter().copied().chain(record.iter()))?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ReportError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
