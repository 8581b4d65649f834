// Batch Input/Output
// Turns JSON, JSON Lines or CSV input into BatchRows and writes per-item
// results back out as CSV. A record that cannot be read becomes a malformed
// row at its own position; only an unreadable CSV header fails the file.

use crate::error::Result;
use crate::models::{BatchRow, BatchSummary, Label, RowError};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

const TEXT_COLUMN: &str = "text";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BatchFormat {
    /// JSON array of records, or one JSON record per line
    Json,
    /// Header row plus a `text` column
    Csv,
}

impl BatchFormat {
    pub fn from_str(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Some(BatchFormat::Json),
            "csv" => Some(BatchFormat::Csv),
            _ => None,
        }
    }

    /// `.csv` files are CSV, everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => BatchFormat::Csv,
            _ => BatchFormat::Json,
        }
    }
}

/// A JSON array of records, or one record per line. Blank lines are skipped;
/// a line that does not parse becomes an `InvalidJson` row.
pub fn read_json_rows(content: &str) -> Vec<BatchRow> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        if let Ok(serde_json::Value::Array(values)) = serde_json::from_str::<serde_json::Value>(trimmed) {
            return values.iter().map(BatchRow::from_value).collect();
        }
    }
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => BatchRow::from_value(&value),
            Err(e) => BatchRow::Malformed(RowError::InvalidJson { message: e.to_string() }),
        })
        .collect()
}

/// Rows from CSV with a header line. The `text` column is matched without
/// regard to case; extra columns are ignored.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<BatchRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let text_idx = headers.iter().position(|h| h.eq_ignore_ascii_case(TEXT_COLUMN));
    if text_idx.is_none() {
        warn!(headers = ?headers, "batch_io.csv_missing_text_column");
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let row = match (record, text_idx) {
            (Err(e), _) => BatchRow::Malformed(RowError::InvalidCsv { message: e.to_string() }),
            (Ok(_), None) => BatchRow::Malformed(RowError::MissingText),
            (Ok(record), Some(idx)) => match record.get(idx) {
                None => BatchRow::Malformed(RowError::MissingText),
                Some(cell) if cell.trim().is_empty() => BatchRow::Malformed(RowError::EmptyText),
                Some(cell) => BatchRow::Text(cell.to_string()),
            },
        };
        rows.push(row);
    }

    debug!(rows = rows.len(), "batch_io.csv_read");
    Ok(rows)
}

#[derive(Serialize)]
struct CsvResultRow<'a> {
    text: &'a str,
    label: Label,
    ai_confidence: f64,
    human_confidence: f64,
}

/// One CSV line per item in input order: text, label, ai_confidence,
/// human_confidence. `texts[i]` is the input of item `i`; malformed rows
/// carry an empty string.
pub fn write_csv_results<W: Write>(writer: W, texts: &[String], summary: &BatchSummary) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for (idx, item) in summary.items.iter().enumerate() {
        writer.serialize(CsvResultRow {
            text: texts.get(idx).map(String::as_str).unwrap_or(""),
            label: item.label,
            ai_confidence: item.ai_confidence,
            human_confidence: item.human_confidence,
        })?;
    }
    writer.flush()?;
    Ok(())
}
