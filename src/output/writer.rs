//! JSON and CSV export writers

use super::flatten::flatten_record;
use crate::error::{Error, Result, ResultExt};
use crate::types::Record;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON array
    #[default]
    Json,
    /// Flattened CSV with a header row
    Csv,
}

impl ExportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("csv") {
            Some(ExportFormat::Csv)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(ExportFormat::Json)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

/// Write records as CSV and return the number of rows.
///
/// The header is the union of all columns in first-seen order; missing
/// cells are empty.
pub fn write_csv<W: Write>(items: &[Record], writer: W) -> Result<usize> {
    let rows: Vec<HashMap<String, String>> = items
        .iter()
        .map(|item| flatten_record(item).into_iter().collect())
        .collect();

    let mut columns: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for item in items {
        for (column, _) in flatten_record(item) {
            if seen.insert(column.clone()) {
                columns.push(column);
            }
        }
    }

    let mut csv = csv::Writer::from_writer(writer);
    if !columns.is_empty() {
        csv.write_record(&columns)?;
    }
    for row in &rows {
        csv.write_record(
            columns
                .iter()
                .map(|column| row.get(column).map_or("", String::as_str)),
        )?;
    }
    csv.flush()?;

    Ok(rows.len())
}

/// Write records as a pretty-printed JSON array
pub fn write_json<W: Write>(items: &[Record], mut writer: W) -> Result<usize> {
    serde_json::to_writer_pretty(&mut writer, items)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(items.len())
}

/// Write records to a file, creating parent directories
pub fn export(items: &[Record], path: impl AsRef<Path>, format: ExportFormat) -> Result<usize> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::output(format!(
                "Failed to create directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let file = File::create(path)
        .map_err(|e| Error::output(format!("Failed to create {}: {e}", path.display())))?;
    let writer = BufWriter::new(file);

    let written = match format {
        ExportFormat::Json => write_json(items, writer),
        ExportFormat::Csv => write_csv(items, writer),
    }
    .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Exported {written} records to {} ({format})", path.display());
    Ok(written)
}
