// 📂 Registration CSV files
// Columns: date (YYYY-MM), category (2W/3W/4W), manufacturer, registrations.
// The legacy collector layout (vehicle_category column plus year/quarter/month
// helper columns, YYYY-MM-DD dates) loads as well.

use crate::error::LoadError;
use crate::generator::generate_sample_data;
use crate::model::{Category, RegistrationRecord, YearMonth};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Column order written by `save_csv`
const HEADER: [&str; 4] = ["date", "category", "manufacturer", "registrations"];

/// Largest count accepted on load; the SQLite column is a signed 64-bit integer
const MAX_COUNT: u64 = i64::MAX as u64;

const REQUIRED_COLUMNS: [(&str, Option<&str>); 4] = [
    ("date", None),
    ("category", Some("vehicle_category")),
    ("manufacturer", None),
    ("registrations", None),
];

/// Raw row as it appears in the file, validated field by field
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    #[serde(alias = "vehicle_category")]
    category: String,
    manufacturer: String,
    registrations: String,
}

impl CsvRow {
    fn into_record(self, line: u64) -> Result<RegistrationRecord, LoadError> {
        let date = required(self.date, line, "date")?;
        let category = required(self.category, line, "category")?;
        let manufacturer = required(self.manufacturer, line, "manufacturer")?;
        let registrations = required(self.registrations, line, "registrations")?;

        let period: YearMonth = date
            .parse()
            .map_err(|_| LoadError::InvalidDate { line, value: date.clone() })?;

        let category: Category = category
            .parse()
            .map_err(|_| LoadError::InvalidCategory { line, value: category.clone() })?;

        let count: u64 = registrations
            .parse()
            .ok()
            .filter(|count| *count <= MAX_COUNT)
            .ok_or_else(|| LoadError::InvalidCount { line, value: registrations.clone() })?;

        Ok(RegistrationRecord {
            period,
            category,
            manufacturer,
            count,
        })
    }
}

fn required(value: String, line: u64, column: &'static str) -> Result<String, LoadError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(LoadError::MissingValue { line, column })
    } else {
        Ok(trimmed.to_string())
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Read a registration table from any CSV source
pub fn read_records<R: io::Read>(reader: R) -> Result<Vec<RegistrationRecord>, LoadError> {
    let mut rdr = csv::Reader::from_reader(reader);
    read_from(&mut rdr)
}

pub fn load_csv(path: &Path) -> Result<Vec<RegistrationRecord>, LoadError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let records = read_from(&mut rdr)?;
    info!(path = %path.display(), records = records.len(), "loaded registration data");
    Ok(records)
}

fn read_from<R: io::Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<RegistrationRecord>, LoadError> {
    let headers = rdr
        .headers()
        .map_err(|source| LoadError::Malformed { line: 1, source })?
        .clone();

    for (column, alias) in REQUIRED_COLUMNS {
        let present = headers
            .iter()
            .any(|h| h.trim() == column || Some(h.trim()) == alias);
        if !present {
            return Err(LoadError::MissingColumn { column });
        }
    }

    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for result in rdr.records() {
        let raw = result.map_err(|source| LoadError::Malformed {
            line: source.position().map_or(0, |p| p.line()),
            source,
        })?;
        let line = raw.position().map_or(0, |p| p.line());

        let row: CsvRow = raw
            .deserialize(Some(&headers))
            .map_err(|source| LoadError::Malformed { line, source })?;
        let record = row.into_record(line)?;

        let key = (record.period, record.category, record.manufacturer.clone());
        if !seen.insert(key) {
            return Err(LoadError::DuplicateRecord {
                line,
                period: record.period.to_string(),
                category: record.category.to_string(),
                manufacturer: record.manufacturer,
            });
        }

        records.push(record);
    }

    Ok(records)
}

/// Load `path` if it exists, otherwise fall back to generated sample data
pub fn load_or_generate(
    path: &Path,
    years: i32,
    seed: Option<u64>,
) -> Result<Vec<RegistrationRecord>, LoadError> {
    if path.exists() {
        load_csv(path)
    } else {
        warn!(path = %path.display(), "data file not found, using generated sample data");
        Ok(generate_sample_data(years, seed))
    }
}

// ============================================================================
// SAVING
// ============================================================================

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "registrations.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Header first, even for an empty table, so the file always loads back
fn write_table(path: &Path, records: &[RegistrationRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(HEADER).context("Failed to write CSV header")?;
    for record in records {
        writer
            .serialize(record)
            .context("Failed to serialize registration record")?;
    }
    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Write the table, replacing any existing file in one rename.
///
/// Readers see either the old file or the new one, never a half-written file.
pub fn save_csv(path: &Path, records: &[RegistrationRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let temp_path = temp_path_for(path);

    let written = write_table(&temp_path, records).and_then(|()| {
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to replace {}", path.display()))
    });
    if let Err(e) = written {
        if temp_path.exists() {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                warn!(path = %temp_path.display(), error = %cleanup, "failed to remove temp file");
            }
        }
        return Err(e);
    }

    info!(path = %path.display(), records = records.len(), "saved registration data");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
