// 🗄️ SQLite registration store
// The (period, category, manufacturer) key is UNIQUE, so re-importing a file
// only adds months that are not already present.

use crate::model::{Category, RegistrationRecord, YearMonth};
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub inserted: usize,
    pub duplicates: usize,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    let mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .context("Failed to set journal mode")?;
    debug!(journal_mode = %mode, "database journal mode");

    // ==========================================================================
    // Registrations Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS registrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period TEXT NOT NULL,
            category TEXT NOT NULL,
            manufacturer TEXT NOT NULL,
            registrations INTEGER NOT NULL CHECK (registrations >= 0),
            imported_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (period, category, manufacturer)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_registrations_period ON registrations(period)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_registrations_series ON registrations(category, manufacturer)",
        [],
    )?;

    Ok(())
}

pub fn insert_records(conn: &Connection, records: &[RegistrationRecord]) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    let mut stmt = conn.prepare(
        "INSERT INTO registrations (period, category, manufacturer, registrations)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for record in records {
        let count = i64::try_from(record.count)
            .map_err(|_| anyhow!("registration count {} too large to store", record.count))?;

        let result = stmt.execute(params![
            record.period.to_string(),
            record.category.code(),
            record.manufacturer,
            count,
        ]);

        match result {
            Ok(_) => stats.inserted += 1,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                stats.duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        inserted = stats.inserted,
        duplicates = stats.duplicates,
        "imported registration records"
    );

    Ok(stats)
}

pub fn get_all_records(conn: &Connection) -> Result<Vec<RegistrationRecord>> {
    let mut stmt = conn.prepare(
        "SELECT period, category, manufacturer, registrations
         FROM registrations
         ORDER BY period, category, manufacturer",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(period, category, manufacturer, count)| -> Result<RegistrationRecord> {
            let period: YearMonth = period
                .parse()
                .map_err(|e: String| anyhow!("bad period in database: {}", e))?;
            let category: Category = category
                .parse()
                .map_err(|e: String| anyhow!("bad category in database: {}", e))?;
            let count = u64::try_from(count)
                .map_err(|_| anyhow!("negative registration count in database: {}", count))?;

            Ok(RegistrationRecord {
                period,
                category,
                manufacturer,
                count,
            })
        })
        .collect()
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM registrations", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GeneratorConfig, SampleDataGenerator};

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn sample() -> Vec<RegistrationRecord> {
        SampleDataGenerator::new(GeneratorConfig {
            years: 1,
            end: YearMonth::new(2024, 12).unwrap(),
            seed: Some(17),
        })
        .generate()
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = open();
        setup_database(&conn).unwrap();
        assert_eq!(verify_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_import_and_read_back() {
        let conn = open();
        let records = sample();

        let stats = insert_records(&conn, &records).unwrap();
        assert_eq!(stats.inserted, records.len());
        assert_eq!(stats.duplicates, 0);
        assert_eq!(verify_count(&conn).unwrap(), records.len() as i64);

        let mut expected = records.clone();
        expected.sort_by(|a, b| {
            (a.period, a.category.code(), &a.manufacturer)
                .cmp(&(b.period, b.category.code(), &b.manufacturer))
        });
        assert_eq!(get_all_records(&conn).unwrap(), expected);
    }

    #[test]
    fn test_reimport_skips_existing_keys() {
        let conn = open();
        let records = sample();

        insert_records(&conn, &records).unwrap();
        let stats = insert_records(&conn, &records).unwrap();

        assert_eq!(stats.inserted, 0);
        assert_eq!(stats.duplicates, records.len());
        assert_eq!(verify_count(&conn).unwrap(), records.len() as i64);
    }
}
