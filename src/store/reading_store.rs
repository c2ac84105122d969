//! SQLite-backed `city_metrics` table.
//!
//! The table is append-only: ingestion inserts, training and the dashboard
//! read snapshots. Timestamps are stored as fixed-width RFC 3339 UTC strings,
//! which makes `ORDER BY timestamp` chronological.

use crate::store::error::StoreError;
use crate::types::reading::Reading;
use crate::utils::ensure_dir_exists;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS city_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    area_name TEXT NOT NULL,
    aqi REAL,
    pm25 REAL,
    pm10 REAL,
    no2 REAL,
    o3 REAL,
    co REAL,
    temperature REAL,
    humidity REAL
);
CREATE INDEX IF NOT EXISTS city_metrics_area_timestamp
    ON city_metrics (area_name, timestamp);";

/// Measurement columns, in `Reading` field order.
pub const MEASUREMENT_COLUMNS: [&str; 8] = [
    "aqi",
    "pm25",
    "pm10",
    "no2",
    "o3",
    "co",
    "temperature",
    "humidity",
];

fn measurements(reading: &Reading) -> [Option<f64>; 8] {
    [
        reading.aqi,
        reading.pm25,
        reading.pm10,
        reading.no2,
        reading.o3,
        reading.co,
        reading.temperature,
        reading.humidity,
    ]
}

/// `SELECT` over `city_metrics` with every measurement column in a fixed
/// position. Columns the table lacks are selected as `NULL`.
fn select_columns(present: &[String]) -> String {
    let measurements: Vec<String> = MEASUREMENT_COLUMNS
        .iter()
        .map(|&column| {
            if present.iter().any(|name| name == column) {
                column.to_string()
            } else {
                format!("NULL AS {column}")
            }
        })
        .collect();
    format!(
        "SELECT timestamp, area_name, {} FROM city_metrics",
        measurements.join(", ")
    )
}

fn insert_reading(present: &[&str]) -> String {
    let columns: Vec<&str> = ["timestamp", "area_name"]
        .into_iter()
        .chain(present.iter().copied())
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO city_metrics ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| StoreError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })
}

/// Column values as SQLite returns them, before the timestamp is parsed.
struct StoredRow {
    timestamp: String,
    reading: Reading,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut reading = Reading::empty(row.get::<_, String>(1)?, DateTime::<Utc>::UNIX_EPOCH);
        reading.aqi = row.get(2)?;
        reading.pm25 = row.get(3)?;
        reading.pm10 = row.get(4)?;
        reading.no2 = row.get(5)?;
        reading.o3 = row.get(6)?;
        reading.co = row.get(7)?;
        reading.temperature = row.get(8)?;
        reading.humidity = row.get(9)?;
        Ok(Self {
            timestamp: row.get(0)?,
            reading,
        })
    }

    fn into_reading(self) -> Result<Reading, StoreError> {
        let mut reading = self.reading;
        reading.timestamp = parse_timestamp(&self.timestamp)?;
        Ok(reading)
    }
}

pub struct ReadingStore {
    conn: Connection,
}

impl ReadingStore {
    /// Opens (or creates) the SQLite file at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir_exists(parent)
                .map_err(|e| StoreError::DirCreation(parent.to_path_buf(), e))?;
        }
        let conn =
            Connection::open(path).map_err(|e| StoreError::Open(path.to_path_buf(), e))?;
        info!("Opened reading store at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Open(":memory:".into(), e))?;
        Ok(Self { conn })
    }

    /// Creates `city_metrics` if it does not exist yet. Safe to call every run.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(CREATE_TABLE)
            .map_err(StoreError::Schema)
    }

    /// Column names of `city_metrics`, in table order. Empty if the table
    /// does not exist.
    pub fn columns(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(city_metrics)")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Measurement columns an older `city_metrics` table was created without.
    pub fn missing_columns(&self) -> Result<Vec<&'static str>, StoreError> {
        let present = self.columns()?;
        Ok(MEASUREMENT_COLUMNS
            .into_iter()
            .filter(|&column| !present.iter().any(|name| name == column))
            .collect())
    }

    /// Appends `readings` in one transaction and returns how many were inserted.
    ///
    /// Values for measurement columns the table lacks are dropped.
    pub fn append(&mut self, readings: &[Reading]) -> Result<usize, StoreError> {
        let present = self.columns()?;
        let keep: Vec<bool> = MEASUREMENT_COLUMNS
            .iter()
            .map(|&column| present.iter().any(|name| name == column))
            .collect();
        let kept_columns: Vec<&str> = MEASUREMENT_COLUMNS
            .iter()
            .zip(&keep)
            .filter(|&(_, &kept)| kept)
            .map(|(&column, _)| column)
            .collect();
        if kept_columns.len() < MEASUREMENT_COLUMNS.len() && !readings.is_empty() {
            warn!(
                "city_metrics has no column for some measurements; storing only {}",
                kept_columns.join(", ")
            );
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&insert_reading(&kept_columns))?;
            for reading in readings {
                let values = [
                    Value::Text(format_timestamp(&reading.timestamp)),
                    Value::Text(reading.area_name.clone()),
                ]
                .into_iter()
                .chain(
                    measurements(reading)
                        .into_iter()
                        .zip(&keep)
                        .filter(|&(_, &kept)| kept)
                        .map(|(value, _)| value.map_or(Value::Null, Value::Real)),
                );
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;
        debug!("Appended {} readings to city_metrics", readings.len());
        Ok(readings.len())
    }

    /// Snapshot of every reading, oldest first.
    pub fn load_all(&self) -> Result<Vec<Reading>, StoreError> {
        let select = self.select_columns()?;
        self.query_readings(&format!("{select} ORDER BY timestamp ASC, id ASC"), params![])
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM city_metrics", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    /// Distinct area names, sorted.
    pub fn area_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT area_name FROM city_metrics ORDER BY area_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// The newest reading of every area, ordered by area name.
    pub fn latest_per_area(&self) -> Result<Vec<Reading>, StoreError> {
        let select = self.select_columns()?;
        self.query_readings(
            &format!(
                "{select} AS c
                 WHERE c.id = (
                     SELECT i.id FROM city_metrics i
                     WHERE i.area_name = c.area_name
                     ORDER BY i.timestamp DESC, i.id DESC
                     LIMIT 1
                 )
                 ORDER BY c.area_name"
            ),
            params![],
        )
    }

    /// Readings of one area at or after `since`, oldest first.
    pub fn history(&self, area: &str, since: DateTime<Utc>) -> Result<Vec<Reading>, StoreError> {
        let select = self.select_columns()?;
        self.query_readings(
            &format!(
                "{select} WHERE area_name = ?1 AND timestamp >= ?2
                 ORDER BY timestamp ASC, id ASC"
            ),
            params![area, format_timestamp(&since)],
        )
    }

    fn select_columns(&self) -> Result<String, StoreError> {
        Ok(select_columns(&self.columns()?))
    }

    fn query_readings<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<Reading>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, StoredRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(StoredRow::into_reading).collect()
    }
}
