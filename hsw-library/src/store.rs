//! SQLite store for analyzed audio files
//!
//! One row per file name: sample rate and duration. Storing a name that is
//! already present replaces the old row.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid record for '{file_name}': {reason}")]
    InvalidRecord {
        file_name: String,
        reason: &'static str,
    },
}

/// One analyzed audio file
///
/// Serde names match the library CSV header, so rows deserialize directly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioRecord {
    #[serde(rename = "File Name")]
    pub file_name: String,
    #[serde(rename = "Sample Rate (Hz)")]
    pub sample_rate: u32,
    #[serde(rename = "Duration (seconds)")]
    pub duration_secs: f64,
}

impl AudioRecord {
    pub fn new(file_name: impl Into<String>, sample_rate: u32, duration_secs: f64) -> Self {
        Self {
            file_name: file_name.into(),
            sample_rate,
            duration_secs,
        }
    }

    /// Check the record invariants: non-empty name, positive rate and duration
    pub fn validate(&self) -> Result<(), StoreError> {
        let reason = if self.file_name.trim().is_empty() {
            "file name is empty"
        } else if self.sample_rate == 0 {
            "sample rate must be positive"
        } else if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            "duration must be positive"
        } else {
            return Ok(());
        };

        Err(StoreError::InvalidRecord {
            file_name: self.file_name.clone(),
            reason,
        })
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            file_name: row.get(0)?,
            sample_rate: row.get(1)?,
            duration_secs: row.get(2)?,
        })
    }
}

/// Round a duration to one decimal place, as stored
pub fn round_duration(duration_secs: f64) -> f64 {
    (duration_secs * 10.0).round() / 10.0
}

/// Audio library backed by SQLite
pub struct AudioLibrary {
    conn: Connection,
}

impl AudioLibrary {
    /// SQL schema for the audio_files table
    ///
    /// Tables created without the UNIQUE constraint on `file_name` are
    /// deduplicated (newest row wins) and get a unique index instead.
    const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS audio_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_name TEXT UNIQUE NOT NULL,
            sample_rate INTEGER NOT NULL,
            duration_seconds REAL NOT NULL
        );
        DELETE FROM audio_files
            WHERE id NOT IN (SELECT MAX(id) FROM audio_files GROUP BY file_name);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_file_name ON audio_files(file_name);
    "#;

    const COLUMNS: &'static str = "file_name, sample_rate, duration_seconds";

    /// Open or create a library database at the given path
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(Self::SCHEMA)?;
        tracing::debug!("Opened audio library at {}", db_path.display());
        Ok(Self { conn })
    }

    /// Open an in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(Self::SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert a record, replacing any existing row with the same file name
    pub fn upsert(&self, record: &AudioRecord) -> Result<(), StoreError> {
        record.validate()?;

        self.conn.execute(
            r#"INSERT OR REPLACE INTO audio_files
               (file_name, sample_rate, duration_seconds)
               VALUES (?1, ?2, ?3)"#,
            params![record.file_name, record.sample_rate, record.duration_secs],
        )?;
        Ok(())
    }

    /// Store the analysis of `path` under its base name
    ///
    /// The duration is rounded to one decimal place first, so a clip shorter
    /// than 0.05s is rejected.
    pub fn save_file(
        &self,
        path: &Path,
        sample_rate: u32,
        duration_secs: f64,
    ) -> Result<AudioRecord, StoreError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let record = AudioRecord::new(file_name, sample_rate, round_duration(duration_secs));
        self.upsert(&record)?;
        tracing::info!("Saved to database: {}", record.file_name);
        Ok(record)
    }

    /// Look up one file by name
    pub fn get(&self, file_name: &str) -> Result<Option<AudioRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {} FROM audio_files WHERE file_name = ?1", Self::COLUMNS),
                [file_name],
                AudioRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// All records in insertion order
    pub fn all(&self) -> Result<Vec<AudioRecord>, StoreError> {
        self.query(&format!("SELECT {} FROM audio_files ORDER BY id", Self::COLUMNS), params![])
    }

    /// All records sorted by file name
    pub fn all_sorted_by_name(&self) -> Result<Vec<AudioRecord>, StoreError> {
        self.query(
            &format!("SELECT {} FROM audio_files ORDER BY file_name", Self::COLUMNS),
            params![],
        )
    }

    /// Records longer than `min_duration` seconds, longest first
    pub fn longer_than(&self, min_duration: f64) -> Result<Vec<AudioRecord>, StoreError> {
        self.query(
            &format!(
                "SELECT {} FROM audio_files
                 WHERE duration_seconds > ?1
                 ORDER BY duration_seconds DESC",
                Self::COLUMNS
            ),
            params![min_duration],
        )
    }

    /// Number of stored records
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM audio_files", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<AudioRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params, AudioRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
