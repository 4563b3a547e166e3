//! Local persistence for reports, audit trails, and sealed forms.
//!
//! Everything lives in one `SQLite` file:
//!
//! ```text
//! <root>/sitebook.sqlite
//!   projects                      # Project directory
//!   contracts                     # Contracts per project, newest = highest id
//!   project_workflow_assignments  # Who holds each role per project
//!   daily_work_reports            # One report per (project, date)
//!   daily_work_report_actions     # Append-only audit trail
//!   approved_daily_forms          # One sealed form per (contract, date)
//! ```

mod audit;
mod directory;
mod report;
mod snapshot;

pub use report::ReportFilter;

use std::{fs, io, path::Path, path::PathBuf};

use jiff::{Timestamp, civil::Date};
use rusqlite::Connection;

use crate::model::ReportStatus;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("report not found: {0}")]
    ReportNotFound(i64),

    #[error("a report already exists for project {project_id} on {report_date}")]
    DuplicateReport { project_id: i64, report_date: Date },

    #[error("report {id} is {actual}, expected {expected}")]
    StatusMismatch {
        id: i64,
        expected: ReportStatus,
        actual: ReportStatus,
    },

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS projects (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        project_number TEXT UNIQUE,
        name           TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS contracts (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id      INTEGER NOT NULL REFERENCES projects(id),
        contract_number TEXT,
        created_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS project_workflow_assignments (
        project_id   INTEGER PRIMARY KEY REFERENCES projects(id),
        siteagent_id INTEGER,
        inspector_id INTEGER,
        are_id       INTEGER,
        re_id        INTEGER
    );

    CREATE TABLE IF NOT EXISTS daily_work_reports (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id        INTEGER NOT NULL REFERENCES projects(id),
        contract_id       INTEGER REFERENCES contracts(id),
        report_date       TEXT NOT NULL,
        status            TEXT NOT NULL,
        form_json         TEXT NOT NULL,
        created_by        INTEGER NOT NULL,
        created_at        TEXT NOT NULL,
        submitted_at      TEXT,
        confirmed_at      TEXT,
        first_approved_at TEXT,
        sealed_at         TEXT,
        UNIQUE (project_id, report_date)
    );

    CREATE TABLE IF NOT EXISTS daily_work_report_actions (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        report_id  INTEGER NOT NULL REFERENCES daily_work_reports(id),
        action     TEXT NOT NULL,
        actor_id   INTEGER NOT NULL,
        actor_role TEXT NOT NULL,
        notes      TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS approved_daily_forms (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        contract_id INTEGER NOT NULL,
        form_date   TEXT NOT NULL,
        form_data   TEXT NOT NULL,
        approved_by TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL,
        UNIQUE (contract_id, form_date)
    );
";

/// `SQLite`-backed storage for the whole workflow.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (or creates) the database at `path`, applying the schema.
    ///
    /// The parent directory is created if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %path.display(), "opened storage");
        Ok(Self { conn })
    }

    /// Returns the default database path: `~/.sitebook/sitebook.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".sitebook").join("sitebook.sqlite"))
    }

    /// Runs `f` inside one transaction, committing only if it succeeds.
    ///
    /// Every storage call made through `self` while `f` runs joins the
    /// transaction. On error (or panic) the transaction is rolled back.
    pub fn in_transaction<T, E>(
        &self,
        f: impl FnOnce() -> core::result::Result<T, E>,
    ) -> core::result::Result<T, E>
    where
        E: From<StorageError>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(StorageError::from)?;
        let value = f()?;
        tx.commit().map_err(StorageError::from)?;
        Ok(value)
    }
}

/// Parses an RFC 3339 timestamp column.
fn parse_timestamp(column: &str, raw: &str) -> Result<Timestamp> {
    raw.parse::<Timestamp>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}

/// Parses an optional RFC 3339 timestamp column.
fn parse_optional_timestamp(column: &str, raw: Option<&str>) -> Result<Option<Timestamp>> {
    raw.map(|s| parse_timestamp(column, s)).transpose()
}

/// Parses an ISO `YYYY-MM-DD` date column.
fn parse_date(column: &str, raw: &str) -> Result<Date> {
    raw.parse::<Date>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}

/// Whether an error is a `UNIQUE` constraint violation.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
