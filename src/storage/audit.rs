//! Audit storage: append and load workflow action entries.
//!
//! Append-only. There is no update or delete.

use rusqlite::Row;

use crate::model::{AuditAction, AuditEntry, NewAuditEntry, Role};

use super::{Result, Storage, StorageError, parse_timestamp};

impl Storage {
    /// Appends an entry to a report's audit trail. Returns the assigned id.
    pub fn append_audit(&self, entry: &NewAuditEntry) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO daily_work_report_actions
                (report_id, action, actor_id, actor_role, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                entry.report_id,
                entry.action.as_str(),
                entry.actor_id,
                entry.actor_role.as_str(),
                entry.notes,
                entry.created_at.to_string(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Loads a report's audit trail in the order it was written.
    pub fn load_audit(&self, report_id: i64) -> Result<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, report_id, action, actor_id, actor_role, notes, created_at
             FROM daily_work_report_actions
             WHERE report_id = ?1
             ORDER BY id",
        )?;
        let raws = stmt
            .query_map([report_id], RawAuditEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawAuditEntry::into_entry).collect()
    }
}

struct RawAuditEntry {
    id: i64,
    report_id: i64,
    action: String,
    actor_id: i64,
    actor_role: String,
    notes: Option<String>,
    created_at: String,
}

impl RawAuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            report_id: row.get(1)?,
            action: row.get(2)?,
            actor_id: row.get(3)?,
            actor_role: row.get(4)?,
            notes: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_entry(self) -> Result<AuditEntry> {
        let action = self
            .action
            .parse::<AuditAction>()
            .map_err(StorageError::Corrupt)?;
        let actor_role = self
            .actor_role
            .parse::<Role>()
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        Ok(AuditEntry {
            id: self.id,
            report_id: self.report_id,
            action,
            actor_id: self.actor_id,
            actor_role,
            notes: self.notes,
            created_at: parse_timestamp("created_at", &self.created_at)?,
        })
    }
}
