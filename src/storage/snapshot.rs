//! Approved snapshot storage: upsert and load sealed forms.

use jiff::{Timestamp, civil::Date};
use rusqlite::{OptionalExtension, Row};

use crate::model::{ApprovedSnapshot, SealedKey};

use super::{Result, Storage, parse_date, parse_timestamp};

impl Storage {
    /// Publishes a sealed form under `key`.
    ///
    /// Inserts on first seal; afterwards overwrites `form_data` and
    /// `approved_by` in place, keeping exactly one row per key.
    pub fn upsert_snapshot(
        &self,
        key: SealedKey,
        form_data: &serde_json::Value,
        approved_by: &str,
        at: Timestamp,
    ) -> Result<()> {
        let json = serde_json::to_string(form_data)?;
        self.conn.execute(
            "INSERT INTO approved_daily_forms
                (contract_id, form_date, form_data, approved_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT (contract_id, form_date) DO UPDATE SET
                form_data = excluded.form_data,
                approved_by = excluded.approved_by,
                updated_at = excluded.updated_at",
            rusqlite::params![
                key.contract_id,
                key.form_date.to_string(),
                json,
                approved_by,
                at.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Loads the sealed form for a contract and day.
    pub fn get_snapshot(&self, contract_id: i64, form_date: Date) -> Result<Option<ApprovedSnapshot>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, contract_id, form_date, form_data, approved_by, created_at, updated_at
                 FROM approved_daily_forms
                 WHERE contract_id = ?1 AND form_date = ?2",
                rusqlite::params![contract_id, form_date.to_string()],
                RawSnapshot::from_row,
            )
            .optional()?;
        raw.map(RawSnapshot::into_snapshot).transpose()
    }

    /// Counts sealed forms for a contract and day. Never more than one.
    #[cfg(test)]
    pub fn count_snapshots(&self, contract_id: i64, form_date: Date) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM approved_daily_forms WHERE contract_id = ?1 AND form_date = ?2",
            rusqlite::params![contract_id, form_date.to_string()],
            |row| row.get(0),
        )?)
    }
}

struct RawSnapshot {
    id: i64,
    contract_id: i64,
    form_date: String,
    form_data: String,
    approved_by: String,
    created_at: String,
    updated_at: String,
}

impl RawSnapshot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            contract_id: row.get(1)?,
            form_date: row.get(2)?,
            form_data: row.get(3)?,
            approved_by: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_snapshot(self) -> Result<ApprovedSnapshot> {
        Ok(ApprovedSnapshot {
            id: self.id,
            contract_id: self.contract_id,
            form_date: parse_date("form_date", &self.form_date)?,
            form_data: serde_json::from_str(&self.form_data)?,
            approved_by: self.approved_by,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}
