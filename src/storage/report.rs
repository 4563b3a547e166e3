//! Report storage: create, load, patch, and list daily work reports.

use jiff::civil::Date;
use rusqlite::{OptionalExtension, Row, types::Value};

use crate::model::{NewReport, Report, ReportPatch, ReportStatus};

use super::{
    Result, Storage, StorageError, is_unique_violation, parse_date, parse_optional_timestamp,
    parse_timestamp,
};

const REPORT_COLUMNS: &str = "id, project_id, contract_id, report_date, status, form_json, \
     created_by, created_at, submitted_at, confirmed_at, first_approved_at, sealed_at";

/// Server-side filters for listing reports. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub project_id: Option<i64>,
    pub status: Option<ReportStatus>,
    pub report_date: Option<Date>,
}

impl Storage {
    /// Inserts a new draft and returns its id.
    ///
    /// Fails with [`StorageError::DuplicateReport`] if the project already
    /// has a report for that date.
    pub fn create_report(&self, report: &NewReport) -> Result<i64> {
        let inserted = self.conn.execute(
            "INSERT INTO daily_work_reports
                (project_id, contract_id, report_date, status, form_json, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                report.project_id,
                report.contract_id,
                report.report_date.to_string(),
                ReportStatus::Draft.as_str(),
                &report.form_json,
                report.created_by,
                report.created_at.to_string(),
            ],
        );
        match inserted {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => Err(StorageError::DuplicateReport {
                project_id: report.project_id,
                report_date: report.report_date,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads a report by id.
    pub fn get_report(&self, id: i64) -> Result<Option<Report>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {REPORT_COLUMNS} FROM daily_work_reports WHERE id = ?1"),
                [id],
                RawReport::from_row,
            )
            .optional()?;
        raw.map(RawReport::into_report).transpose()
    }

    /// Finds the report for a project on a given day, if one exists.
    pub fn find_report_by_project_and_date(
        &self,
        project_id: i64,
        report_date: Date,
    ) -> Result<Option<Report>> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "SELECT {REPORT_COLUMNS} FROM daily_work_reports
                     WHERE project_id = ?1 AND report_date = ?2"
                ),
                rusqlite::params![project_id, report_date.to_string()],
                RawReport::from_row,
            )
            .optional()?;
        raw.map(RawReport::into_report).transpose()
    }

    /// Applies a partial update, guarded on the report's current status.
    ///
    /// The write only lands if the report is still in `expected`; otherwise
    /// nothing changes and [`StorageError::StatusMismatch`] is returned.
    pub fn update_report(&self, id: i64, expected: ReportStatus, patch: &ReportPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut sets = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some((status, at)) = patch.status {
            sets.push("status = ?".to_string());
            values.push(Value::Text(status.as_str().to_string()));
            sets.push(format!("{} = ?", status.reached_at_column()));
            values.push(Value::Text(at.to_string()));
        }
        if let Some(form_json) = &patch.form_json {
            sets.push("form_json = ?".to_string());
            values.push(Value::Text(form_json.clone()));
        }
        if let Some(contract_id) = patch.contract_id {
            sets.push("contract_id = ?".to_string());
            values.push(Value::Integer(contract_id));
        }
        values.push(Value::Integer(id));
        values.push(Value::Text(expected.as_str().to_string()));

        let sql = format!(
            "UPDATE daily_work_reports SET {} WHERE id = ? AND status = ?",
            sets.join(", ")
        );
        let rows = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values))?;
        if rows == 1 {
            return Ok(());
        }

        match self.get_report(id)? {
            None => Err(StorageError::ReportNotFound(id)),
            Some(current) => Err(StorageError::StatusMismatch {
                id,
                expected,
                actual: current.status,
            }),
        }
    }

    /// Lists reports matching `filter`, newest report date first.
    pub fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let mut sql = format!("SELECT {REPORT_COLUMNS} FROM daily_work_reports WHERE 1=1");
        let mut values: Vec<Value> = Vec::new();
        if let Some(project_id) = filter.project_id {
            sql.push_str(" AND project_id = ?");
            values.push(Value::Integer(project_id));
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(date) = filter.report_date {
            sql.push_str(" AND report_date = ?");
            values.push(Value::Text(date.to_string()));
        }
        sql.push_str(" ORDER BY report_date DESC, id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let raws = stmt
            .query_map(rusqlite::params_from_iter(values), RawReport::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawReport::into_report).collect()
    }
}

/// Column values as read, before parsing into domain types.
struct RawReport {
    id: i64,
    project_id: i64,
    contract_id: Option<i64>,
    report_date: String,
    status: String,
    form_json: String,
    created_by: i64,
    created_at: String,
    submitted_at: Option<String>,
    confirmed_at: Option<String>,
    first_approved_at: Option<String>,
    sealed_at: Option<String>,
}

impl RawReport {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            contract_id: row.get(2)?,
            report_date: row.get(3)?,
            status: row.get(4)?,
            form_json: row.get(5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
            submitted_at: row.get(8)?,
            confirmed_at: row.get(9)?,
            first_approved_at: row.get(10)?,
            sealed_at: row.get(11)?,
        })
    }

    fn into_report(self) -> Result<Report> {
        let status = self
            .status
            .parse::<ReportStatus>()
            .map_err(StorageError::Corrupt)?;
        Ok(Report {
            id: self.id,
            project_id: self.project_id,
            contract_id: self.contract_id,
            report_date: parse_date("report_date", &self.report_date)?,
            status,
            form_json: self.form_json,
            created_by: self.created_by,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            submitted_at: parse_optional_timestamp("submitted_at", self.submitted_at.as_deref())?,
            confirmed_at: parse_optional_timestamp("confirmed_at", self.confirmed_at.as_deref())?,
            first_approved_at: parse_optional_timestamp(
                "first_approved_at",
                self.first_approved_at.as_deref(),
            )?,
            sealed_at: parse_optional_timestamp("sealed_at", self.sealed_at.as_deref())?,
        })
    }
}
