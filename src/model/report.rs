//! Daily work reports and their approval status.

use std::{fmt, str::FromStr};

use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

/// Where a report stands in the approval pipeline.
///
/// Strictly ordered. Each stage is reached only from the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Draft,
    Submitted,
    Confirmed,
    FirstApproved,
    Sealed,
}

impl ReportStatus {
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::Submitted,
        Self::Confirmed,
        Self::FirstApproved,
        Self::Sealed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Confirmed => "CONFIRMED",
            Self::FirstApproved => "FIRST_APPROVED",
            Self::Sealed => "SEALED",
        }
    }

    /// Column that records when a report entered this stage.
    ///
    /// A fixed mapping: column names never come from input.
    pub(crate) fn reached_at_column(self) -> &'static str {
        match self {
            Self::Draft => "created_at",
            Self::Submitted => "submitted_at",
            Self::Confirmed => "confirmed_at",
            Self::FirstApproved => "first_approved_at",
            Self::Sealed => "sealed_at",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown report status: {s}"))
    }
}

/// One project's field-work report for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub project_id: i64,
    pub contract_id: Option<i64>,
    pub report_date: Date,
    pub status: ReportStatus,

    /// The field data as submitted. Opaque text; usually JSON.
    pub form_json: String,

    pub created_by: i64,
    pub created_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub confirmed_at: Option<Timestamp>,
    pub first_approved_at: Option<Timestamp>,
    pub sealed_at: Option<Timestamp>,
}

impl Report {
    /// The payload as structured JSON, if it parses.
    pub fn form_json_parsed(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.form_json).ok()
    }
}

/// The fields needed to insert a fresh draft.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub project_id: i64,
    pub contract_id: Option<i64>,
    pub report_date: Date,
    pub form_json: String,
    pub created_by: i64,
    pub created_at: Timestamp,
}

/// A partial update. Only the fields a transition touches are written.
#[derive(Debug, Clone, Default)]
pub struct ReportPatch {
    /// Move to this status, stamping its `*_at` column with the timestamp.
    pub status: Option<(ReportStatus, Timestamp)>,

    /// Replace the payload wholesale.
    pub form_json: Option<String>,

    /// Set the contract reference. `None` keeps the current one.
    pub contract_id: Option<i64>,
}

impl ReportPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.form_json.is_none() && self.contract_id.is_none()
    }
}

/// A report as shown to callers, with its payload pre-parsed.
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub form_json_parsed: Option<serde_json::Value>,
}

impl From<Report> for ReportView {
    fn from(report: Report) -> Self {
        let form_json_parsed = report.form_json_parsed();
        Self {
            report,
            form_json_parsed,
        }
    }
}
