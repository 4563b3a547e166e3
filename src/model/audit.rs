//! Audit entries: immutable records of workflow actions.
//!
//! One entry per successful transition. Failed attempts are not recorded;
//! the trail captures what happened, not what was tried.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{ReportStatus, Role};

/// The workflow action an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateDraft,
    UpdateDraft,
    Submit,
    Confirm,
    FirstApprove,
    SecondApprove,
}

impl AuditAction {
    pub const ALL: [Self; 6] = [
        Self::CreateDraft,
        Self::UpdateDraft,
        Self::Submit,
        Self::Confirm,
        Self::FirstApprove,
        Self::SecondApprove,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateDraft => "CREATE_DRAFT",
            Self::UpdateDraft => "UPDATE_DRAFT",
            Self::Submit => "SUBMIT",
            Self::Confirm => "CONFIRM",
            Self::FirstApprove => "FIRST_APPROVE",
            Self::SecondApprove => "SECOND_APPROVE",
        }
    }

    /// The status a report holds right after this action.
    pub fn resulting_status(self) -> ReportStatus {
        match self {
            Self::CreateDraft | Self::UpdateDraft => ReportStatus::Draft,
            Self::Submit => ReportStatus::Submitted,
            Self::Confirm => ReportStatus::Confirmed,
            Self::FirstApprove => ReportStatus::FirstApproved,
            Self::SecondApprove => ReportStatus::Sealed,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown audit action: {s}"))
    }
}

/// A recorded workflow action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub report_id: i64,
    pub action: AuditAction,
    pub actor_id: i64,

    /// The actor's role when the action was taken.
    pub actor_role: Role,

    pub notes: Option<String>,
    pub created_at: Timestamp,
}

/// An entry about to be appended. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub report_id: i64,
    pub action: AuditAction,
    pub actor_id: i64,
    pub actor_role: Role,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}
