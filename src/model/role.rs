//! Roles and the authenticated caller.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A workflow role. Closed set: anything else is rejected at the edge.
///
/// Wire names match the role strings carried by issued credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Drafts, edits, and submits daily reports.
    #[serde(rename = "siteagent")]
    FieldAgent,

    /// Confirms submitted reports.
    Inspector,

    /// First-level engineer approval.
    #[serde(rename = "are")]
    FirstEngineer,

    /// Second-level engineer approval; seals the report.
    #[serde(rename = "re")]
    SecondEngineer,

    /// Reads everything, seeds the project directory.
    Admin,
}

impl Role {
    /// Every accepted role, in pipeline order, followed by `Admin`.
    pub const ALL: [Self; 5] = [
        Self::FieldAgent,
        Self::Inspector,
        Self::FirstEngineer,
        Self::SecondEngineer,
        Self::Admin,
    ];

    /// The wire name of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FieldAgent => "siteagent",
            Self::Inspector => "inspector",
            Self::FirstEngineer => "are",
            Self::SecondEngineer => "re",
            Self::Admin => "admin",
        }
    }

    /// Human-readable title for error messages.
    pub fn title(self) -> &'static str {
        match self {
            Self::FieldAgent => "Site Agent",
            Self::Inspector => "Inspector",
            Self::FirstEngineer => "ARE",
            Self::SecondEngineer => "RE",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string that is not on the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Case-insensitive match against [`Role::ALL`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// The authenticated caller, threaded explicitly through every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub role: Role,
    pub username: Option<String>,
}

impl Identity {
    /// Name recorded as the approver of a sealed form:
    /// the username when present, otherwise the numeric id.
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.id.to_string(),
        }
    }
}
