//! Projects, contracts, and workflow assignments.
//!
//! Owned by the project directory. The workflow only reads them.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::Role;

/// How a caller names a project: numeric id or human-readable number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectRef {
    Id(i64),
    Number(String),
}

impl FromStr for ProjectRef {
    type Err = String;

    /// All-digit input is an id; anything else is a project number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("project reference is empty".to_string());
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let id = s
                .parse::<i64>()
                .map_err(|e| format!("invalid project id {s}: {e}"))?;
            return Ok(Self::Id(id));
        }
        Ok(Self::Number(s.to_string()))
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Number(n) => f.write_str(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub project_number: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: i64,
    pub project_id: i64,
    pub contract_number: Option<String>,
    pub created_at: Timestamp,
}

/// Who holds each workflow role on a project.
///
/// An empty slot means nobody may act in that role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub project_id: i64,
    pub siteagent_id: Option<i64>,
    pub inspector_id: Option<i64>,
    pub are_id: Option<i64>,
    pub re_id: Option<i64>,
}

impl Assignment {
    /// The identity bound to `role`, if any. `Admin` is never bound.
    pub fn holder(&self, role: Role) -> Option<i64> {
        match role {
            Role::FieldAgent => self.siteagent_id,
            Role::Inspector => self.inspector_id,
            Role::FirstEngineer => self.are_id,
            Role::SecondEngineer => self.re_id,
            Role::Admin => None,
        }
    }

    /// Whether `user_id` holds any of the four workflow roles.
    pub fn binds(&self, user_id: i64) -> bool {
        [
            self.siteagent_id,
            self.inspector_id,
            self.are_id,
            self.re_id,
        ]
        .contains(&Some(user_id))
    }
}
