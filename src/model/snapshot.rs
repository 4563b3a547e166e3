//! Approved snapshots: the sealed, authoritative copy of a report.

use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

/// The key a sealed form is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SealedKey {
    pub contract_id: i64,
    pub form_date: Date,
}

/// One sealed form per (contract, date).
///
/// Re-sealing the same key overwrites `form_data` and `approved_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedSnapshot {
    pub id: i64,
    pub contract_id: i64,
    pub form_date: Date,

    /// Always a valid JSON document.
    pub form_data: serde_json::Value,

    /// Username of the sealing engineer, or their numeric id.
    pub approved_by: String,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
