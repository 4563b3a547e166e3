//! Core data model for Sitebook.
//!
//! Reports move through a fixed approval pipeline; every step leaves an
//! audit entry, and the last one publishes an approved snapshot.

mod audit;
mod project;
mod report;
mod role;
mod snapshot;

pub use audit::{AuditAction, AuditEntry, NewAuditEntry};
pub use project::{Assignment, Contract, Project, ProjectRef};
pub use report::{NewReport, Report, ReportPatch, ReportStatus, ReportView};
pub use role::{Identity, Role};
pub use snapshot::{ApprovedSnapshot, SealedKey};
