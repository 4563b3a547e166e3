//! Who may act on, or read, a report.
//!
//! Acting requires both the stage's role and being the identity bound to
//! that role in the project's assignment. A missing assignment or an empty
//! slot authorizes nobody.

use crate::model::{Assignment, Identity, Report, ReportStatus, Role};

use super::WorkflowError;

/// Fails unless the caller carries `role`.
///
/// Checked before anything is loaded.
pub(super) fn require_role(who: &Identity, role: Role, verb: &str) -> Result<(), WorkflowError> {
    if who.role == role {
        return Ok(());
    }
    tracing::debug!(actor_id = who.id, role = %who.role, required = %role, "role refused");
    Err(WorkflowError::Forbidden(format!(
        "Only {} can {verb}",
        role.title()
    )))
}

/// Fails unless the caller is the identity bound to `role` on the project.
pub(super) fn require_holder(
    who: &Identity,
    role: Role,
    assignment: Option<&Assignment>,
) -> Result<(), WorkflowError> {
    let holder = assignment.and_then(|a| a.holder(role));
    if holder == Some(who.id) {
        return Ok(());
    }
    tracing::debug!(actor_id = who.id, role = %role, ?holder, "assignment refused");
    Err(WorkflowError::Forbidden(format!(
        "You are not the assigned {} for this project",
        role.title()
    )))
}

/// Fails unless the report is exactly in `required`.
pub(super) fn require_status(
    report: &Report,
    required: ReportStatus,
    verb_past: &str,
) -> Result<(), WorkflowError> {
    if report.status == required {
        return Ok(());
    }
    tracing::debug!(
        report_id = report.id,
        status = %report.status,
        required = %required,
        "precondition refused"
    );
    Err(WorkflowError::Conflict(format!(
        "Only {required} reports can be {verb_past} (report {} is {})",
        report.id, report.status
    )))
}

/// Whether the caller may read reports of a project.
///
/// Admins read everything; everyone else needs a role on the project.
pub(super) fn can_view(who: &Identity, assignment: Option<&Assignment>) -> bool {
    who.role == Role::Admin || assignment.is_some_and(|a| a.binds(who.id))
}
