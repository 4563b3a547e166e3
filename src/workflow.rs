//! The report approval workflow.
//!
//! A report moves `DRAFT → SUBMITTED → CONFIRMED → FIRST_APPROVED → SEALED`,
//! one stage at a time, each step taken by the identity bound to that
//! stage's role in the project's assignment. The last step publishes the
//! report as an approved snapshot.
//!
//! Every operation validates role, assignment, and current status before it
//! writes. The status change, its audit entry, and (when sealing) the
//! snapshot upsert commit together in one transaction, and the status write
//! is conditional on the status that was checked.

mod access;
mod directory;
mod error;
mod seal;

use std::collections::HashMap;

use jiff::{Timestamp, civil::Date};
use serde::Serialize;

use crate::{
    model::{
        ApprovedSnapshot, AuditAction, AuditEntry, Identity, NewAuditEntry, NewReport, Project,
        ProjectRef, Report, ReportPatch, ReportStatus, ReportView, Role, SealedKey,
    },
    storage::{ReportFilter, Storage},
};

pub use directory::AssignmentUpdate;
pub use error::WorkflowError;

/// A stage-advancing transition.
///
/// Creating and editing drafts are not transitions: they never leave `DRAFT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Confirm,
    FirstApprove,
    SecondApprove,
}

impl Transition {
    /// The status a report must hold for this transition.
    pub fn from_status(self) -> ReportStatus {
        match self {
            Self::Submit => ReportStatus::Draft,
            Self::Confirm => ReportStatus::Submitted,
            Self::FirstApprove => ReportStatus::Confirmed,
            Self::SecondApprove => ReportStatus::FirstApproved,
        }
    }

    pub fn to_status(self) -> ReportStatus {
        self.action().resulting_status()
    }

    pub fn role(self) -> Role {
        match self {
            Self::Submit => Role::FieldAgent,
            Self::Confirm => Role::Inspector,
            Self::FirstApprove => Role::FirstEngineer,
            Self::SecondApprove => Role::SecondEngineer,
        }
    }

    pub fn action(self) -> AuditAction {
        match self {
            Self::Submit => AuditAction::Submit,
            Self::Confirm => AuditAction::Confirm,
            Self::FirstApprove => AuditAction::FirstApprove,
            Self::SecondApprove => AuditAction::SecondApprove,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Confirm => "confirm",
            Self::FirstApprove | Self::SecondApprove => "approve at this stage",
        }
    }

    fn verb_past(self) -> &'static str {
        match self {
            Self::Submit => "submitted",
            Self::Confirm => "confirmed",
            Self::FirstApprove => "first-approved",
            Self::SecondApprove => "sealed",
        }
    }
}

/// Input for a new draft.
#[derive(Debug, Clone)]
pub struct DraftRequest {
    pub project: ProjectRef,
    pub contract_id: Option<i64>,
    pub report_date: Date,
    pub form_json: String,
}

/// Filters for listing reports.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    pub project: Option<ProjectRef>,
    pub status: Option<ReportStatus>,
    pub report_date: Option<Date>,
}

/// How to find a sealed form: directly by contract, or through a project's
/// most recent contract.
#[derive(Debug, Clone)]
pub enum SnapshotLookup {
    Contract(i64),
    Project(ProjectRef),
}

/// Result of the terminal transition.
#[derive(Debug, Clone, Serialize)]
pub struct SealOutcome {
    pub report: ReportView,
    pub sealed: SealedKey,
}

/// The workflow engine, operating over one store.
pub struct Workflow<'a> {
    storage: &'a Storage,
}

impl<'a> Workflow<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    // ── Drafts ──

    /// Creates a draft for a project and day. Site Agent only.
    pub fn create_report(
        &self,
        who: &Identity,
        draft: &DraftRequest,
    ) -> Result<ReportView, WorkflowError> {
        access::require_role(who, Role::FieldAgent, "create reports")?;
        let project_id = self.resolve_project(&draft.project)?;
        let assignment = self.storage.resolve_assignment(project_id)?;
        access::require_holder(who, Role::FieldAgent, assignment.as_ref())?;
        if let Some(contract_id) = draft.contract_id {
            self.check_contract(contract_id, project_id)?;
        }

        if let Some(existing) = self
            .storage
            .find_report_by_project_and_date(project_id, draft.report_date)?
        {
            return Err(WorkflowError::Conflict(format!(
                "A report already exists for this project and date (report {})",
                existing.id
            )));
        }

        let now = Timestamp::now();
        let id = self.storage.in_transaction(|| {
            let id = self.storage.create_report(&NewReport {
                project_id,
                contract_id: draft.contract_id,
                report_date: draft.report_date,
                form_json: draft.form_json.clone(),
                created_by: who.id,
                created_at: now,
            })?;
            self.storage
                .append_audit(&audit_entry(id, AuditAction::CreateDraft, who, None, now))?;
            Ok::<_, WorkflowError>(id)
        })?;

        tracing::info!(
            report_id = id,
            project_id,
            report_date = %draft.report_date,
            actor_id = who.id,
            "draft created"
        );
        self.load_view(id)
    }

    /// Replaces a draft's payload, optionally setting its contract.
    ///
    /// A `None` contract keeps the current one.
    pub fn update_report(
        &self,
        who: &Identity,
        id: i64,
        form_json: String,
        contract_id: Option<i64>,
    ) -> Result<ReportView, WorkflowError> {
        access::require_role(who, Role::FieldAgent, "update reports")?;
        let report = self.load(id)?;
        let assignment = self.storage.resolve_assignment(report.project_id)?;
        access::require_holder(who, Role::FieldAgent, assignment.as_ref())?;
        access::require_status(&report, ReportStatus::Draft, "edited")?;
        if let Some(contract_id) = contract_id {
            self.check_contract(contract_id, report.project_id)?;
        }

        let now = Timestamp::now();
        self.storage.in_transaction(|| {
            let patch = ReportPatch {
                form_json: Some(form_json),
                contract_id,
                ..ReportPatch::default()
            };
            self.storage.update_report(id, ReportStatus::Draft, &patch)?;
            self.storage
                .append_audit(&audit_entry(id, AuditAction::UpdateDraft, who, None, now))?;
            Ok::<_, WorkflowError>(())
        })?;

        tracing::info!(report_id = id, actor_id = who.id, "draft updated");
        self.load_view(id)
    }

    // ── Transitions ──

    /// `DRAFT → SUBMITTED`, by the assigned Site Agent.
    pub fn submit_report(&self, who: &Identity, id: i64) -> Result<ReportView, WorkflowError> {
        self.advance(who, id, Transition::Submit, None)
    }

    /// `SUBMITTED → CONFIRMED`, by the assigned Inspector.
    pub fn confirm_report(
        &self,
        who: &Identity,
        id: i64,
        notes: Option<String>,
    ) -> Result<ReportView, WorkflowError> {
        self.advance(who, id, Transition::Confirm, notes)
    }

    /// `CONFIRMED → FIRST_APPROVED`, by the assigned ARE.
    pub fn first_approve(
        &self,
        who: &Identity,
        id: i64,
        notes: Option<String>,
    ) -> Result<ReportView, WorkflowError> {
        self.advance(who, id, Transition::FirstApprove, notes)
    }

    /// `FIRST_APPROVED → SEALED`, by the assigned RE, publishing the
    /// approved snapshot.
    ///
    /// If no contract can be resolved the whole step is refused and nothing
    /// is written.
    pub fn second_approve_and_seal(
        &self,
        who: &Identity,
        id: i64,
        notes: Option<String>,
    ) -> Result<SealOutcome, WorkflowError> {
        let transition = Transition::SecondApprove;
        let report = self.authorize_transition(who, id, transition)?;
        let plan = seal::prepare(self.storage, &report)?;

        let now = Timestamp::now();
        let sealed = self.storage.in_transaction(|| {
            let patch = ReportPatch {
                status: Some((transition.to_status(), now)),
                contract_id: plan.backfill_contract,
                ..ReportPatch::default()
            };
            self.storage
                .update_report(id, transition.from_status(), &patch)?;
            self.storage.append_audit(&audit_entry(
                id,
                transition.action(),
                who,
                clean_notes(notes),
                now,
            ))?;
            seal::publish(self.storage, &plan, who, now)
        })?;

        tracing::info!(
            report_id = id,
            actor_id = who.id,
            contract_id = sealed.contract_id,
            form_date = %sealed.form_date,
            "report sealed"
        );
        Ok(SealOutcome {
            report: self.load_view(id)?,
            sealed,
        })
    }

    fn advance(
        &self,
        who: &Identity,
        id: i64,
        transition: Transition,
        notes: Option<String>,
    ) -> Result<ReportView, WorkflowError> {
        self.authorize_transition(who, id, transition)?;

        let now = Timestamp::now();
        self.storage.in_transaction(|| {
            let patch = ReportPatch {
                status: Some((transition.to_status(), now)),
                ..ReportPatch::default()
            };
            self.storage
                .update_report(id, transition.from_status(), &patch)?;
            self.storage.append_audit(&audit_entry(
                id,
                transition.action(),
                who,
                clean_notes(notes),
                now,
            ))?;
            Ok::<_, WorkflowError>(())
        })?;

        tracing::info!(
            report_id = id,
            action = %transition.action(),
            actor_id = who.id,
            status = %transition.to_status(),
            "report advanced"
        );
        self.load_view(id)
    }

    /// Role, then assignment, then status. Returns the report as checked.
    fn authorize_transition(
        &self,
        who: &Identity,
        id: i64,
        transition: Transition,
    ) -> Result<Report, WorkflowError> {
        access::require_role(who, transition.role(), transition.verb())?;
        let report = self.load(id)?;
        let assignment = self.storage.resolve_assignment(report.project_id)?;
        access::require_holder(who, transition.role(), assignment.as_ref())?;
        access::require_status(&report, transition.from_status(), transition.verb_past())?;
        Ok(report)
    }

    // ── Reads ──

    /// Loads a report the caller is allowed to see.
    pub fn get_report(&self, who: &Identity, id: i64) -> Result<ReportView, WorkflowError> {
        let report = self.load(id)?;
        self.require_view(who, &report)?;
        Ok(report.into())
    }

    /// A report's audit trail, oldest first.
    pub fn report_history(
        &self,
        who: &Identity,
        id: i64,
    ) -> Result<Vec<AuditEntry>, WorkflowError> {
        let report = self.load(id)?;
        self.require_view(who, &report)?;
        Ok(self.storage.load_audit(id)?)
    }

    /// Lists reports matching `query` that the caller is allowed to see.
    pub fn list_reports(
        &self,
        who: &Identity,
        query: &ReportQuery,
    ) -> Result<Vec<ReportView>, WorkflowError> {
        let project_id = query
            .project
            .as_ref()
            .map(|p| self.resolve_project(p))
            .transpose()?;
        let reports = self.storage.list_reports(&ReportFilter {
            project_id,
            status: query.status,
            report_date: query.report_date,
        })?;

        if who.role == Role::Admin {
            return Ok(reports.into_iter().map(ReportView::from).collect());
        }

        let mut visible_by_project: HashMap<i64, bool> = HashMap::new();
        let mut visible: Vec<ReportView> = Vec::new();
        for report in reports {
            let allowed = match visible_by_project.get(&report.project_id) {
                Some(allowed) => *allowed,
                None => {
                    let assignment = self.storage.resolve_assignment(report.project_id)?;
                    let allowed = access::can_view(who, assignment.as_ref());
                    visible_by_project.insert(report.project_id, allowed);
                    allowed
                }
            };
            if allowed {
                visible.push(report.into());
            }
        }
        Ok(visible)
    }

    /// The sealed form for a contract (or a project's latest contract) and day.
    pub fn get_approved_snapshot(
        &self,
        lookup: &SnapshotLookup,
        form_date: Date,
    ) -> Result<ApprovedSnapshot, WorkflowError> {
        let contract_id = match lookup {
            SnapshotLookup::Contract(id) => *id,
            SnapshotLookup::Project(reference) => {
                let project_id = self.resolve_project(reference)?;
                self.storage
                    .latest_contract(project_id)?
                    .ok_or_else(|| {
                        WorkflowError::NotFound("No contract found for this project".to_string())
                    })?
                    .id
            }
        };
        self.storage
            .get_snapshot(contract_id, form_date)?
            .ok_or_else(|| WorkflowError::NotFound("Approved form not found".to_string()))
    }

    /// Projects the caller works on. Admins see every project.
    pub fn my_projects(&self, who: &Identity) -> Result<Vec<Project>, WorkflowError> {
        let projects = if who.role == Role::Admin {
            self.storage.list_projects()?
        } else {
            self.storage.list_projects_for_user(who.id)?
        };
        Ok(projects)
    }

    // ── Helpers ──

    fn load(&self, id: i64) -> Result<Report, WorkflowError> {
        self.storage
            .get_report(id)?
            .ok_or_else(|| WorkflowError::NotFound("Report not found".to_string()))
    }

    fn load_view(&self, id: i64) -> Result<ReportView, WorkflowError> {
        Ok(self.load(id)?.into())
    }

    fn require_view(&self, who: &Identity, report: &Report) -> Result<(), WorkflowError> {
        if who.role == Role::Admin {
            return Ok(());
        }
        let assignment = self.storage.resolve_assignment(report.project_id)?;
        if access::can_view(who, assignment.as_ref()) {
            return Ok(());
        }
        tracing::debug!(report_id = report.id, actor_id = who.id, "read refused");
        Err(WorkflowError::Forbidden("Forbidden".to_string()))
    }

    fn resolve_project(&self, reference: &ProjectRef) -> Result<i64, WorkflowError> {
        self.storage
            .resolve_project_id(reference)?
            .ok_or_else(|| WorkflowError::BadRequest(format!("unknown project: {reference}")))
    }

    /// A contract given by the caller must exist and belong to the project.
    fn check_contract(&self, contract_id: i64, project_id: i64) -> Result<(), WorkflowError> {
        match self.storage.get_contract(contract_id)? {
            Some(c) if c.project_id == project_id => Ok(()),
            Some(_) => Err(WorkflowError::BadRequest(format!(
                "contract {contract_id} belongs to another project"
            ))),
            None => Err(WorkflowError::BadRequest(format!(
                "unknown contract: {contract_id}"
            ))),
        }
    }
}

fn audit_entry(
    report_id: i64,
    action: AuditAction,
    who: &Identity,
    notes: Option<String>,
    at: Timestamp,
) -> NewAuditEntry {
    NewAuditEntry {
        report_id,
        action,
        actor_id: who.id,
        actor_role: who.role,
        notes,
        created_at: at,
    }
}

/// Blank notes are recorded as no notes.
fn clean_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::storage::tests::{seeded_storage, test_storage};

    const JUNE_1: Date = jiff::civil::date(2025, 6, 1);

    fn agent() -> Identity {
        Identity {
            id: 11,
            role: Role::FieldAgent,
            username: Some("a1".into()),
        }
    }

    fn inspector() -> Identity {
        Identity {
            id: 12,
            role: Role::Inspector,
            username: Some("i3".into()),
        }
    }

    fn are() -> Identity {
        Identity {
            id: 13,
            role: Role::FirstEngineer,
            username: Some("e1".into()),
        }
    }

    fn re() -> Identity {
        Identity {
            id: 14,
            role: Role::SecondEngineer,
            username: Some("e2".into()),
        }
    }

    fn admin() -> Identity {
        Identity {
            id: 1,
            role: Role::Admin,
            username: None,
        }
    }

    fn draft(project: &str, day: Date) -> DraftRequest {
        DraftRequest {
            project: project.parse().unwrap(),
            contract_id: None,
            report_date: day,
            form_json: r#"{"weather":"dry","crew":12}"#.into(),
        }
    }

    fn actions(storage: &Storage, id: i64) -> Vec<AuditAction> {
        storage
            .load_audit(id)
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect()
    }

    /// Creates a draft and advances it until it reaches `until`.
    fn report_at(wf: &Workflow<'_>, day: Date, until: ReportStatus) -> i64 {
        let id = wf.create_report(&agent(), &draft("P7", day)).unwrap().report.id;
        if until >= ReportStatus::Submitted {
            wf.submit_report(&agent(), id).unwrap();
        }
        if until >= ReportStatus::Confirmed {
            wf.confirm_report(&inspector(), id, None).unwrap();
        }
        if until >= ReportStatus::FirstApproved {
            wf.first_approve(&are(), id, None).unwrap();
        }
        id
    }

    #[test]
    fn transitions_chain_through_every_stage() {
        let chain = [
            Transition::Submit,
            Transition::Confirm,
            Transition::FirstApprove,
            Transition::SecondApprove,
        ];
        for (transition, stages) in chain.iter().zip(ReportStatus::ALL.windows(2)) {
            assert_eq!(transition.from_status(), stages[0]);
            assert_eq!(transition.to_status(), stages[1]);
        }
    }

    #[test]
    fn full_pipeline_seals_and_audits() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);

        let created = wf.create_report(&agent(), &draft("P7", JUNE_1)).unwrap();
        let id = created.report.id;
        assert_eq!(created.report.status, ReportStatus::Draft);

        let submitted = wf.submit_report(&agent(), id).unwrap();
        assert_eq!(submitted.report.status, ReportStatus::Submitted);
        let confirmed = wf.confirm_report(&inspector(), id, None).unwrap();
        assert_eq!(confirmed.report.status, ReportStatus::Confirmed);
        let approved = wf.first_approve(&are(), id, None).unwrap();
        assert_eq!(approved.report.status, ReportStatus::FirstApproved);
        let outcome = wf.second_approve_and_seal(&re(), id, None).unwrap();

        let report = &outcome.report.report;
        assert_eq!(report.status, ReportStatus::Sealed);
        assert!(report.submitted_at.is_some());
        assert!(report.confirmed_at.is_some());
        assert!(report.first_approved_at.is_some());
        assert!(report.sealed_at.is_some());
        // The project's contract was written back onto the report.
        assert_eq!(report.contract_id, Some(1));

        assert_eq!(
            outcome.sealed,
            SealedKey {
                contract_id: 1,
                form_date: JUNE_1
            }
        );
        let snap = storage.get_snapshot(1, JUNE_1).unwrap().unwrap();
        assert_eq!(snap.approved_by, "e2");
        assert_eq!(snap.form_data, json!({"weather": "dry", "crew": 12}));

        assert_eq!(
            actions(&storage, id),
            vec![
                AuditAction::CreateDraft,
                AuditAction::Submit,
                AuditAction::Confirm,
                AuditAction::FirstApprove,
                AuditAction::SecondApprove,
            ]
        );
    }

    #[test]
    fn audit_statuses_are_a_prefix_of_the_pipeline() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);

        for (offset, until) in ReportStatus::ALL[..4].iter().enumerate() {
            let day = jiff::civil::date(2025, 6, 1 + i8::try_from(offset).unwrap());
            let id = report_at(&wf, day, *until);

            let statuses: Vec<ReportStatus> = actions(&storage, id)
                .into_iter()
                .map(AuditAction::resulting_status)
                .collect();
            assert_eq!(statuses, ReportStatus::ALL[..=offset]);
        }
    }

    #[test]
    fn confirming_a_draft_conflicts_and_writes_nothing() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);
        let id = report_at(&wf, JUNE_1, ReportStatus::Draft);

        let err = wf.confirm_report(&inspector(), id, None).unwrap_err();

        assert!(matches!(err, WorkflowError::Conflict(_)));
        assert_eq!(storage.get_report(id).unwrap().unwrap().status, ReportStatus::Draft);
        assert_eq!(actions(&storage, id), vec![AuditAction::CreateDraft]);
    }

    #[test]
    fn no_stage_can_be_skipped_or_repeated() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);
        let id = report_at(&wf, JUNE_1, ReportStatus::Confirmed);

        // Repeating an earlier stage.
        assert!(matches!(
            wf.confirm_report(&inspector(), id, None),
            Err(WorkflowError::Conflict(_))
        ));
        // Jumping ahead.
        assert!(matches!(
            wf.second_approve_and_seal(&re(), id, None),
            Err(WorkflowError::Conflict(_))
        ));
        assert_eq!(
            storage.get_report(id).unwrap().unwrap().status,
            ReportStatus::Confirmed
        );
        assert!(storage.get_snapshot(1, JUNE_1).unwrap().is_none());
    }

    #[test]
    fn duplicate_project_date_conflicts() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);

        wf.create_report(&agent(), &draft("P7", JUNE_1)).unwrap();
        // Same project, addressed by id this time.
        let err = wf.create_report(&agent(), &draft("1", JUNE_1)).unwrap_err();

        assert!(matches!(err, WorkflowError::Conflict(_)));
        assert_eq!(
            storage.list_reports(&ReportFilter::default()).unwrap().len(),
            1
        );
    }

    #[test]
    fn unassigned_identity_is_forbidden_whatever_the_status() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);
        let id = report_at(&wf, JUNE_1, ReportStatus::Draft);

        let stranger = Identity {
            id: 99,
            role: Role::Inspector,
            username: None,
        };
        // Report is a draft, so the precondition would also fail; authorization wins.
        let err = wf.confirm_report(&stranger, id, None).unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        // Right person, wrong role.
        let agent_as_inspector = Identity {
            role: Role::Inspector,
            ..agent()
        };
        let err = wf
            .confirm_report(&agent_as_inspector, id, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        // Right role, not the assigned engineer.
        let err = wf
            .second_approve_and_seal(
                &Identity {
                    id: 13,
                    ..re()
                },
                id,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        assert_eq!(actions(&storage, id), vec![AuditAction::CreateDraft]);
    }

    #[test]
    fn every_transition_refuses_other_roles() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);
        let id = report_at(&wf, JUNE_1, ReportStatus::Draft);

        assert!(matches!(
            wf.submit_report(&inspector(), id),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            wf.confirm_report(&are(), id, None),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            wf.first_approve(&re(), id, None),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            wf.second_approve_and_seal(&admin(), id, None),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            wf.create_report(&inspector(), &draft("P7", JUNE_1)),
            Err(WorkflowError::Forbidden(_))
        ));
    }

    #[test]
    fn wrong_holder_is_forbidden_when_the_status_matches() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);

        // Submitted: the precondition for confirming holds, only the person is wrong.
        let submitted = report_at(&wf, JUNE_1, ReportStatus::Submitted);
        let stranger = Identity {
            id: 99,
            role: Role::Inspector,
            username: None,
        };
        assert!(matches!(
            wf.confirm_report(&stranger, submitted, None),
            Err(WorkflowError::Forbidden(_))
        ));
        assert_eq!(
            storage.get_report(submitted).unwrap().unwrap().status,
            ReportStatus::Submitted
        );
        assert_eq!(actions(&storage, submitted).len(), 2);

        // Confirmed: the RE holder acting as ARE is still not the assigned ARE.
        let confirmed = report_at(&wf, jiff::civil::date(2025, 6, 2), ReportStatus::Confirmed);
        let re_as_are = Identity {
            role: Role::FirstEngineer,
            ..re()
        };
        assert!(matches!(
            wf.first_approve(&re_as_are, confirmed, None),
            Err(WorkflowError::Forbidden(_))
        ));
        assert_eq!(
            storage.get_report(confirmed).unwrap().unwrap().status,
            ReportStatus::Confirmed
        );
        assert_eq!(actions(&storage, confirmed).len(), 3);

        // First-approved: the ARE's id carrying the RE role may not seal.
        let approved = report_at(&wf, jiff::civil::date(2025, 6, 3), ReportStatus::FirstApproved);
        let are_as_re = Identity {
            id: 13,
            ..re()
        };
        assert!(matches!(
            wf.second_approve_and_seal(&are_as_re, approved, None),
            Err(WorkflowError::Forbidden(_))
        ));
        let report = storage.get_report(approved).unwrap().unwrap();
        assert_eq!(report.status, ReportStatus::FirstApproved);
        assert!(report.sealed_at.is_none());
        assert_eq!(actions(&storage, approved).len(), 4);
        assert!(storage.get_snapshot(1, report.report_date).unwrap().is_none());
    }

    #[test]
    fn missing_report_is_not_found() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);

        assert!(matches!(
            wf.submit_report(&agent(), 404),
            Err(WorkflowError::NotFound(_))
        ));
        assert!(matches!(
            wf.get_report(&admin(), 404),
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[test]
    fn create_checks_project_and_assignment() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);

        let err = wf
            .create_report(&agent(), &draft("NOPE-1", JUNE_1))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::BadRequest(_)));

        let other = storage.insert_project(Some("P8"), "Unassigned").unwrap();
        let err = wf
            .create_report(&agent(), &draft(&other.to_string(), JUNE_1))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let someone_else = Identity {
            id: 21,
            ..agent()
        };
        let err = wf
            .create_report(&someone_else, &draft("P7", JUNE_1))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));
    }

    #[test]
    fn create_rejects_foreign_or_unknown_contract() {
        let (_dir, storage) = seeded_storage();
        let other = storage.insert_project(Some("P8"), "Elsewhere").unwrap();
        let foreign = storage.insert_contract(other, None).unwrap();
        let wf = Workflow::new(&storage);

        let mut request = draft("P7", JUNE_1);
        request.contract_id = Some(foreign);
        assert!(matches!(
            wf.create_report(&agent(), &request),
            Err(WorkflowError::BadRequest(_))
        ));

        request.contract_id = Some(999);
        assert!(matches!(
            wf.create_report(&agent(), &request),
            Err(WorkflowError::BadRequest(_))
        ));

        request.contract_id = Some(1);
        let created = wf.create_report(&agent(), &request).unwrap();
        assert_eq!(created.report.contract_id, Some(1));
    }

    #[test]
    fn update_replaces_payload_only_while_draft() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);
        let id = report_at(&wf, JUNE_1, ReportStatus::Draft);

        let updated = wf
            .update_report(&agent(), id, r#"{"crew":4}"#.into(), None)
            .unwrap();
        assert_eq!(updated.form_json_parsed, Some(json!({"crew": 4})));
        assert_eq!(updated.report.contract_id, None);

        let updated = wf
            .update_report(&agent(), id, r#"{"crew":5}"#.into(), Some(1))
            .unwrap();
        assert_eq!(updated.report.contract_id, Some(1));

        // Omitting the contract keeps it.
        let updated = wf
            .update_report(&agent(), id, r#"{"crew":6}"#.into(), None)
            .unwrap();
        assert_eq!(updated.report.contract_id, Some(1));

        wf.submit_report(&agent(), id).unwrap();
        let err = wf
            .update_report(&agent(), id, "{}".into(), None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
        assert_eq!(
            storage.get_report(id).unwrap().unwrap().form_json,
            r#"{"crew":6}"#
        );

        assert_eq!(
            actions(&storage, id),
            vec![
                AuditAction::CreateDraft,
                AuditAction::UpdateDraft,
                AuditAction::UpdateDraft,
                AuditAction::UpdateDraft,
                AuditAction::Submit,
            ]
        );
    }

    #[test]
    fn notes_and_actor_role_are_recorded() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);
        let id = report_at(&wf, JUNE_1, ReportStatus::Submitted);

        wf.confirm_report(&inspector(), id, Some("Checked on site".into()))
            .unwrap();
        wf.first_approve(&are(), id, Some("   ".into())).unwrap();

        let trail = storage.load_audit(id).unwrap();
        let confirm = &trail[2];
        assert_eq!(confirm.action, AuditAction::Confirm);
        assert_eq!(confirm.actor_id, 12);
        assert_eq!(confirm.actor_role, Role::Inspector);
        assert_eq!(confirm.notes.as_deref(), Some("Checked on site"));
        assert_eq!(trail[3].notes, None);
    }

    #[test]
    fn seal_without_contract_is_refused_before_any_write() {
        let (_dir, storage) = test_storage();
        let project = storage.insert_project(Some("P7"), "No contract").unwrap();
        storage
            .save_assignment(&crate::model::Assignment {
                project_id: project,
                siteagent_id: Some(11),
                inspector_id: Some(12),
                are_id: Some(13),
                re_id: Some(14),
            })
            .unwrap();
        let wf = Workflow::new(&storage);
        let id = report_at(&wf, JUNE_1, ReportStatus::FirstApproved);

        let err = wf.second_approve_and_seal(&re(), id, None).unwrap_err();

        assert!(matches!(err, WorkflowError::Conflict(_)));
        let report = storage.get_report(id).unwrap().unwrap();
        assert_eq!(report.status, ReportStatus::FirstApproved);
        assert!(report.sealed_at.is_none());
        assert_eq!(actions(&storage, id).len(), 4);
    }

    #[test]
    fn resealing_a_key_keeps_one_snapshot_with_latest_content() {
        let (_dir, storage) = seeded_storage();
        // A second project whose reports erroneously point at contract 1.
        let second = storage.insert_project(Some("P9"), "Spur road").unwrap();
        storage
            .save_assignment(&crate::model::Assignment {
                project_id: second,
                siteagent_id: Some(11),
                inspector_id: Some(12),
                are_id: Some(13),
                re_id: Some(15),
            })
            .unwrap();

        let mut ids = Vec::new();
        for (project, payload) in [(1, r#"{"v":1}"#), (second, r#"{"v":2}"#)] {
            let id = storage
                .create_report(&NewReport {
                    project_id: project,
                    contract_id: Some(1),
                    report_date: JUNE_1,
                    form_json: payload.into(),
                    created_by: 11,
                    created_at: Timestamp::now(),
                })
                .unwrap();
            storage
                .update_report(
                    id,
                    ReportStatus::Draft,
                    &ReportPatch {
                        status: Some((ReportStatus::FirstApproved, Timestamp::now())),
                        ..ReportPatch::default()
                    },
                )
                .unwrap();
            ids.push(id);
        }

        let wf = Workflow::new(&storage);
        wf.second_approve_and_seal(&re(), ids[0], None).unwrap();
        let second_re = Identity {
            id: 15,
            role: Role::SecondEngineer,
            username: None,
        };
        let outcome = wf.second_approve_and_seal(&second_re, ids[1], None).unwrap();

        assert_eq!(outcome.sealed.contract_id, 1);
        assert_eq!(storage.count_snapshots(1, JUNE_1).unwrap(), 1);
        let snap = storage.get_snapshot(1, JUNE_1).unwrap().unwrap();
        assert_eq!(snap.form_data, json!({"v": 2}));
        assert_eq!(snap.approved_by, "15");
    }

    #[test]
    fn malformed_payload_still_seals() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);
        let id = wf
            .create_report(
                &agent(),
                &DraftRequest {
                    form_json: "crew=12".into(),
                    ..draft("P7", JUNE_1)
                },
            )
            .unwrap()
            .report
            .id;
        wf.submit_report(&agent(), id).unwrap();
        wf.confirm_report(&inspector(), id, None).unwrap();
        wf.first_approve(&are(), id, None).unwrap();

        wf.second_approve_and_seal(&re(), id, None).unwrap();

        let snap = storage.get_snapshot(1, JUNE_1).unwrap().unwrap();
        assert_eq!(snap.form_data, json!({}));
    }

    #[test]
    fn reading_requires_admin_or_assignment() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);
        let id = report_at(&wf, JUNE_1, ReportStatus::Draft);

        assert!(wf.get_report(&admin(), id).is_ok());
        assert!(wf.get_report(&re(), id).is_ok());
        assert!(wf.report_history(&inspector(), id).is_ok());

        let stranger = Identity {
            id: 99,
            role: Role::FieldAgent,
            username: None,
        };
        assert!(matches!(
            wf.get_report(&stranger, id),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            wf.report_history(&stranger, id),
            Err(WorkflowError::Forbidden(_))
        ));
    }

    #[test]
    fn listing_filters_rows_by_viewer() {
        let (_dir, storage) = seeded_storage();
        let other = storage.insert_project(Some("P8"), "Other").unwrap();
        storage
            .save_assignment(&crate::model::Assignment {
                project_id: other,
                siteagent_id: Some(21),
                ..crate::model::Assignment::default()
            })
            .unwrap();
        let wf = Workflow::new(&storage);
        report_at(&wf, JUNE_1, ReportStatus::Submitted);
        report_at(&wf, jiff::civil::date(2025, 6, 2), ReportStatus::Draft);
        let other_agent = Identity {
            id: 21,
            role: Role::FieldAgent,
            username: None,
        };
        wf.create_report(&other_agent, &draft("P8", JUNE_1)).unwrap();

        let all = wf.list_reports(&admin(), &ReportQuery::default()).unwrap();
        assert_eq!(all.len(), 3);

        let mine = wf.list_reports(&inspector(), &ReportQuery::default()).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.report.project_id == 1));

        let theirs = wf
            .list_reports(&other_agent, &ReportQuery::default())
            .unwrap();
        assert_eq!(theirs.len(), 1);

        let submitted = wf
            .list_reports(
                &inspector(),
                &ReportQuery {
                    project: Some(ProjectRef::Number("P7".into())),
                    status: Some(ReportStatus::Submitted),
                    ..ReportQuery::default()
                },
            )
            .unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].report.report_date, JUNE_1);

        let err = wf
            .list_reports(
                &admin(),
                &ReportQuery {
                    project: Some(ProjectRef::Number("NOPE".into())),
                    ..ReportQuery::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::BadRequest(_)));
    }

    #[test]
    fn approved_snapshot_lookup() {
        let (_dir, storage) = seeded_storage();
        let wf = Workflow::new(&storage);
        let by_project = SnapshotLookup::Project(ProjectRef::Number("P7".into()));

        assert!(matches!(
            wf.get_approved_snapshot(&by_project, JUNE_1),
            Err(WorkflowError::NotFound(_))
        ));

        let id = report_at(&wf, JUNE_1, ReportStatus::FirstApproved);
        wf.second_approve_and_seal(&re(), id, None).unwrap();

        let snap = wf.get_approved_snapshot(&by_project, JUNE_1).unwrap();
        assert_eq!(snap.contract_id, 1);
        let snap = wf
            .get_approved_snapshot(&SnapshotLookup::Contract(1), JUNE_1)
            .unwrap();
        assert_eq!(snap.approved_by, "e2");

        let bare = storage.insert_project(Some("P10"), "No contract").unwrap();
        assert!(matches!(
            wf.get_approved_snapshot(&SnapshotLookup::Project(ProjectRef::Id(bare)), JUNE_1),
            Err(WorkflowError::NotFound(_))
        ));
        assert!(matches!(
            wf.get_approved_snapshot(
                &SnapshotLookup::Project(ProjectRef::Number("NOPE".into())),
                JUNE_1
            ),
            Err(WorkflowError::BadRequest(_))
        ));
    }

    #[test]
    fn my_projects_follow_assignment() {
        let (_dir, storage) = seeded_storage();
        storage.insert_project(Some("P8"), "Other").unwrap();
        let wf = Workflow::new(&storage);

        assert_eq!(wf.my_projects(&admin()).unwrap().len(), 2);
        let mine = wf.my_projects(&are()).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Northern bypass");
    }
}
