//! Admin upkeep of the project directory: projects, contracts, and who holds
//! each workflow role.

use crate::model::{Assignment, Contract, Identity, Project, ProjectRef, Role};

use super::{Workflow, WorkflowError, access};

/// Role slots to change on a project. `None` leaves a slot as it is.
#[derive(Debug, Clone, Default)]
pub struct AssignmentUpdate {
    pub siteagent_id: Option<i64>,
    pub inspector_id: Option<i64>,
    pub are_id: Option<i64>,
    pub re_id: Option<i64>,
}

impl AssignmentUpdate {
    fn apply(&self, assignment: &mut Assignment) {
        let slots = [
            (&mut assignment.siteagent_id, self.siteagent_id),
            (&mut assignment.inspector_id, self.inspector_id),
            (&mut assignment.are_id, self.are_id),
            (&mut assignment.re_id, self.re_id),
        ];
        for (slot, update) in slots {
            if update.is_some() {
                *slot = update;
            }
        }
    }
}

impl Workflow<'_> {
    /// Registers a project.
    pub fn add_project(
        &self,
        who: &Identity,
        project_number: Option<&str>,
        name: &str,
    ) -> Result<Project, WorkflowError> {
        access::require_role(who, Role::Admin, "manage projects")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::BadRequest("project name is required".to_string()));
        }
        let project_number = project_number.map(str::trim).filter(|n| !n.is_empty());
        if let Some(number) = project_number {
            // All-digit references resolve as ids, so such a number could never be found.
            if number.bytes().all(|b| b.is_ascii_digit()) {
                return Err(WorkflowError::BadRequest(format!(
                    "project number {number} must not be all digits"
                )));
            }
            if self
                .storage
                .find_project(&ProjectRef::Number(number.to_string()))?
                .is_some()
            {
                return Err(WorkflowError::Conflict(format!(
                    "project {number} already exists"
                )));
            }
        }

        let id = self.storage.insert_project(project_number, name)?;
        tracing::info!(project_id = id, actor_id = who.id, "project added");
        Ok(Project {
            id,
            project_number: project_number.map(str::to_string),
            name: name.to_string(),
        })
    }

    /// Adds a contract to a project. The newest contract is the one
    /// reports without their own contract are sealed under.
    pub fn add_contract(
        &self,
        who: &Identity,
        project: &ProjectRef,
        contract_number: Option<&str>,
    ) -> Result<Contract, WorkflowError> {
        access::require_role(who, Role::Admin, "manage contracts")?;
        let project_id = self.resolve_project(project)?;
        let id = self.storage.insert_contract(project_id, contract_number)?;
        tracing::info!(contract_id = id, project_id, actor_id = who.id, "contract added");
        self.storage
            .get_contract(id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("contract {id} vanished")))
    }

    /// Binds identities to a project's workflow roles.
    pub fn assign(
        &self,
        who: &Identity,
        project: &ProjectRef,
        update: &AssignmentUpdate,
    ) -> Result<Assignment, WorkflowError> {
        access::require_role(who, Role::Admin, "assign project roles")?;
        let project_id = self.resolve_project(project)?;
        let mut assignment = self
            .storage
            .resolve_assignment(project_id)?
            .unwrap_or(Assignment {
                project_id,
                ..Assignment::default()
            });
        update.apply(&mut assignment);
        self.storage.save_assignment(&assignment)?;
        tracing::info!(project_id, actor_id = who.id, "assignment saved");
        Ok(assignment)
    }
}
