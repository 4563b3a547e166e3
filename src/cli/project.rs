//! Directory commands: projects, assignments, contracts.

use clap::Subcommand;

use crate::{
    model::{Identity, ProjectRef},
    workflow::{AssignmentUpdate, Workflow, WorkflowError},
};

use super::print_json;

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// List projects you hold a role on. Admins see every project.
    Mine,

    /// Register a project. Admin only.
    Add {
        /// Human-readable project number (e.g. `P7`).
        #[arg(long)]
        number: Option<String>,

        #[arg(long)]
        name: String,
    },

    /// Bind users to a project's workflow roles. Admin only.
    ///
    /// Roles not given keep their current holder.
    Assign {
        /// Project id or project number.
        project: ProjectRef,

        #[arg(long, value_name = "USER_ID")]
        siteagent: Option<i64>,

        #[arg(long, value_name = "USER_ID")]
        inspector: Option<i64>,

        #[arg(long, value_name = "USER_ID")]
        are: Option<i64>,

        #[arg(long, value_name = "USER_ID")]
        re: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ContractCommand {
    /// Add a contract to a project. Admin only.
    Add {
        /// Project id or project number.
        project: ProjectRef,

        #[arg(long)]
        number: Option<String>,
    },
}

pub(super) fn run_project(
    workflow: &Workflow<'_>,
    who: &Identity,
    command: ProjectCommand,
) -> Result<(), WorkflowError> {
    match command {
        ProjectCommand::Mine => print_json(&workflow.my_projects(who)?),
        ProjectCommand::Add { number, name } => {
            print_json(&workflow.add_project(who, number.as_deref(), &name)?)
        }
        ProjectCommand::Assign {
            project,
            siteagent,
            inspector,
            are,
            re,
        } => {
            let update = AssignmentUpdate {
                siteagent_id: siteagent,
                inspector_id: inspector,
                are_id: are,
                re_id: re,
            };
            print_json(&workflow.assign(who, &project, &update)?)
        }
    }
}

pub(super) fn run_contract(
    workflow: &Workflow<'_>,
    who: &Identity,
    command: ContractCommand,
) -> Result<(), WorkflowError> {
    match command {
        ContractCommand::Add { project, number } => {
            print_json(&workflow.add_contract(who, &project, number.as_deref())?)
        }
    }
}
