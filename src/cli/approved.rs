//! Approved form lookup.

use clap::Subcommand;
use jiff::civil::Date;

use crate::{
    model::ProjectRef,
    workflow::{SnapshotLookup, Workflow, WorkflowError},
};

use super::print_json;

#[derive(Debug, Subcommand)]
pub enum ApprovedCommand {
    /// Show the sealed form for a contract and day.
    ///
    /// With `--project`, the project's most recent contract is used.
    Show {
        #[arg(long, conflicts_with = "project")]
        contract: Option<i64>,

        /// Project id or project number.
        #[arg(long)]
        project: Option<ProjectRef>,

        /// Form date (YYYY-MM-DD).
        #[arg(long)]
        date: Date,
    },
}

pub(super) fn run(workflow: &Workflow<'_>, command: ApprovedCommand) -> Result<(), WorkflowError> {
    match command {
        ApprovedCommand::Show {
            contract,
            project,
            date,
        } => {
            let lookup = match (contract, project) {
                (Some(id), _) => SnapshotLookup::Contract(id),
                (None, Some(project)) => SnapshotLookup::Project(project),
                (None, None) => {
                    return Err(WorkflowError::BadRequest(
                        "pass --contract or --project".to_string(),
                    ));
                }
            };
            print_json(&workflow.get_approved_snapshot(&lookup, date)?)
        }
    }
}
