//! Report commands: new, update, the four transitions, and reads.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use jiff::civil::Date;

use crate::{
    model::{Identity, ProjectRef, ReportStatus},
    workflow::{DraftRequest, ReportQuery, Workflow, WorkflowError},
};

use super::print_json;

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Create a draft for a project and day. Site Agent only.
    New {
        /// Project id or project number.
        #[arg(long)]
        project: ProjectRef,

        /// Calendar day the report covers (YYYY-MM-DD).
        #[arg(long)]
        date: Date,

        /// Contract to seal under. Defaults to the project's latest at seal time.
        #[arg(long)]
        contract: Option<i64>,

        #[command(flatten)]
        form: FormArgs,
    },

    /// Replace a draft's form payload.
    Update {
        id: i64,

        #[command(flatten)]
        form: FormArgs,

        /// Set the contract. Omit to keep the current one.
        #[arg(long)]
        contract: Option<i64>,
    },

    /// Submit a draft for inspection.
    Submit { id: i64 },

    /// Confirm a submitted report. Inspector only.
    Confirm {
        id: i64,

        #[arg(long)]
        notes: Option<String>,
    },

    /// First engineering approval of a confirmed report. ARE only.
    Approve {
        id: i64,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Final approval: seals the report and publishes the approved form. RE only.
    Seal {
        id: i64,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Show one report.
    Show { id: i64 },

    /// List reports visible to the caller, newest day first.
    List {
        #[arg(long)]
        project: Option<ProjectRef>,

        /// DRAFT, SUBMITTED, CONFIRMED, FIRST_APPROVED, or SEALED.
        #[arg(long)]
        status: Option<ReportStatus>,

        #[arg(long)]
        date: Option<Date>,
    },

    /// Show a report's audit trail, oldest first.
    History { id: i64 },
}

/// The form payload, inline or from a file.
#[derive(Debug, Args)]
#[group(multiple = false)]
pub struct FormArgs {
    /// Form payload as JSON text.
    #[arg(long)]
    form: Option<String>,

    /// Read the form payload from a file.
    #[arg(long, value_name = "PATH")]
    form_file: Option<PathBuf>,
}

impl FormArgs {
    /// The payload text, if one was given.
    fn read(self) -> Result<Option<String>, WorkflowError> {
        if let Some(path) = self.form_file {
            let text = fs::read_to_string(&path).map_err(|e| {
                WorkflowError::BadRequest(format!("failed to read {}: {e}", path.display()))
            })?;
            return Ok(Some(text));
        }
        Ok(self.form)
    }
}

pub(super) fn run(
    workflow: &Workflow<'_>,
    who: &Identity,
    command: ReportCommand,
) -> Result<(), WorkflowError> {
    match command {
        ReportCommand::New {
            project,
            date,
            contract,
            form,
        } => {
            let draft = DraftRequest {
                project,
                contract_id: contract,
                report_date: date,
                form_json: form.read()?.unwrap_or_else(|| "{}".to_string()),
            };
            print_json(&workflow.create_report(who, &draft)?)
        }
        ReportCommand::Update { id, form, contract } => {
            let form_json = form.read()?.ok_or_else(|| {
                WorkflowError::BadRequest("update needs --form or --form-file".to_string())
            })?;
            print_json(&workflow.update_report(who, id, form_json, contract)?)
        }
        ReportCommand::Submit { id } => print_json(&workflow.submit_report(who, id)?),
        ReportCommand::Confirm { id, notes } => {
            print_json(&workflow.confirm_report(who, id, notes)?)
        }
        ReportCommand::Approve { id, notes } => {
            print_json(&workflow.first_approve(who, id, notes)?)
        }
        ReportCommand::Seal { id, notes } => {
            print_json(&workflow.second_approve_and_seal(who, id, notes)?)
        }
        ReportCommand::Show { id } => print_json(&workflow.get_report(who, id)?),
        ReportCommand::List {
            project,
            status,
            date,
        } => {
            let query = ReportQuery {
                project,
                status,
                report_date: date,
            };
            print_json(&workflow.list_reports(who, &query)?)
        }
        ReportCommand::History { id } => print_json(&workflow.report_history(who, id)?),
    }
}
