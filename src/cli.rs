//! CLI interface for Sitebook.
//!
//! Each subcommand is non-interactive: arguments in, JSON out on stdout.
//! Every invocation acts as one caller, resolved from `--user-id`/`--role`
//! flags, `SITEBOOK_*` environment variables, or the config file.
//!
//! Commands split into groups:
//!
//! - `sitebook report ...` drafts, transitions, and reads of daily reports.
//! - `sitebook approved show` the sealed form for a contract and day.
//! - `sitebook project ...`, `sitebook contract add` directory upkeep.

mod approved;
mod project;
mod report;

use std::ffi::OsString;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::Config;
use crate::identity::{PartialIdentity, resolve_identity};
use crate::storage::Storage;
use crate::workflow::{Workflow, WorkflowError};

use approved::ApprovedCommand;
use project::{ContractCommand, ProjectCommand};
use report::ReportCommand;

/// Sitebook: daily site reports, reviewed and sealed.
#[derive(Debug, Parser)]
#[command(name = "sitebook", version, after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Acting user id.
    #[arg(long, global = true, value_name = "ID")]
    user_id: Option<i64>,

    /// Acting role: siteagent, inspector, are, re, or admin.
    #[arg(long, global = true)]
    role: Option<String>,

    /// Display name recorded when sealing.
    #[arg(long, global = true)]
    username: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: one report from draft to sealed
  1. sitebook --user-id 11 --role siteagent report new --project P7 --date 2025-06-01 --form '{"crew":12}'
     → prints the draft (note its id)
  2. sitebook --user-id 11 --role siteagent report submit 1
  3. sitebook --user-id 12 --role inspector report confirm 1 --notes "Checked on site"
  4. sitebook --user-id 13 --role are report approve 1
  5. sitebook --user-id 14 --role re --username e2 report seal 1

Reading:
  sitebook report list --project P7 --status SUBMITTED
  sitebook report history 1
  sitebook approved show --project P7 --date 2025-06-01"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Daily work reports: create, edit, advance, and read.
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },

    /// Sealed forms published by the final approval.
    Approved {
        #[command(subcommand)]
        command: ApprovedCommand,
    },

    /// Projects and their role assignments.
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Contracts reports are sealed under.
    Contract {
        #[command(subcommand)]
        command: ContractCommand,
    },
}

impl Cli {
    /// Parse the process arguments.
    ///
    /// Help and version requests print and exit as usual. Any other
    /// rejection becomes a `BadRequest`, reported like every other failure.
    pub fn parse_args() -> Result<Self, WorkflowError> {
        Self::parse_args_from(std::env::args_os())
    }

    fn parse_args_from<I, T>(args: I) -> Result<Self, WorkflowError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(|e| match e.kind() {
            clap::error::ErrorKind::DisplayHelp
            | clap::error::ErrorKind::DisplayVersion
            | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => e.exit(),
            _ => WorkflowError::BadRequest(usage_message(&e)),
        })
    }

    fn identity_flags(&self) -> PartialIdentity {
        PartialIdentity {
            id: self.user_id,
            role: self.role.clone(),
            username: self.username.clone(),
        }
    }
}

/// Run one parsed command as the resolved caller.
pub fn run(cli: Cli, config: &Config, storage: &Storage) -> Result<(), WorkflowError> {
    let who = resolve_identity(cli.identity_flags(), &config.identity)?;
    let workflow = Workflow::new(storage);

    match cli.command {
        Command::Report { command } => report::run(&workflow, &who, command),
        Command::Approved { command } => approved::run(&workflow, command),
        Command::Project { command } => project::run_project(&workflow, &who, command),
        Command::Contract { command } => project::run_contract(&workflow, &who, command),
    }
}

/// The first line of clap's rendered error, without its `error: ` prefix.
fn usage_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).trim().to_string()
}

/// Print a value as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<(), WorkflowError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
