mod cli;
mod config;
mod identity;
mod model;
mod storage;
mod workflow;

use std::process;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::Config;
use storage::Storage;
use workflow::WorkflowError;

fn main() {
    init_tracing();
    if let Err(e) = Cli::parse_args().and_then(run) {
        match &e {
            WorkflowError::Storage(inner) => tracing::error!(error = %inner, "storage failure"),
            WorkflowError::Config(message) => tracing::error!(%message, "configuration failure"),
            WorkflowError::Output(inner) => tracing::error!(error = %inner, "output failure"),
            _ => {}
        }
        let body = e.body();
        match serde_json::to_string(&body) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("{}", body.message),
        }
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), WorkflowError> {
    let config = Config::load().map_err(WorkflowError::Config)?;
    let path = config.database_path().ok_or_else(|| {
        WorkflowError::Config(
            "could not determine home directory; set SITEBOOK_DB".to_string(),
        )
    })?;
    let storage = Storage::open(&path)?;
    cli::run(cli, &config, &storage)
}

/// Logs go to stderr so stdout stays pure JSON. `RUST_LOG` overrides the
/// default `warn` level.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
