//! `plantfit` — look up plants and score how well they suit a garden spot.
//!
//! # Examples
//!
//! ```sh
//! # Resolve a free-text name into candidate species
//! PLANTFIT_API_KEY=sk-or-... plantfit search czerwona róża
//!
//! # Score a placement described in a JSON file
//! plantfit --config plantfit.toml fit --context balkon.json
//!
//! # Check that the key and endpoint work
//! plantfit ping
//! ```
//!
//! Results go to stdout as pretty JSON; logs go to stderr. `RUST_LOG`
//! controls verbosity.

mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use plantfit_llm::{LlmError, PlantAiClient};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,plantfit_llm=info";

#[derive(Parser)]
#[command(name = "plantfit", version, about = "AI plant lookup and site-fit scoring")]
struct Cli {
    /// TOML settings file; `PLANTFIT_*` environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a plant name into 1-5 candidate species
    Search {
        /// Free-text query, e.g. a common or Latin name
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Score how well a plant fits a site
    Fit {
        /// JSON file with the plant, location, climate and cell
        #[arg(long)]
        context: PathBuf,
    },
    /// Probe the provider with a trivial search
    Ping,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn call_failed(err: LlmError) -> anyhow::Error {
    anyhow!("[{}] {err}", err.code())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let settings = settings::load_settings(cli.config.as_deref())?;
    let client = PlantAiClient::from_settings(settings)?;
    info!(
        search_model = client.config().search_model(),
        fit_model = client.config().fit_model(),
        "plant AI client ready"
    );

    match cli.command {
        Command::Search { query } => {
            let candidates = client.search(&query.join(" ")).await.map_err(call_failed)?;
            print_json(&candidates)?;
        }
        Command::Fit { context } => {
            let ctx = settings::load_fit_context(&context)?;
            let result = client.check_fit(&ctx).await.map_err(call_failed)?;
            print_json(&result)?;
        }
        Command::Ping => {
            let status = client.test_connection().await;
            print_json(&status)?;
            if !status.success {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
