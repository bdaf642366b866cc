mod commands;
mod render;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use taskcal_core::TaskcalConfig;
use taskcal_core::remote::Provider;
use taskcal_core::store::FileKv;
use taskcal_core::sync::Orchestrator;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskcal")]
#[command(about = "Manage your weekly tasks and sync them with a remote document store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a week of tasks
    Show {
        /// Any date inside the week to show (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Add a task to a day
    Add {
        title: String,

        /// Day to add the task to (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Task kind: planning, reflection, checkin or custom
        #[arg(short, long, default_value = "custom")]
        kind: String,
    },
    /// Toggle a step of a task
    Check {
        /// Task id (or unique id prefix)
        task: String,

        /// 1-based step number
        step: usize,
    },
    /// Show sync status
    Status,
    /// Control syncing with the remote document store
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
    /// Export all task data to a JSON file
    Export { path: String },
    /// Import task data from a JSON file
    Import { path: String },
}

#[derive(Subcommand)]
enum SyncAction {
    /// Connect to the configured provider and start syncing
    On,
    /// Disconnect and clear stored credentials
    Off,
    /// Reset failure state and retry immediately
    Retry,
    /// Reset failure state without retrying
    Reset,
    /// Force a fresh remote load and merge (for stalled sync)
    Recover,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let orchestrator = build_orchestrator()?;

    match cli.command {
        Commands::Show { date } => commands::show::run(&orchestrator, date.as_deref()).await,
        Commands::Add { title, date, kind } => {
            commands::add::run(&orchestrator, &title, date.as_deref(), &kind).await
        }
        Commands::Check { task, step } => commands::check::run(&orchestrator, &task, step).await,
        Commands::Status => commands::status::run(&orchestrator),
        Commands::Sync { action } => match action {
            SyncAction::On => commands::sync::on(&orchestrator).await,
            SyncAction::Off => commands::sync::off(&orchestrator).await,
            SyncAction::Retry => commands::sync::retry(&orchestrator).await,
            SyncAction::Reset => commands::sync::reset(&orchestrator),
            SyncAction::Recover => commands::sync::recover(&orchestrator).await,
        },
        Commands::Export { path } => commands::export::run(&orchestrator, &path).await,
        Commands::Import { path } => commands::import::run(&orchestrator, &path).await,
    }
}

fn build_orchestrator() -> Result<Orchestrator<Provider, FileKv>> {
    let config = TaskcalConfig::load()?;

    // The provider binary is only spawned when a sync operation actually
    // runs, so a placeholder name is fine for local-only use.
    let provider = Provider::from_name(config.provider.as_deref().unwrap_or("none"));
    let kv = FileKv::new(config.data_path());

    Ok(Orchestrator::new(
        kv,
        provider,
        &config.document_name,
        config.client_id.clone(),
        config.scope.clone(),
    )?)
}
