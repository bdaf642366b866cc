use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use taskcal_core::remote::DocumentStore;
use taskcal_core::store::KeyValue;
use taskcal_core::sync::Orchestrator;

use crate::render::Render;
use crate::utils::tui;

pub async fn on<S: DocumentStore, K: KeyValue>(orchestrator: &Orchestrator<S, K>) -> Result<()> {
    println!("Connecting to the remote document store...");

    let report = orchestrator.enable_sync().await?;

    println!("{}", "Sync enabled.".green());
    println!("{}", report.render());
    Ok(())
}

pub async fn off<S: DocumentStore, K: KeyValue>(orchestrator: &Orchestrator<S, K>) -> Result<()> {
    let confirmed = Confirm::new()
        .with_prompt("Disconnect sync? Your data stays on this device and in the remote store.")
        .default(false)
        .interact()?;

    if !confirmed {
        return Ok(());
    }

    orchestrator.disable_sync().await?;
    println!("Sync disabled. Data is stored locally only.");
    Ok(())
}

pub async fn retry<S: DocumentStore, K: KeyValue>(orchestrator: &Orchestrator<S, K>) -> Result<()> {
    let spinner = tui::create_spinner("Retrying sync".to_string());
    let dataset = orchestrator.force_sync_retry().await?;
    spinner.finish_and_clear();

    println!("Loaded {} tasks.", dataset.task_count());
    println!("{}", orchestrator.get_sync_status().render());
    Ok(())
}

pub fn reset<S: DocumentStore, K: KeyValue>(orchestrator: &Orchestrator<S, K>) -> Result<()> {
    orchestrator.reset_sync_state();
    println!("Sync failure state cleared.");
    Ok(())
}

pub async fn recover<S: DocumentStore, K: KeyValue>(
    orchestrator: &Orchestrator<S, K>,
) -> Result<()> {
    let spinner = tui::create_spinner("Recovering from remote".to_string());
    let dataset = orchestrator.emergency_recovery().await?;
    spinner.finish_and_clear();

    println!("Recovered dataset with {} tasks.", dataset.task_count());
    println!("{}", orchestrator.get_sync_status().render());
    Ok(())
}
