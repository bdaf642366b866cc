use anyhow::{Context, Result};
use taskcal_core::remote::DocumentStore;
use taskcal_core::store::KeyValue;
use taskcal_core::sync::Orchestrator;

pub async fn run<S: DocumentStore, K: KeyValue>(
    orchestrator: &Orchestrator<S, K>,
    path: &str,
) -> Result<()> {
    let dataset = orchestrator.load_data().await?;

    // Exports are pure task data; sync metadata stays internal.
    let contents = serde_json::to_string_pretty(&dataset.without_meta())
        .context("Failed to serialize task data")?;
    std::fs::write(path, contents).with_context(|| format!("Failed to write {path}"))?;

    println!("Exported {} tasks to {path}", dataset.task_count());
    Ok(())
}
