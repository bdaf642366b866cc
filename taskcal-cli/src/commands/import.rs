use anyhow::{Context, Result};
use chrono::Utc;
use taskcal_core::Dataset;
use taskcal_core::merge::merge_datasets;
use taskcal_core::remote::DocumentStore;
use taskcal_core::store::KeyValue;
use taskcal_core::sync::Orchestrator;

pub async fn run<S: DocumentStore, K: KeyValue>(
    orchestrator: &Orchestrator<S, K>,
    path: &str,
) -> Result<()> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).with_context(|| format!("{path} is not valid JSON"))?;

    let imported = Dataset::from_local_value(value);
    if imported.is_empty() {
        anyhow::bail!("{path} contains no tasks");
    }

    // Merge instead of overwrite, so importing an old backup can't lose
    // anything added since.
    let current = orchestrator.load_data().await?;
    let merged = merge_datasets(&current, &imported, Utc::now());

    orchestrator.save_data(&merged).await?;
    println!(
        "Imported {} tasks from {path} ({} total after merge)",
        imported.task_count(),
        merged.task_count()
    );
    Ok(())
}
