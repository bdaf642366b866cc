use anyhow::Result;
use taskcal_core::remote::DocumentStore;
use taskcal_core::store::KeyValue;
use taskcal_core::sync::Orchestrator;
use taskcal_core::{Task, TaskKind};

use super::show::parse_date_or_today;

pub async fn run<S: DocumentStore, K: KeyValue>(
    orchestrator: &Orchestrator<S, K>,
    title: &str,
    date: Option<&str>,
    kind: &str,
) -> Result<()> {
    let date = parse_date_or_today(date)?;
    let kind = TaskKind::from_wire(kind)
        .ok_or_else(|| anyhow::anyhow!("Unknown kind '{kind}'. Expected planning, reflection, checkin or custom"))?;

    let mut dataset = orchestrator.load_data().await?;

    let mut task = Task::recurring(kind, date);
    if kind == TaskKind::Custom {
        task.title = title.to_string();
    }
    let task_id = task.id.clone().unwrap_or_default();
    let task_title = task.title.clone();

    dataset.days.entry(date).or_default().push(task);
    orchestrator.save_data(&dataset).await?;

    println!("Added '{task_title}' on {date} ({task_id})");
    Ok(())
}
