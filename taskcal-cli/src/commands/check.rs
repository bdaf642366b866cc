use anyhow::Result;
use chrono::Utc;
use taskcal_core::DateKey;
use taskcal_core::remote::DocumentStore;
use taskcal_core::store::KeyValue;
use taskcal_core::sync::Orchestrator;

pub async fn run<S: DocumentStore, K: KeyValue>(
    orchestrator: &Orchestrator<S, K>,
    task_ref: &str,
    step_number: usize,
) -> Result<()> {
    if step_number == 0 {
        anyhow::bail!("Step numbers start at 1");
    }

    let mut dataset = orchestrator.load_data().await?;

    let matches: Vec<(DateKey, String)> = dataset
        .days
        .iter()
        .flat_map(|(day, tasks)| {
            tasks.iter().filter_map(|task| {
                task.id
                    .as_deref()
                    .filter(|id| id.starts_with(task_ref))
                    .map(|id| (*day, id.to_string()))
            })
        })
        .collect();

    let (day, id) = match matches.as_slice() {
        [] => anyhow::bail!("No task with id starting with '{task_ref}'"),
        [one] => one.clone(),
        many => anyhow::bail!(
            "'{task_ref}' matches {} tasks: {}",
            many.len(),
            many.iter()
                .map(|(_, id)| id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };

    let tasks = dataset.days.get_mut(&day).expect("bucket was just seen");
    let task = tasks
        .iter_mut()
        .find(|t| t.id.as_deref() == Some(id.as_str()))
        .expect("task was just seen");

    if task.steps.len() < step_number {
        anyhow::bail!("Task '{}' has {} steps", task.title, task.steps.len());
    }

    let step = &mut task.steps[step_number - 1];
    step.toggle();
    let now_complete = step.is_complete();
    let description = step.description.clone();

    task.last_modified = Utc::now();
    let completion = task.completion();
    let title = task.title.clone();

    orchestrator.save_data(&dataset).await?;

    println!(
        "{} step {} of '{}': {} ({}/{} done)",
        if now_complete { "Completed" } else { "Reopened" },
        step_number,
        title,
        description,
        completion.completed,
        completion.total,
    );
    Ok(())
}
