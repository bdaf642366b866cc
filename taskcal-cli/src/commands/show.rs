use anyhow::Result;
use taskcal_core::DateKey;
use taskcal_core::remote::DocumentStore;
use taskcal_core::store::KeyValue;
use taskcal_core::sync::Orchestrator;

use crate::render::render_week;
use crate::utils::tui;

pub async fn run<S: DocumentStore, K: KeyValue>(
    orchestrator: &Orchestrator<S, K>,
    date: Option<&str>,
) -> Result<()> {
    let date = parse_date_or_today(date)?;

    let spinner = tui::create_spinner("Loading tasks".to_string());
    let mut dataset = orchestrator.load_data().await?;
    spinner.finish_and_clear();

    // Make sure the requested week has its recurring tasks before display.
    if dataset.ensure_week(date) > 0 {
        orchestrator.save_data(&dataset).await?;
    }

    println!("{}", render_week(&dataset, date));
    Ok(())
}

pub fn parse_date_or_today(date: Option<&str>) -> Result<DateKey> {
    match date {
        Some(s) => {
            DateKey::parse(s).ok_or_else(|| anyhow::anyhow!("Invalid date '{s}'. Expected YYYY-MM-DD"))
        }
        None => Ok(DateKey::today()),
    }
}
