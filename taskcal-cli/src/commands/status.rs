use anyhow::Result;
use taskcal_core::remote::DocumentStore;
use taskcal_core::store::KeyValue;
use taskcal_core::sync::Orchestrator;

use crate::render::Render;

pub fn run<S: DocumentStore, K: KeyValue>(orchestrator: &Orchestrator<S, K>) -> Result<()> {
    println!("{}", orchestrator.get_sync_status().render());
    Ok(())
}
