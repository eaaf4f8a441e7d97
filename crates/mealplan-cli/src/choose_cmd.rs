//! `mealplan choose` command: select one candidate from the stashed batch.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use mealplan_core::PlanService;
use mealplan_core::generator::GenerationBatch;

use crate::config::MealplanConfig;
use crate::store::{self, JsonCorpus, JsonlHistory};

/// Select a candidate by 1-based option number (as printed by `plan`) or by
/// candidate UUID, append the selection to the history log, and retire the
/// stashed batch.
pub async fn run_choose(config: &MealplanConfig, candidate_str: &str) -> Result<()> {
    let batch = store::load_batch(&config.batch_path())?;
    let batch_id = batch.id;
    let candidate_id = resolve_candidate(&batch, candidate_str)?;

    let corpus = JsonCorpus::load(&config.recipes_path())?;
    let history = JsonlHistory::new(config.history_path());
    let service = PlanService::new(Arc::new(corpus), Arc::new(history));
    service.restore_batch(batch).await;

    let record = service
        .select_plan(&config.user, batch_id, candidate_id)
        .await
        .context("failed to record selection")?;

    store::clear_batch(&config.batch_path())?;

    println!("Recorded selection for {}:", record.user_id);
    for id in &record.recipe_ids {
        println!("  {id}");
    }
    println!();
    println!("Build the list with `mealplan shopping`.");
    Ok(())
}

/// Accept either a 1-based option number or a full candidate UUID.
fn resolve_candidate(batch: &GenerationBatch, candidate_str: &str) -> Result<Uuid> {
    if let Ok(index) = candidate_str.parse::<usize>() {
        if index == 0 || index > batch.candidates.len() {
            bail!(
                "option {index} is out of range (batch has {} candidates)",
                batch.candidates.len()
            );
        }
        return Ok(batch.candidates[index - 1].id);
    }
    Uuid::parse_str(candidate_str)
        .with_context(|| format!("invalid candidate: {candidate_str} (expected an option number or UUID)"))
}
