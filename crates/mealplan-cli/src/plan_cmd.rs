//! `mealplan plan` command: generate ranked weekly plan candidates.

use std::sync::Arc;

use anyhow::{Context, Result};

use mealplan_core::PlanService;
use mealplan_core::generator::{GenerationBatch, PlanRequest};
use mealplan_core::preference::Preferences;

use crate::config::MealplanConfig;
use crate::store::{self, JsonCorpus, JsonlHistory};

pub struct PlanArgs {
    pub days: u8,
    pub servings: u32,
    pub options: u8,
    pub exclude_tags: Vec<String>,
    pub exclude_ingredients: Vec<String>,
    pub favor_tags: Vec<String>,
    pub disfavor_tags: Vec<String>,
    pub note: Option<String>,
}

/// Generate a batch, print the ranked candidates, and stash the batch so a
/// later `choose` invocation can select from it.
pub async fn run_plan(config: &MealplanConfig, args: PlanArgs) -> Result<()> {
    let corpus = JsonCorpus::load(&config.recipes_path())?;
    let history = JsonlHistory::new(config.history_path());
    let service = PlanService::new(Arc::new(corpus), Arc::new(history));

    let request = PlanRequest {
        user_id: config.user.clone(),
        days: args.days,
        servings: args.servings,
        options: args.options,
        preferences: Preferences {
            free_text: args.note,
            excluded_tags: args.exclude_tags,
            excluded_ingredients: args.exclude_ingredients,
            favored_tags: args.favor_tags,
            disfavored_tags: args.disfavor_tags,
        },
    };

    let batch = service
        .generate_plans(request)
        .await
        .context("plan generation failed")?;

    print_batch(&batch);

    store::save_batch(&config.batch_path(), &batch)?;
    println!();
    println!("Pick one with `mealplan choose <number>`.");
    Ok(())
}

fn print_batch(batch: &GenerationBatch) {
    println!(
        "Batch {} for {} ({} days, {} servings):",
        batch.id, batch.request.user_id, batch.request.days, batch.request.servings
    );
    println!();

    for (i, candidate) in batch.candidates.iter().enumerate() {
        println!("Option {} (score {:.2}):", i + 1, candidate.score);
        for day in &candidate.days {
            println!("  Day {}: {}", day.day, day.recipe_title);
        }
        println!("  {}", candidate.rationale);
        println!();
    }
}
