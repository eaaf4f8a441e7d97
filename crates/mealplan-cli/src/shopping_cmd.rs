//! `mealplan shopping` command: consolidated shopping list for a plan.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use mealplan_core::PlanService;
use mealplan_core::history::SelectionHistory;
use mealplan_core::recipe::RecipeId;
use mealplan_core::shopping::{Category, ShoppingList};

use crate::config::MealplanConfig;
use crate::store::{JsonCorpus, JsonlHistory};

/// Build the shopping list for the user's most recent selection, or for an
/// explicit set of recipe IDs when `--recipe` flags are given.
pub async fn run_shopping(
    config: &MealplanConfig,
    recipe_id_strs: Vec<String>,
    servings: u32,
) -> Result<()> {
    let history = JsonlHistory::new(config.history_path());

    let recipe_ids: Vec<RecipeId> = if recipe_id_strs.is_empty() {
        let recent = history
            .recent(&config.user, 1)
            .await
            .context("failed to read selection history")?;
        match recent.into_iter().next() {
            Some(record) => record.recipe_ids,
            None => bail!(
                "no selection on record for {} (run `mealplan plan` then `mealplan choose`)",
                config.user
            ),
        }
    } else {
        recipe_id_strs
            .iter()
            .map(|s| Uuid::parse_str(s).with_context(|| format!("invalid recipe ID: {s}")))
            .collect::<Result<_>>()?
    };

    let corpus = JsonCorpus::load(&config.recipes_path())?;
    let service = PlanService::new(Arc::new(corpus), Arc::new(history));
    let list = service
        .build_shopping_list(&recipe_ids, servings)
        .await
        .context("failed to build shopping list")?;

    print_list(&list, servings);
    Ok(())
}

fn print_list(list: &ShoppingList, servings: u32) {
    println!("Shopping list ({servings} servings):");
    println!();

    for category in [
        Category::Produce,
        Category::Protein,
        Category::Dairy,
        Category::Pantry,
        Category::Other,
    ] {
        let lines: Vec<_> = list.lines_in(category).collect();
        if lines.is_empty() {
            continue;
        }
        println!("{}:", category.label());
        for line in lines {
            let mark = if line.needs_review { "  (check quantities)" } else { "" };
            match (line.display_quantity, line.unit.as_deref()) {
                (Some(q), Some(u)) => println!("  {q} {u} {}{mark}", line.name),
                (Some(q), None) => println!("  {q} {}{mark}", line.name),
                _ => println!("  {}{mark}", line.name),
            }
        }
        println!();
    }

    println!("{} item(s).", list.len());
}
