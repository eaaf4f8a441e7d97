//! `mealplan recipes` commands: browse the corpus.

use anyhow::{Context, Result};
use uuid::Uuid;

use mealplan_core::recipe::{RecipeCorpus, RecipeFilter};

use crate::store::JsonCorpus;

/// List recipes, optionally narrowed by tag and free-text filters.
pub async fn run_list(corpus: &JsonCorpus, tags: Vec<String>, text: Option<String>) -> Result<()> {
    let filter = RecipeFilter { tags, text };
    let recipes = corpus.list(&filter).await;

    if recipes.is_empty() {
        println!("No recipes match.");
        return Ok(());
    }

    for recipe in &recipes {
        println!(
            "{}  {} ({} servings) [{}]",
            recipe.id,
            recipe.title,
            recipe.servings,
            recipe.tags.join(", ")
        );
    }
    println!();
    println!("{} recipe(s).", recipes.len());
    Ok(())
}

/// Show one recipe in full.
pub async fn run_show(corpus: &JsonCorpus, recipe_id_str: &str) -> Result<()> {
    let recipe_id = Uuid::parse_str(recipe_id_str)
        .with_context(|| format!("invalid recipe ID: {recipe_id_str}"))?;
    let recipe = corpus
        .get(recipe_id)
        .await
        .with_context(|| format!("recipe {recipe_id} not found"))?;

    println!("{} ({})", recipe.title, recipe.id);
    println!("{}", recipe.summary);
    println!("Servings: {}", recipe.servings);
    println!("Tags: {}", recipe.tags.join(", "));
    println!();

    println!("Ingredients:");
    for ing in &recipe.ingredients {
        match (ing.quantity, ing.unit.as_deref()) {
            (Some(q), Some(u)) => println!("  {q} {u} {}", ing.name),
            (Some(q), None) => println!("  {q} {}", ing.name),
            _ => println!("  {}", ing.name),
        }
    }
    println!();

    println!("Instructions:");
    for (i, step) in recipe.instructions.iter().enumerate() {
        println!("  {}. {step}", i + 1);
    }
    Ok(())
}
