//! Shared fixtures for mealplan integration tests.
//!
//! Recipe ids are deterministic (`Uuid::from_u128`) so tests can refer to
//! fixture recipes by number and batches stay reproducible across runs.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use mealplan_core::history::SelectionRecord;
use mealplan_core::recipe::{Ingredient, Recipe, RecipeId};

/// Deterministic recipe id for fixture recipe `n`.
pub fn fixture_id(n: u128) -> RecipeId {
    Uuid::from_u128(n)
}

/// Ingredient line shorthand.
pub fn ingredient(
    name: &str,
    quantity: Option<f64>,
    unit: Option<&str>,
    category: Option<&str>,
) -> Ingredient {
    Ingredient {
        name: name.to_string(),
        quantity,
        unit: unit.map(str::to_string),
        category: category.map(str::to_string),
    }
}

/// Recipe shorthand with a deterministic id.
pub fn recipe(n: u128, title: &str, tags: &[&str], ingredients: Vec<Ingredient>) -> Recipe {
    Recipe {
        id: fixture_id(n),
        title: title.to_string(),
        summary: format!("{title} for weeknights"),
        servings: 2,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ingredients,
        instructions: vec!["Cook it.".to_string()],
        last_used: None,
    }
}

/// A small, varied corpus: five proteins/cuisines, overlapping pantry
/// staples so consolidation has something to merge.
pub fn sample_corpus() -> Vec<Recipe> {
    vec![
        recipe(
            1,
            "Teriyaki Chicken",
            &["japanese", "chicken", "easy"],
            vec![
                ingredient("chicken thigh", Some(400.0), Some("g"), Some("protein")),
                ingredient("soy sauce", Some(3.0), Some("tbsp"), Some("pantry")),
                ingredient("green onion", Some(2.0), Some("piece"), Some("produce")),
            ],
        ),
        recipe(
            2,
            "Mapo Tofu",
            &["chinese", "tofu", "spicy"],
            vec![
                ingredient("tofu", Some(300.0), Some("g"), Some("protein")),
                ingredient("soy sauce", Some(1.0), Some("tbsp"), Some("pantry")),
                ingredient("scallion", Some(3.0), Some("piece"), Some("produce")),
            ],
        ),
        recipe(
            3,
            "Salmon Teriyaki",
            &["japanese", "fish"],
            vec![
                ingredient("salmon fillet", Some(0.3), Some("kg"), Some("protein")),
                ingredient("soy sauce", Some(2.0), Some("tbsp"), Some("pantry")),
            ],
        ),
        recipe(
            4,
            "Pasta Pomodoro",
            &["italian", "vegetarian", "easy"],
            vec![
                ingredient("spaghetti", Some(200.0), Some("g"), Some("grain")),
                ingredient("tomato", Some(4.0), Some("piece"), Some("produce")),
                ingredient("olive oil", Some(2.0), Some("tbsp"), Some("pantry")),
            ],
        ),
        recipe(
            5,
            "Chicken Curry",
            &["indian", "chicken", "spicy"],
            vec![
                ingredient("chicken thigh", Some(500.0), Some("g"), Some("protein")),
                ingredient("onion", Some(2.0), Some("piece"), Some("produce")),
                ingredient("curry powder", Some(2.0), Some("tbsp"), Some("pantry")),
            ],
        ),
    ]
}

/// A selection record `days_ago` days before [`fixed_now`], so snapshots
/// built with `fixed_now()` as "now" see stable ages.
pub fn selection(user_id: &str, recipe_ids: Vec<RecipeId>, days_ago: i64) -> SelectionRecord {
    SelectionRecord {
        user_id: user_id.to_string(),
        batch_id: Uuid::new_v4(),
        recipe_ids,
        selected_at: fixed_now() - Duration::days(days_ago),
        feedback: None,
    }
}

/// A fixed instant, for tests that need a stable "now".
pub fn fixed_now() -> DateTime<Utc> {
    "2026-08-01T18:00:00Z".parse().expect("valid fixture timestamp")
}
