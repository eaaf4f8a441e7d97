//! Recipe data model and the read-only corpus seam.
//!
//! The core never creates or mutates recipes; it consumes them through the
//! [`RecipeCorpus`] trait. [`InMemoryCorpus`] is the reference implementation,
//! used by tests and by embedders that load the corpus themselves.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable recipe identifier. Also the deterministic tie-breaker for
/// scoring and sampling order.
pub type RecipeId = Uuid;

/// One ingredient line as it appears in a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Ingredient name as written in the recipe (pre-canonicalization).
    pub name: String,
    /// Numeric amount, if the recipe gives one ("to taste" lines have none).
    #[serde(default)]
    pub quantity: Option<f64>,
    /// Free-form unit ("g", "tbsp", "bunch", ...), if any.
    #[serde(default)]
    pub unit: Option<String>,
    /// Coarse store-category hint (produce, protein, dairy, pantry).
    #[serde(default)]
    pub category: Option<String>,
}

/// A recipe as seen by the planning core. Immutable; owned by the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    /// Short description of the dish, used in rationale signals.
    #[serde(default)]
    pub summary: String,
    /// Servings the ingredient quantities are written for.
    pub servings: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    /// When this recipe last appeared in a selected plan, if known.
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

impl Recipe {
    /// Case-insensitive tag membership test.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Case-insensitive ingredient-name containment test.
    ///
    /// Matches on substring so "chicken" excludes both "chicken thigh"
    /// and "chicken breast".
    pub fn has_ingredient(&self, name: &str) -> bool {
        let needle = name.to_lowercase();
        self.ingredients
            .iter()
            .any(|i| i.name.to_lowercase().contains(&needle))
    }
}

/// Query filter for corpus listing. An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    /// Recipes must carry all of these tags.
    pub tags: Vec<String>,
    /// Case-insensitive substring match against title and summary.
    pub text: Option<String>,
}

impl RecipeFilter {
    pub fn matches(&self, recipe: &Recipe) -> bool {
        if !self.tags.iter().all(|t| recipe.has_tag(t)) {
            return false;
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            return recipe.title.to_lowercase().contains(&needle)
                || recipe.summary.to_lowercase().contains(&needle);
        }
        true
    }
}

/// Read-only view over the available recipes.
///
/// Object-safe so embedders can hand the service an `Arc<dyn RecipeCorpus>`
/// backed by whatever storage they use.
#[async_trait]
pub trait RecipeCorpus: Send + Sync {
    /// List recipes matching the filter, in stable (id) order.
    async fn list(&self, filter: &RecipeFilter) -> Vec<Recipe>;

    /// Fetch a single recipe by id.
    async fn get(&self, id: RecipeId) -> Option<Recipe>;
}

// Compile-time assertion: RecipeCorpus must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn RecipeCorpus) {}
};

/// Reference corpus held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryCorpus {
    by_id: HashMap<RecipeId, Recipe>,
}

impl InMemoryCorpus {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self {
            by_id: recipes.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[async_trait]
impl RecipeCorpus for InMemoryCorpus {
    async fn list(&self, filter: &RecipeFilter) -> Vec<Recipe> {
        let mut matched: Vec<Recipe> = self
            .by_id
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.id);
        matched
    }

    async fn get(&self, id: RecipeId) -> Option<Recipe> {
        self.by_id.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(title: &str, tags: &[&str]) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            title: title.to_string(),
            summary: String::new(),
            servings: 2,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ingredients: vec![Ingredient {
                name: "chicken thigh".to_string(),
                quantity: Some(400.0),
                unit: Some("g".to_string()),
                category: Some("protein".to_string()),
            }],
            instructions: vec![],
            last_used: None,
        }
    }

    #[test]
    fn tag_match_is_case_insensitive() {
        let r = recipe("Teriyaki Chicken", &["Japanese", "chicken"]);
        assert!(r.has_tag("japanese"));
        assert!(r.has_tag("CHICKEN"));
        assert!(!r.has_tag("vegetarian"));
    }

    #[test]
    fn ingredient_match_is_substring() {
        let r = recipe("Teriyaki Chicken", &[]);
        assert!(r.has_ingredient("chicken"));
        assert!(r.has_ingredient("Chicken Thigh"));
        assert!(!r.has_ingredient("tofu"));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let r = recipe("Anything", &[]);
        assert!(RecipeFilter::default().matches(&r));
    }

    #[test]
    fn filter_requires_all_tags() {
        let r = recipe("Stir Fry", &["easy", "chicken"]);
        let filter = RecipeFilter {
            tags: vec!["easy".to_string(), "chicken".to_string()],
            text: None,
        };
        assert!(filter.matches(&r));

        let filter = RecipeFilter {
            tags: vec!["easy".to_string(), "fish".to_string()],
            text: None,
        };
        assert!(!filter.matches(&r));
    }

    #[test]
    fn text_filter_searches_title() {
        let r = recipe("Teriyaki Chicken", &[]);
        let filter = RecipeFilter {
            tags: vec![],
            text: Some("teriyaki".to_string()),
        };
        assert!(filter.matches(&r));

        let filter = RecipeFilter {
            tags: vec![],
            text: Some("curry".to_string()),
        };
        assert!(!filter.matches(&r));
    }

    #[tokio::test]
    async fn in_memory_corpus_lists_in_id_order() {
        let a = recipe("A", &[]);
        let b = recipe("B", &[]);
        let corpus = InMemoryCorpus::new(vec![a.clone(), b.clone()]);

        let listed = corpus.list(&RecipeFilter::default()).await;
        assert_eq!(listed.len(), 2);
        assert!(listed[0].id < listed[1].id);
    }

    #[tokio::test]
    async fn in_memory_corpus_get() {
        let r = recipe("A", &[]);
        let id = r.id;
        let corpus = InMemoryCorpus::new(vec![r]);

        assert_eq!(corpus.get(id).await.unwrap().title, "A");
        assert!(corpus.get(Uuid::new_v4()).await.is_none());
    }
}
