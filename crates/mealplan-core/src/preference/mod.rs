//! Preference model: a pure scoring function over a history snapshot.
//!
//! The model is built once per generation request from an immutable
//! snapshot of the selection history plus the request's explicit
//! preferences. It holds no hidden mutable state; identical inputs
//! always produce identical biases.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::SelectionRecord;
use crate::recipe::{Recipe, RecipeId};

/// Scoring constants. Tunable, but the monotonicity properties must hold:
/// more recent selection => lower bias; never-selected => non-negative bias.
pub mod weights {
    /// Magnitude of the recency penalty for a just-selected recipe.
    pub const REPEAT_PENALTY: f64 = 1.0;
    /// Half-life of the recency decay, in days.
    pub const RECENCY_HALF_LIFE_DAYS: f64 = 7.0;
    /// Small positive bias for recipes never selected (exploration).
    pub const EXPLORATION_BONUS: f64 = 0.1;
    /// Scale of the tag-affinity reward, applied as `w * ln(1 + n)`.
    pub const AFFINITY_WEIGHT: f64 = 0.25;
    /// Boost per explicitly favored tag on a recipe.
    pub const FAVORED_TAG_BOOST: f64 = 0.5;
    /// Near-exclusion weight for explicitly disfavored tags. Large enough
    /// that `exp(bias)` underflows to a negligible sampling weight.
    pub const SOFT_EXCLUSION_WEIGHT: f64 = -100.0;
}

/// Explicit user preferences for one generation request.
///
/// `excluded_*` are hard filters (the generator removes those recipes from
/// the eligible pool entirely); `disfavored_tags` are soft near-exclusions
/// handled here in scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Free-text wishes, carried into rationale signals verbatim.
    #[serde(default)]
    pub free_text: Option<String>,
    /// Recipes carrying any of these tags are filtered out (hard).
    #[serde(default)]
    pub excluded_tags: Vec<String>,
    /// Recipes containing any of these ingredients are filtered out (hard).
    #[serde(default)]
    pub excluded_ingredients: Vec<String>,
    /// Tags to favor in scoring.
    #[serde(default)]
    pub favored_tags: Vec<String>,
    /// Tags to avoid in scoring (near-exclusion, not a hard filter).
    #[serde(default)]
    pub disfavored_tags: Vec<String>,
}

/// Per-recipe scoring bias derived from (history snapshot, preferences).
#[derive(Debug, Clone)]
pub struct PreferenceModel {
    /// Accumulated negative recency bias per recently selected recipe.
    recency: HashMap<RecipeId, f64>,
    /// Times each (lowercased) tag occurred in selected plans.
    tag_counts: HashMap<String, u32>,
    /// Every recipe that appears anywhere in the snapshot.
    selected: HashSet<RecipeId>,
    favored: HashSet<String>,
    disfavored: HashSet<String>,
    /// True when the snapshot had no records: all history-derived terms
    /// are zero so first-run sampling is uniform.
    empty_snapshot: bool,
}

impl PreferenceModel {
    /// Build the model from an immutable history snapshot.
    ///
    /// `recipes` is the corpus view used to resolve selected recipe ids to
    /// their tags; ids no longer present in the corpus contribute recency
    /// but no tag affinity.
    pub fn from_snapshot(
        records: &[SelectionRecord],
        recipes: &[Recipe],
        prefs: &Preferences,
        now: DateTime<Utc>,
    ) -> Self {
        let tags_by_recipe: HashMap<RecipeId, &Recipe> =
            recipes.iter().map(|r| (r.id, r)).collect();

        let mut recency: HashMap<RecipeId, f64> = HashMap::new();
        let mut tag_counts: HashMap<String, u32> = HashMap::new();
        let mut selected: HashSet<RecipeId> = HashSet::new();

        for record in records {
            let age_days = (now - record.selected_at).num_seconds().max(0) as f64 / 86_400.0;
            let decay = 0.5_f64.powf(age_days / weights::RECENCY_HALF_LIFE_DAYS);

            for &id in &record.recipe_ids {
                *recency.entry(id).or_insert(0.0) -= weights::REPEAT_PENALTY * decay;
                selected.insert(id);

                if let Some(recipe) = tags_by_recipe.get(&id) {
                    for tag in &recipe.tags {
                        *tag_counts.entry(tag.to_lowercase()).or_insert(0) += 1;
                    }
                }
            }
        }

        Self {
            recency,
            tag_counts,
            selected,
            favored: prefs.favored_tags.iter().map(|t| t.to_lowercase()).collect(),
            disfavored: prefs
                .disfavored_tags
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            empty_snapshot: records.is_empty(),
        }
    }

    /// Signed scalar bias for a recipe. Zero for every recipe when both the
    /// snapshot and the explicit preferences are empty (uniform prior).
    pub fn score_bias(&self, recipe: &Recipe) -> f64 {
        let mut bias = 0.0;

        if !self.empty_snapshot {
            match self.recency.get(&recipe.id) {
                Some(penalty) => bias += penalty,
                None => {
                    if !self.selected.contains(&recipe.id) {
                        bias += weights::EXPLORATION_BONUS;
                    }
                }
            }
        }

        for tag in &recipe.tags {
            let tag = tag.to_lowercase();
            if self.disfavored.contains(&tag) {
                bias += weights::SOFT_EXCLUSION_WEIGHT;
            }
            if self.favored.contains(&tag) {
                bias += weights::FAVORED_TAG_BOOST;
            }
            if !self.empty_snapshot {
                if let Some(&n) = self.tag_counts.get(&tag) {
                    bias += weights::AFFINITY_WEIGHT * (1.0 + f64::from(n)).ln();
                }
            }
        }

        bias
    }

    /// Penalty for placing a recipe given the recipes already occupying a
    /// recent window (e.g. the preceding days of the same candidate).
    pub fn diversity_penalty(&self, recipe: &Recipe, recent_window: &[RecipeId]) -> f64 {
        let occurrences = recent_window.iter().filter(|&&id| id == recipe.id).count();
        weights::REPEAT_PENALTY * occurrences as f64
    }

    /// Whether the recipe has ever appeared in a selected plan.
    pub fn was_selected(&self, id: RecipeId) -> bool {
        self.selected.contains(&id)
    }

    /// Number of records the snapshot contained. Feeds the deterministic
    /// generation seed so new selections change future batches.
    pub fn snapshot_is_empty(&self) -> bool {
        self.empty_snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn recipe(tags: &[&str]) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            title: "Test".to_string(),
            summary: String::new(),
            servings: 2,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ingredients: vec![],
            instructions: vec![],
            last_used: None,
        }
    }

    fn selection(recipe_ids: Vec<RecipeId>, days_ago: i64) -> SelectionRecord {
        SelectionRecord {
            user_id: "u".to_string(),
            batch_id: Uuid::new_v4(),
            recipe_ids,
            selected_at: Utc::now() - chrono::Duration::days(days_ago),
            feedback: None,
        }
    }

    #[test]
    fn empty_history_and_prefs_yield_zero_bias() {
        let recipes = vec![recipe(&["chicken"]), recipe(&["tofu", "easy"])];
        let model =
            PreferenceModel::from_snapshot(&[], &recipes, &Preferences::default(), Utc::now());

        for r in &recipes {
            assert_eq!(model.score_bias(r), 0.0);
        }
    }

    #[test]
    fn recent_selection_lowers_bias_below_empty_history() {
        let r7 = recipe(&["chicken"]);
        let recipes = vec![r7.clone()];
        let now = Utc::now();

        let records = vec![
            selection(vec![r7.id], 2),
            selection(vec![r7.id], 5),
        ];

        let empty = PreferenceModel::from_snapshot(&[], &recipes, &Preferences::default(), now);
        let with_history =
            PreferenceModel::from_snapshot(&records, &recipes, &Preferences::default(), now);

        assert!(with_history.score_bias(&r7) < empty.score_bias(&r7));
    }

    #[test]
    fn more_recent_selection_means_lower_bias() {
        let r = recipe(&[]);
        let recipes = vec![r.clone()];
        let now = Utc::now();

        let recent =
            PreferenceModel::from_snapshot(&[selection(vec![r.id], 1)], &recipes, &Preferences::default(), now);
        let stale =
            PreferenceModel::from_snapshot(&[selection(vec![r.id], 30)], &recipes, &Preferences::default(), now);

        assert!(recent.score_bias(&r) < stale.score_bias(&r));
    }

    #[test]
    fn never_selected_gets_exploration_bonus_when_history_nonempty() {
        let chosen = recipe(&[]);
        let untried = recipe(&[]);
        let recipes = vec![chosen.clone(), untried.clone()];

        let model = PreferenceModel::from_snapshot(
            &[selection(vec![chosen.id], 3)],
            &recipes,
            &Preferences::default(),
            Utc::now(),
        );

        let bias = model.score_bias(&untried);
        assert!(bias > 0.0);
        assert_eq!(bias, weights::EXPLORATION_BONUS);
    }

    #[test]
    fn selected_tags_accumulate_affinity() {
        let chosen = recipe(&["japanese"]);
        let similar = recipe(&["japanese"]);
        let other = recipe(&["italian"]);
        let recipes = vec![chosen.clone(), similar.clone(), other.clone()];

        let model = PreferenceModel::from_snapshot(
            &[selection(vec![chosen.id], 20)],
            &recipes,
            &Preferences::default(),
            Utc::now(),
        );

        // `similar` shares the selected tag but was never itself selected.
        assert!(model.score_bias(&similar) > model.score_bias(&other));
    }

    #[test]
    fn disfavored_tag_is_near_exclusion() {
        let fried = recipe(&["fried"]);
        let prefs = Preferences {
            disfavored_tags: vec!["fried".to_string()],
            ..Preferences::default()
        };
        let model = PreferenceModel::from_snapshot(&[], &[fried.clone()], &prefs, Utc::now());

        assert!(model.score_bias(&fried) <= weights::SOFT_EXCLUSION_WEIGHT);
        // Near-exclusion: the sampling weight collapses but stays finite.
        assert!(model.score_bias(&fried).exp() >= 0.0);
    }

    #[test]
    fn favored_tag_raises_bias() {
        let tofu = recipe(&["tofu"]);
        let prefs = Preferences {
            favored_tags: vec!["Tofu".to_string()],
            ..Preferences::default()
        };
        let model = PreferenceModel::from_snapshot(&[], &[tofu.clone()], &prefs, Utc::now());
        assert_eq!(model.score_bias(&tofu), weights::FAVORED_TAG_BOOST);
    }

    #[test]
    fn diversity_penalty_counts_window_occurrences() {
        let r = recipe(&[]);
        let model =
            PreferenceModel::from_snapshot(&[], &[r.clone()], &Preferences::default(), Utc::now());

        assert_eq!(model.diversity_penalty(&r, &[]), 0.0);
        assert_eq!(
            model.diversity_penalty(&r, &[r.id, Uuid::new_v4(), r.id]),
            2.0 * weights::REPEAT_PENALTY
        );
    }
}
