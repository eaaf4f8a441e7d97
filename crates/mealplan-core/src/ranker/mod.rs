//! Ranking and explanation of generated candidates.
//!
//! Scores every candidate against the preference model, orders the batch
//! (total order: score descending, generation order breaking ties), and
//! finalizes each candidate's rationale text. Candidates are decorated in
//! place; their day assignments are never mutated.

use std::collections::HashMap;
use std::time::Duration;

use crate::external::{self, TextSummarizer};
use crate::generator::{GenerationBatch, PlanCandidate, RationaleSignals};
use crate::preference::PreferenceModel;
use crate::recipe::{Recipe, RecipeId};

/// Penalty per extra day sharing a tag within one candidate (structural
/// balance: discourages e.g. five "fried" dinners in a week).
pub const BALANCE_PENALTY: f64 = 0.3;

/// How many preceding days count as the repeat window when scoring
/// within-candidate diversity.
const DIVERSITY_WINDOW: usize = 2;

/// Score one candidate: summed day biases minus diversity and balance
/// penalties.
pub fn score_candidate(
    candidate: &PlanCandidate,
    model: &PreferenceModel,
    recipes_by_id: &HashMap<RecipeId, &Recipe>,
) -> f64 {
    let sequence = candidate.recipe_sequence();
    let mut score = 0.0;
    let mut tag_days: HashMap<String, usize> = HashMap::new();

    for (i, id) in sequence.iter().enumerate() {
        let Some(recipe) = recipes_by_id.get(id) else {
            continue;
        };
        score += model.score_bias(recipe);

        let window_start = i.saturating_sub(DIVERSITY_WINDOW);
        score -= model.diversity_penalty(recipe, &sequence[window_start..i]);

        for tag in &recipe.tags {
            *tag_days.entry(tag.to_lowercase()).or_insert(0) += 1;
        }
    }

    for count in tag_days.values() {
        if *count > 1 {
            score -= BALANCE_PENALTY * (*count - 1) as f64;
        }
    }

    score
}

/// Build the deterministic rationale from structured signals alone. Used
/// whenever the external summarizer is absent, fails, or times out.
pub fn fallback_rationale(signals: &RationaleSignals) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !signals.emphasized_tags.is_empty() {
        parts.push(format!("leans {}", signals.emphasized_tags.join(", ")));
    }

    let days = signals.distinct_recipes + signals.repeat_count;
    parts.push(format!(
        "{} distinct recipes over {} days",
        signals.distinct_recipes, days
    ));

    if signals.repeat_count > 0 {
        parts.push(format!(
            "{} repeated slot{}, spread apart",
            signals.repeat_count,
            if signals.repeat_count == 1 { "" } else { "s" }
        ));
    }

    if signals.never_tried > 0 {
        parts.push(format!("{} you have not picked before", signals.never_tried));
    }

    if let Some(requested) = &signals.requested {
        parts.push(format!("honors \"{requested}\""));
    }

    let mut text = parts.join("; ");
    if let Some(first) = text.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    text.push('.');
    text
}

/// Score, order, and explain the batch in place.
///
/// Ordering is a total order: score descending via `total_cmp`, ties kept
/// in generation order (first-generated wins), so output is deterministic
/// for identical inputs. Summarizer failures degrade to the templated
/// rationale and never fail the batch.
pub async fn rank(
    batch: &mut GenerationBatch,
    model: &PreferenceModel,
    recipes: &[Recipe],
    summarizer: Option<&dyn TextSummarizer>,
    timeout: Duration,
) {
    let recipes_by_id: HashMap<RecipeId, &Recipe> = recipes.iter().map(|r| (r.id, r)).collect();

    for candidate in &mut batch.candidates {
        candidate.score = score_candidate(candidate, model, &recipes_by_id);
    }

    // Stable sort: candidates arrive in generation order, so equal scores
    // keep first-generated first.
    batch
        .candidates
        .sort_by(|a, b| b.score.total_cmp(&a.score));

    for candidate in &mut batch.candidates {
        let summarized = match summarizer {
            Some(s) => {
                external::call_with_timeout("summarizer", timeout, s.summarize(&candidate.signals))
                    .await
            }
            None => None,
        };
        candidate.rationale =
            summarized.unwrap_or_else(|| fallback_rationale(&candidate.signals));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::DayAssignment;
    use crate::history::SelectionRecord;
    use crate::preference::Preferences;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    fn recipe(title: &str, tags: &[&str]) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            title: title.to_string(),
            summary: String::new(),
            servings: 2,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ingredients: vec![],
            instructions: vec![],
            last_used: None,
        }
    }

    fn candidate(recipes: &[&Recipe], order: usize) -> PlanCandidate {
        PlanCandidate {
            id: Uuid::new_v4(),
            days: recipes
                .iter()
                .enumerate()
                .map(|(i, r)| DayAssignment {
                    day: (i + 1) as u8,
                    recipe_id: r.id,
                    recipe_title: r.title.clone(),
                })
                .collect(),
            signals: RationaleSignals {
                distinct_recipes: recipes.len(),
                ..RationaleSignals::default()
            },
            rationale: String::new(),
            score: 0.0,
            generation_order: order,
        }
    }

    fn batch_of(candidates: Vec<PlanCandidate>) -> GenerationBatch {
        GenerationBatch {
            id: Uuid::new_v4(),
            request: crate::generator::PlanRequest {
                user_id: "u".to_string(),
                days: 3,
                servings: 2,
                options: candidates.len() as u8,
                preferences: Preferences::default(),
            },
            created_at: Utc::now(),
            candidates,
        }
    }

    fn empty_model(recipes: &[Recipe]) -> PreferenceModel {
        PreferenceModel::from_snapshot(&[], recipes, &Preferences::default(), Utc::now())
    }

    struct FailingSummarizer;

    #[async_trait]
    impl TextSummarizer for FailingSummarizer {
        async fn summarize(&self, _signals: &RationaleSignals) -> Result<String> {
            Err(anyhow!("model overloaded"))
        }
    }

    struct CannedSummarizer;

    #[async_trait]
    impl TextSummarizer for CannedSummarizer {
        async fn summarize(&self, _signals: &RationaleSignals) -> Result<String> {
            Ok("A lovely week of dinners.".to_string())
        }
    }

    #[test]
    fn balance_term_penalizes_tag_clustering() {
        let fried: Vec<Recipe> = (0..3).map(|i| recipe(&format!("F{i}"), &["fried"])).collect();
        let varied = vec![
            recipe("A", &["soup"]),
            recipe("B", &["grill"]),
            recipe("C", &["salad"]),
        ];
        let all: Vec<Recipe> = fried.iter().chain(varied.iter()).cloned().collect();
        let model = empty_model(&all);
        let by_id: HashMap<RecipeId, &Recipe> = all.iter().map(|r| (r.id, r)).collect();

        let clustered = candidate(&fried.iter().collect::<Vec<_>>(), 0);
        let spread = candidate(&varied.iter().collect::<Vec<_>>(), 1);

        assert!(
            score_candidate(&clustered, &model, &by_id)
                < score_candidate(&spread, &model, &by_id)
        );
    }

    #[test]
    fn repeats_in_window_are_penalized() {
        let a = recipe("A", &[]);
        let b = recipe("B", &[]);
        let c = recipe("C", &[]);
        let all = vec![a.clone(), b.clone(), c.clone()];
        let model = empty_model(&all);
        let by_id: HashMap<RecipeId, &Recipe> = all.iter().map(|r| (r.id, r)).collect();

        // A-B-A puts the second A inside the 2-day repeat window.
        let repeated = candidate(&[&a, &b, &a], 0);
        let distinct = candidate(&[&a, &b, &c], 1);

        assert!(
            score_candidate(&repeated, &model, &by_id)
                < score_candidate(&distinct, &model, &by_id)
        );
    }

    #[tokio::test]
    async fn rank_orders_by_score_descending() {
        let liked = recipe("Liked", &["japanese"]);
        let other = recipe("Other", &["italian"]);
        let all = vec![liked.clone(), other.clone()];

        // History selected `liked` long ago: its tag gains affinity.
        let records = vec![SelectionRecord {
            user_id: "u".to_string(),
            batch_id: Uuid::new_v4(),
            recipe_ids: vec![liked.id],
            selected_at: Utc::now() - chrono::Duration::days(60),
            feedback: None,
        }];
        let model =
            PreferenceModel::from_snapshot(&records, &all, &Preferences::default(), Utc::now());

        let mut batch = batch_of(vec![candidate(&[&other], 0), candidate(&[&liked], 1)]);
        rank(&mut batch, &model, &all, None, Duration::from_secs(1)).await;

        assert!(batch.candidates[0].score >= batch.candidates[1].score);
    }

    #[tokio::test]
    async fn ties_keep_generation_order() {
        let a = recipe("A", &[]);
        let b = recipe("B", &[]);
        let all = vec![a.clone(), b.clone()];
        let model = empty_model(&all);

        // Both candidates score identically under the uniform prior.
        let mut batch = batch_of(vec![candidate(&[&a], 0), candidate(&[&b], 1)]);
        rank(&mut batch, &model, &all, None, Duration::from_secs(1)).await;

        assert_eq!(batch.candidates[0].generation_order, 0);
        assert_eq!(batch.candidates[1].generation_order, 1);
    }

    #[tokio::test]
    async fn failing_summarizer_falls_back_to_template() {
        let a = recipe("A", &[]);
        let all = vec![a.clone()];
        let model = empty_model(&all);

        let mut batch = batch_of(vec![candidate(&[&a], 0)]);
        rank(
            &mut batch,
            &model,
            &all,
            Some(&FailingSummarizer),
            Duration::from_secs(1),
        )
        .await;

        let rationale = &batch.candidates[0].rationale;
        assert!(!rationale.is_empty());
        assert!(rationale.contains("distinct recipes"));
    }

    #[tokio::test]
    async fn successful_summarizer_text_is_used() {
        let a = recipe("A", &[]);
        let all = vec![a.clone()];
        let model = empty_model(&all);

        let mut batch = batch_of(vec![candidate(&[&a], 0)]);
        rank(
            &mut batch,
            &model,
            &all,
            Some(&CannedSummarizer),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(batch.candidates[0].rationale, "A lovely week of dinners.");
    }

    #[test]
    fn fallback_rationale_mentions_the_signals() {
        let signals = RationaleSignals {
            emphasized_tags: vec!["japanese".to_string(), "easy".to_string()],
            distinct_recipes: 6,
            repeat_count: 1,
            never_tried: 2,
            requested: Some("more vegetables".to_string()),
        };
        let text = fallback_rationale(&signals);
        assert!(text.contains("japanese"));
        assert!(text.contains("6 distinct recipes over 7 days"));
        assert!(text.contains("1 repeated slot"));
        assert!(text.contains("2 you have not picked before"));
        assert!(text.contains("more vegetables"));
        assert!(text.ends_with('.'));
    }
}
