//! Candidate generation: weighted sampling of weekly plans.
//!
//! Produces N structurally distinct day-by-day plan candidates from the
//! eligible recipe pool. Sampling is deterministic: the RNG is seeded from
//! the request and history snapshot, so identical inputs reproduce
//! identical batches. The N drafts run as independent tasks over immutable
//! snapshots; cross-candidate deduplication happens serially afterwards.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlanError;
use crate::history::SelectionRecord;
use crate::preference::{PreferenceModel, Preferences};
use crate::recipe::{Recipe, RecipeId};

/// Upper bound on plan length.
pub const MAX_DAYS: u8 = 14;
/// Upper bound on candidates per batch.
pub const MAX_OPTIONS: u8 = 5;
/// Resampling attempts per candidate before diversity is relaxed.
pub const MAX_RESAMPLE_ATTEMPTS: u32 = 50;

/// One plan-generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub user_id: String,
    /// Day count D, 1..=14.
    pub days: u8,
    /// Servings per dinner, >= 1.
    pub servings: u32,
    /// Candidate count N, 1..=5.
    pub options: u8,
    #[serde(default)]
    pub preferences: Preferences,
}

/// Generator tuning knobs.
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Override the derived base seed (tests use this for fixed batches).
    pub seed: Option<u64>,
}

/// One day of a candidate plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAssignment {
    /// Day index, 1..=D.
    pub day: u8,
    pub recipe_id: RecipeId,
    pub recipe_title: String,
}

/// Structured rationale inputs, computed at generation time and rendered
/// into text by the ranker/explainer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RationaleSignals {
    /// Most common tags across the candidate's recipes, most frequent first.
    pub emphasized_tags: Vec<String>,
    pub distinct_recipes: usize,
    /// Day slots filled by a repeated recipe.
    pub repeat_count: usize,
    /// Recipes in the candidate never seen in the user's selection history.
    pub never_tried: usize,
    /// The user's free-text wishes, echoed for the summarizer.
    #[serde(default)]
    pub requested: Option<String>,
}

/// One complete plan proposal within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCandidate {
    /// Ephemeral id, scoped to the batch.
    pub id: Uuid,
    pub days: Vec<DayAssignment>,
    pub signals: RationaleSignals,
    /// Finalized by the ranker; empty until then.
    pub rationale: String,
    /// Assigned by the ranker; 0 until then.
    pub score: f64,
    /// Position in generation order, the deterministic ranking tie-breaker.
    pub generation_order: usize,
}

impl PlanCandidate {
    /// The candidate as a day-ordered recipe-id sequence.
    pub fn recipe_sequence(&self) -> Vec<RecipeId> {
        self.days.iter().map(|d| d.recipe_id).collect()
    }
}

/// The set of candidates produced for one request. Ephemeral: only the
/// eventual [`SelectionRecord`] is durable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationBatch {
    pub id: Uuid,
    pub request: PlanRequest,
    pub created_at: DateTime<Utc>,
    pub candidates: Vec<PlanCandidate>,
}

// ---------------------------------------------------------------------------
// Validation and filtering
// ---------------------------------------------------------------------------

/// Check request bounds, naming the violated constraint.
pub fn validate_request(request: &PlanRequest) -> Result<(), PlanError> {
    if request.days == 0 || request.days > MAX_DAYS {
        return Err(PlanError::InvalidParameter {
            name: "days",
            message: format!("must be between 1 and {MAX_DAYS}, got {}", request.days),
        });
    }
    if request.servings == 0 {
        return Err(PlanError::InvalidParameter {
            name: "servings",
            message: "must be at least 1, got 0".to_string(),
        });
    }
    if request.options == 0 || request.options > MAX_OPTIONS {
        return Err(PlanError::InvalidParameter {
            name: "options",
            message: format!("must be between 1 and {MAX_OPTIONS}, got {}", request.options),
        });
    }
    Ok(())
}

/// Apply hard preference filters, returning the eligible pool in stable
/// (recipe id) order.
pub fn eligible_pool(recipes: &[Recipe], prefs: &Preferences) -> Vec<Recipe> {
    let mut pool: Vec<Recipe> = recipes
        .iter()
        .filter(|r| !prefs.excluded_tags.iter().any(|t| r.has_tag(t)))
        .filter(|r| {
            !prefs
                .excluded_ingredients
                .iter()
                .any(|i| r.has_ingredient(i))
        })
        .cloned()
        .collect();
    pool.sort_by_key(|r| r.id);
    pool
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// How many previously placed days to exclude from the next draw when the
/// pool is too small to avoid repeats entirely.
fn spread_window(pool_len: usize) -> usize {
    2.min(pool_len.saturating_sub(1))
}

/// Derive the base RNG seed from the request and the history snapshot size.
fn derive_seed(request: &PlanRequest, history_len: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.user_id.hash(&mut hasher);
    request.days.hash(&mut hasher);
    request.servings.hash(&mut hasher);
    request.options.hash(&mut hasher);
    request.preferences.free_text.hash(&mut hasher);
    request.preferences.excluded_tags.hash(&mut hasher);
    request.preferences.excluded_ingredients.hash(&mut hasher);
    request.preferences.favored_tags.hash(&mut hasher);
    request.preferences.disfavored_tags.hash(&mut hasher);
    history_len.hash(&mut hasher);
    hasher.finish()
}

/// Mix the base seed with per-candidate and per-attempt counters.
fn mix_seed(base: u64, candidate: u64, attempt: u64) -> u64 {
    base ^ candidate.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ attempt.wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

/// Draw one recipe index with weight `exp(bias)`, skipping banned indices.
///
/// Falls back to a uniform draw over the allowed indices when every weight
/// underflows (e.g. all remaining recipes carry a near-exclusion bias).
fn weighted_draw(
    pool: &[Recipe],
    model: &PreferenceModel,
    banned: &[usize],
    rng: &mut StdRng,
) -> usize {
    let weights: Vec<f64> = pool
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if banned.contains(&i) {
                0.0
            } else {
                model.score_bias(r).exp()
            }
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if total.is_finite() && total > 0.0 {
        let mut x = rng.random_range(0.0..total);
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            if x < w {
                return i;
            }
            x -= w;
        }
    }

    // Uniform fallback over allowed indices (also absorbs float drift).
    let allowed: Vec<usize> = (0..pool.len()).filter(|i| !banned.contains(i)).collect();
    allowed[rng.random_range(0..allowed.len())]
}

/// Draft one candidate: weighted sampling per day with the spread invariant
/// enforced by banning recently placed recipes from the draw.
fn draft_candidate(
    pool: &[Recipe],
    model: &PreferenceModel,
    days: u8,
    seed: u64,
    generation_order: usize,
    free_text: Option<&str>,
) -> PlanCandidate {
    let mut rng = StdRng::seed_from_u64(seed);
    // With enough recipes, sample without replacement; under starvation,
    // only the spread window is off-limits.
    let without_replacement = pool.len() >= days as usize;
    let window = spread_window(pool.len());

    let mut placed: Vec<usize> = Vec::with_capacity(days as usize);
    let mut assignments = Vec::with_capacity(days as usize);

    for day in 1..=days {
        let banned: Vec<usize> = if without_replacement {
            placed.clone()
        } else {
            placed[placed.len().saturating_sub(window)..].to_vec()
        };
        let idx = weighted_draw(pool, model, &banned, &mut rng);
        placed.push(idx);
        assignments.push(DayAssignment {
            day,
            recipe_id: pool[idx].id,
            recipe_title: pool[idx].title.clone(),
        });
    }

    let signals = build_signals(pool, &placed, model, free_text);

    PlanCandidate {
        id: Uuid::new_v4(),
        days: assignments,
        signals,
        rationale: String::new(),
        score: 0.0,
        generation_order,
    }
}

/// Compute the rationale skeleton: emphasized tags, variety, repeats.
fn build_signals(
    pool: &[Recipe],
    placed: &[usize],
    model: &PreferenceModel,
    free_text: Option<&str>,
) -> RationaleSignals {
    let mut tag_counts: HashMap<String, usize> = HashMap::new();
    for &idx in placed {
        for tag in &pool[idx].tags {
            *tag_counts.entry(tag.to_lowercase()).or_insert(0) += 1;
        }
    }
    let mut tags: Vec<(String, usize)> = tag_counts.into_iter().collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let emphasized_tags: Vec<String> = tags.into_iter().take(3).map(|(t, _)| t).collect();

    let mut distinct: Vec<usize> = placed.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    let never_tried = distinct
        .iter()
        .filter(|&&idx| !model.was_selected(pool[idx].id))
        .count();

    RationaleSignals {
        emphasized_tags,
        distinct_recipes: distinct.len(),
        repeat_count: placed.len() - distinct.len(),
        never_tried,
        requested: free_text.map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Batch generation
// ---------------------------------------------------------------------------

/// Generate a batch of N candidates for the request.
///
/// Drafts the N candidates concurrently over shared immutable snapshots,
/// then deduplicates whole sequences serially, resampling duplicates up to
/// [`MAX_RESAMPLE_ATTEMPTS`] times. If a candidate still duplicates an
/// accepted one after that, diversity is relaxed with a warning rather
/// than failing the batch.
///
/// Returns the batch plus the preference model built from the snapshot so
/// the ranker can reuse it.
pub async fn generate(
    recipes: &[Recipe],
    history: &[SelectionRecord],
    request: PlanRequest,
    config: &GeneratorConfig,
    now: DateTime<Utc>,
) -> Result<(GenerationBatch, Arc<PreferenceModel>), PlanError> {
    validate_request(&request)?;

    if recipes.is_empty() {
        return Err(PlanError::EmptyCorpus);
    }

    let pool = eligible_pool(recipes, &request.preferences);
    let required = if request.days == 1 { 1 } else { 2 };
    if pool.len() < required {
        return Err(PlanError::InsufficientRecipes {
            required,
            available: pool.len(),
        });
    }

    let model = Arc::new(PreferenceModel::from_snapshot(
        history,
        recipes,
        &request.preferences,
        now,
    ));
    let pool = Arc::new(pool);
    let base_seed = config.seed.unwrap_or_else(|| derive_seed(&request, history.len()));
    let days = request.days;
    let free_text = request.preferences.free_text.clone();

    // Draft all candidates concurrently; each task reads only immutable
    // snapshots and returns an independent candidate.
    let mut handles = Vec::with_capacity(request.options as usize);
    for idx in 0..request.options as usize {
        let pool = Arc::clone(&pool);
        let model = Arc::clone(&model);
        let free_text = free_text.clone();
        let seed = mix_seed(base_seed, idx as u64, 0);
        handles.push(tokio::spawn(async move {
            draft_candidate(&pool, &model, days, seed, idx, free_text.as_deref())
        }));
    }

    let joined = futures::future::join_all(handles).await;
    let mut drafts = Vec::with_capacity(joined.len());
    for (idx, result) in joined.into_iter().enumerate() {
        match result {
            Ok(candidate) => drafts.push(candidate),
            Err(e) => {
                // A panicked draft task must not sink the batch; redraft
                // inline with the same seed.
                tracing::error!(candidate = idx, error = %e, "draft task failed, redrafting inline");
                drafts.push(draft_candidate(
                    &pool,
                    &model,
                    days,
                    mix_seed(base_seed, idx as u64, 0),
                    idx,
                    free_text.as_deref(),
                ));
            }
        }
    }

    // Serial deduplication pass: no two accepted candidates may share a
    // full day-sequence.
    let mut accepted: Vec<PlanCandidate> = Vec::with_capacity(drafts.len());
    for (idx, mut candidate) in drafts.into_iter().enumerate() {
        let mut attempt: u32 = 0;
        while accepted
            .iter()
            .any(|a| a.recipe_sequence() == candidate.recipe_sequence())
            && attempt < MAX_RESAMPLE_ATTEMPTS
        {
            attempt += 1;
            candidate = draft_candidate(
                &pool,
                &model,
                days,
                mix_seed(base_seed, idx as u64, u64::from(attempt)),
                idx,
                free_text.as_deref(),
            );
        }

        if accepted
            .iter()
            .any(|a| a.recipe_sequence() == candidate.recipe_sequence())
        {
            tracing::warn!(
                candidate = idx,
                attempts = attempt,
                "diversity relaxed: candidate duplicates an earlier sequence"
            );
        }
        accepted.push(candidate);
    }

    let batch = GenerationBatch {
        id: Uuid::new_v4(),
        request,
        created_at: now,
        candidates: accepted,
    };
    Ok((batch, model))
}
