//! Service layer: composes the corpus, history, generator, ranker, and
//! consolidator behind the three operations the presentation layer calls.
//!
//! Holds the in-memory registry of live generation batches. A batch lives
//! from `generate_plans` until a selection consumes it (or the embedder
//! drops the service); the selection record is the only durable artifact.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::PlanError;
use crate::external::{self, ShoppingOptimizer, TextSummarizer};
use crate::generator::{self, GenerationBatch, GeneratorConfig, PlanRequest};
use crate::history::{HistoryError, SelectionHistory, SelectionRecord};
use crate::ranker;
use crate::recipe::{Recipe, RecipeCorpus, RecipeFilter, RecipeId};
use crate::shopping::{self, ShoppingList, synonyms::SynonymTable};

/// Service tuning knobs.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Wall-time limit for each external (summarizer/optimizer) call.
    pub external_timeout: Duration,
    /// How many recent selections feed the preference snapshot.
    pub history_window: usize,
    pub generator: GeneratorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            external_timeout: Duration::from_secs(10),
            history_window: 20,
            generator: GeneratorConfig::default(),
        }
    }
}

/// The planning engine facade.
pub struct PlanService {
    corpus: Arc<dyn RecipeCorpus>,
    history: Arc<dyn SelectionHistory>,
    summarizer: Option<Arc<dyn TextSummarizer>>,
    optimizer: Option<Arc<dyn ShoppingOptimizer>>,
    synonyms: SynonymTable,
    config: ServiceConfig,
    /// Live batches by id. Entries are removed when a selection consumes
    /// them.
    batches: Mutex<HashMap<Uuid, GenerationBatch>>,
}

impl PlanService {
    pub fn new(corpus: Arc<dyn RecipeCorpus>, history: Arc<dyn SelectionHistory>) -> Self {
        Self {
            corpus,
            history,
            summarizer: None,
            optimizer: None,
            synonyms: SynonymTable::builtin(),
            config: ServiceConfig::default(),
            batches: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn TextSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_optimizer(mut self, optimizer: Arc<dyn ShoppingOptimizer>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Generate and rank a batch of plan candidates.
    ///
    /// Takes consistent snapshots of the corpus and the user's recent
    /// history at the start; no locks are held across generation.
    pub async fn generate_plans(&self, request: PlanRequest) -> Result<GenerationBatch, PlanError> {
        let recipes = self.corpus.list(&RecipeFilter::default()).await;
        let records = self
            .history
            .recent(&request.user_id, self.config.history_window)
            .await?;

        let (mut batch, model) = generator::generate(
            &recipes,
            &records,
            request,
            &self.config.generator,
            Utc::now(),
        )
        .await?;

        ranker::rank(
            &mut batch,
            &model,
            &recipes,
            self.summarizer.as_deref(),
            self.config.external_timeout,
        )
        .await;

        tracing::info!(
            batch_id = %batch.id,
            user_id = %batch.request.user_id,
            candidates = batch.candidates.len(),
            "generated plan batch"
        );

        self.batches.lock().await.insert(batch.id, batch.clone());
        Ok(batch)
    }

    /// Re-register a batch the presentation layer persisted itself (e.g.
    /// across CLI invocations). The core still never persists batches.
    pub async fn restore_batch(&self, batch: GenerationBatch) {
        self.batches.lock().await.insert(batch.id, batch);
    }

    /// Record the user's choice of one candidate and retire the batch.
    ///
    /// History write conflicts are retried once with a fresh attempt, then
    /// surfaced.
    pub async fn select_plan(
        &self,
        user_id: &str,
        batch_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<SelectionRecord, PlanError> {
        let record = {
            let batches = self.batches.lock().await;
            let batch = batches.get(&batch_id).ok_or(PlanError::UnknownBatch(batch_id))?;
            // A batch is scoped to the user who requested it.
            if batch.request.user_id != user_id {
                return Err(PlanError::UnknownBatch(batch_id));
            }
            let candidate = batch
                .candidates
                .iter()
                .find(|c| c.id == candidate_id)
                .ok_or(PlanError::UnknownCandidate(candidate_id))?;

            SelectionRecord {
                user_id: user_id.to_string(),
                batch_id,
                recipe_ids: candidate.recipe_sequence(),
                selected_at: Utc::now(),
                feedback: None,
            }
        };

        let mut result = self.history.append(record.clone()).await;
        if let Err(HistoryError::WriteConflict { .. }) = &result {
            tracing::warn!(user_id, "history write conflict, retrying with fresh attempt");
            result = self.history.append(record.clone()).await;
        }
        result?;

        // The batch is consumed; candidates are discarded.
        self.batches.lock().await.remove(&batch_id);

        tracing::info!(batch_id = %batch_id, user_id, "recorded plan selection");
        Ok(record)
    }

    /// Build a consolidated shopping list for a set of recipes.
    ///
    /// The optional external optimizer may reorder the list; any failure,
    /// timeout, or content mismatch falls back to the deterministic
    /// category-grouped ordering.
    pub async fn build_shopping_list(
        &self,
        recipe_ids: &[RecipeId],
        servings: u32,
    ) -> Result<ShoppingList, PlanError> {
        let mut recipes: Vec<Recipe> = Vec::with_capacity(recipe_ids.len());
        for &id in recipe_ids {
            match self.corpus.get(id).await {
                Some(recipe) => recipes.push(recipe),
                None => {
                    return Err(PlanError::InvalidParameter {
                        name: "recipe_ids",
                        message: format!("unknown recipe {id}"),
                    });
                }
            }
        }

        let list = shopping::consolidate(&recipes, servings, &self.synonyms)?;

        let Some(optimizer) = &self.optimizer else {
            return Ok(list);
        };

        match external::call_with_timeout(
            "shopping-optimizer",
            self.config.external_timeout,
            optimizer.reorder(&list),
        )
        .await
        {
            Some(reordered) if reordered.fingerprint() == list.fingerprint() => Ok(reordered),
            Some(_) => {
                tracing::warn!(
                    "shopping optimizer altered list contents, keeping deterministic order"
                );
                Ok(list)
            }
            None => Ok(list),
        }
    }
}
