//! File-backed storage collaborators: a JSON recipe corpus and an
//! append-only JSONL selection log.
//!
//! The engine only sees the `RecipeCorpus` and `SelectionHistory` traits;
//! the on-disk formats live entirely here. `recipes.json` is a JSON array
//! of recipe documents, `history.jsonl` is one selection record per line,
//! append-only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use mealplan_core::generator::GenerationBatch;
use mealplan_core::history::{HistoryError, SelectionHistory, SelectionRecord};
use mealplan_core::recipe::{Recipe, RecipeCorpus, RecipeFilter, RecipeId};

// -----------------------------------------------------------------------
// Recipe corpus
// -----------------------------------------------------------------------

/// Read-only corpus loaded from a `recipes.json` file at startup.
pub struct JsonCorpus {
    recipes: HashMap<RecipeId, Recipe>,
}

impl JsonCorpus {
    /// Load the corpus from a JSON array of recipes.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe file at {}", path.display()))?;
        let recipes: Vec<Recipe> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse recipe file at {}", path.display()))?;
        Ok(Self {
            recipes: recipes.into_iter().map(|r| (r.id, r)).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[async_trait]
impl RecipeCorpus for JsonCorpus {
    async fn list(&self, filter: &RecipeFilter) -> Vec<Recipe> {
        let mut matched: Vec<Recipe> = self
            .recipes
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.id);
        matched
    }

    async fn get(&self, id: RecipeId) -> Option<Recipe> {
        self.recipes.get(&id).cloned()
    }
}

/// Write an empty recipe file if none exists yet. Used by `init`.
pub fn ensure_recipe_file(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    }
    std::fs::write(path, "[]\n")
        .with_context(|| format!("failed to write recipe file at {}", path.display()))?;
    Ok(true)
}

// -----------------------------------------------------------------------
// Selection history
// -----------------------------------------------------------------------

/// Append-only JSONL selection log.
///
/// Appends are serialized through a single lock, so concurrent selections
/// for the same user cannot interleave partial lines.
pub struct JsonlHistory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistory {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<Vec<SelectionRecord>, HistoryError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HistoryError::Storage(e.to_string())),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(|e| HistoryError::Storage(e.to_string())))
            .collect()
    }
}

#[async_trait]
impl SelectionHistory for JsonlHistory {
    async fn recent(
        &self,
        user_id: &str,
        window: usize,
    ) -> Result<Vec<SelectionRecord>, HistoryError> {
        let all = self.read_all().await?;
        // File order is append order; newest last. Return newest first.
        let mut recent: Vec<SelectionRecord> = all
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        recent.reverse();
        recent.truncate(window);
        Ok(recent)
    }

    async fn append(&self, record: SelectionRecord) -> Result<(), HistoryError> {
        let mut line =
            serde_json::to_string(&record).map_err(|e| HistoryError::Storage(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| HistoryError::Storage(e.to_string()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| HistoryError::Storage(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| HistoryError::Storage(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| HistoryError::Storage(e.to_string()))?;
        tracing::debug!(user_id = %record.user_id, path = %self.path.display(), "appended selection record");
        Ok(())
    }
}

// -----------------------------------------------------------------------
// Batch stash
// -----------------------------------------------------------------------

/// Persist the most recent batch so `choose` can run in a later process.
pub fn save_batch(path: &Path, batch: &GenerationBatch) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(batch).context("failed to serialize batch")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write batch file at {}", path.display()))?;
    Ok(())
}

/// Load the stashed batch. Errors if no `plan` has run yet.
pub fn load_batch(path: &Path) -> Result<GenerationBatch> {
    let contents = std::fs::read_to_string(path).with_context(|| {
        format!(
            "no stashed plan batch at {} (run `mealplan plan` first)",
            path.display()
        )
    })?;
    let batch = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse batch file at {}", path.display()))?;
    Ok(batch)
}

/// Remove the stashed batch after a selection consumes it.
pub fn clear_batch(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
