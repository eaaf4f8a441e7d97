//! Append-only selection history and its storage seam.
//!
//! The history records which plan a user picked out of each generation
//! batch. Records are never mutated or deleted by the core; the preference
//! model reads a consistent snapshot taken at batch-generation start.
//! Implementations must serialize writes per user so a reader never
//! observes a half-written log.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::recipe::RecipeId;

/// One durable selection: the chosen candidate of one generation batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub user_id: String,
    pub batch_id: Uuid,
    /// Day-ordered recipe sequence of the chosen candidate.
    pub recipe_ids: Vec<RecipeId>,
    pub selected_at: DateTime<Utc>,
    /// Optional explicit feedback the user attached to the choice.
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Errors from history storage implementations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A concurrent write for the same user was detected. The service
    /// retries once with a fresh snapshot before surfacing this.
    #[error("concurrent history write detected for user {user_id:?}")]
    WriteConflict { user_id: String },

    /// The underlying store failed to read or persist a record.
    #[error("history storage error: {0}")]
    Storage(String),
}

/// Append-only per-user selection log.
#[async_trait]
pub trait SelectionHistory: Send + Sync {
    /// Return up to `window` most recent records for the user, newest first.
    async fn recent(
        &self,
        user_id: &str,
        window: usize,
    ) -> Result<Vec<SelectionRecord>, HistoryError>;

    /// Durably append one record. Writes for the same user must be
    /// serialized; implementations may reject interleaved writers with
    /// [`HistoryError::WriteConflict`].
    async fn append(&self, record: SelectionRecord) -> Result<(), HistoryError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn SelectionHistory) {}
};

/// Reference history kept in memory. The single mutex serializes writes
/// across all users, which trivially satisfies the per-user requirement.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    by_user: Mutex<HashMap<String, Vec<SelectionRecord>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SelectionHistory for InMemoryHistory {
    async fn recent(
        &self,
        user_id: &str,
        window: usize,
    ) -> Result<Vec<SelectionRecord>, HistoryError> {
        let by_user = self.by_user.lock().await;
        let records = by_user.get(user_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(records.iter().rev().take(window).cloned().collect())
    }

    async fn append(&self, record: SelectionRecord) -> Result<(), HistoryError> {
        let mut by_user = self.by_user.lock().await;
        by_user
            .entry(record.user_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }
}
