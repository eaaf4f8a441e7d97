//! Capability seams for the optional "smart" enhancement services.
//!
//! Rationale text and shopping-list reordering come from external
//! collaborators (typically LLM-backed). The core treats both as pure
//! functions that may fail or time out: every call goes through
//! [`call_with_timeout`], which logs degradation and signals the caller
//! to use its deterministic fallback. Correctness never depends on these
//! services being available.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::generator::RationaleSignals;
use crate::shopping::ShoppingList;

/// Renders structured rationale signals into natural-language text.
#[async_trait]
pub trait TextSummarizer: Send + Sync {
    async fn summarize(&self, signals: &RationaleSignals) -> Result<String>;
}

/// Reorders a shopping list into a "practical" store-walk order.
#[async_trait]
pub trait ShoppingOptimizer: Send + Sync {
    async fn reorder(&self, list: &ShoppingList) -> Result<ShoppingList>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn TextSummarizer, _: &dyn ShoppingOptimizer) {}
};

/// Run an external call under a timeout.
///
/// Returns `None` on error or timeout, after logging a non-fatal
/// degradation warning; the caller then takes its fallback path.
/// Cancelling the call here never affects sibling work: the future is
/// simply dropped.
pub(crate) async fn call_with_timeout<T, F>(service: &'static str, limit: Duration, fut: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(service, error = %e, "external service degraded, using fallback");
            None
        }
        Err(_) => {
            tracing::warn!(
                service,
                timeout_ms = limit.as_millis() as u64,
                "external service timed out, using fallback"
            );
            None
        }
    }
}
