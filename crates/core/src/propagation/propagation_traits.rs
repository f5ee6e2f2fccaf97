use async_trait::async_trait;

use super::propagation_model::{DailyMetricPush, PropagationEvent};
use crate::errors::Result;

/// Delivers a metric push to the time-series authority.
#[async_trait]
pub trait DailyMetricsPropagator: Send + Sync {
    async fn push_daily(&self, payload: &DailyMetricPush) -> Result<()>;
}

/// Durable queue of pending pushes.
#[async_trait]
pub trait PropagationOutboxTrait: Send + Sync {
    async fn enqueue(&self, payload: DailyMetricPush) -> Result<String>;
    /// Pending events whose retry time has passed, oldest first.
    fn list_pending(&self, limit: i64) -> Result<Vec<PropagationEvent>>;
    async fn mark_sent(&self, event_ids: Vec<String>) -> Result<()>;
    async fn schedule_retry(
        &self,
        event_ids: Vec<String>,
        backoff_seconds: i64,
        last_error: Option<String>,
    ) -> Result<()>;
    async fn mark_dead(&self, event_ids: Vec<String>, last_error: Option<String>) -> Result<()>;
}
