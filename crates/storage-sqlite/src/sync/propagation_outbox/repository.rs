use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use diesel::prelude::*;
use diesel::SqliteConnection;
use sleepsync_core::errors::Result;
use sleepsync_core::propagation::{
    DailyMetricPush, PropagationEvent, PropagationOutboxTrait, PropagationStatus,
};
use sleepsync_core::utils::time_utils::now_naive;
use uuid::Uuid;

use super::model::PropagationOutboxDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::propagation_outbox;

/// Durable queue of cross-service pushes, kept next to the profile data it
/// was derived from.
pub struct PropagationOutboxRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PropagationOutboxRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        PropagationOutboxRepository { pool, writer }
    }

    pub fn count_by_status(&self, status: PropagationStatus) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        Ok(propagation_outbox::table
            .filter(propagation_outbox::status.eq(status.as_str()))
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?)
    }
}

#[async_trait]
impl PropagationOutboxTrait for PropagationOutboxRepository {
    async fn enqueue(&self, payload: DailyMetricPush) -> Result<String> {
        let row = PropagationOutboxDB {
            event_id: Uuid::now_v7().to_string(),
            payload: serde_json::to_string(&payload)?,
            status: PropagationStatus::Pending.as_str().to_string(),
            retry_count: 0,
            next_retry_at: None,
            last_error: None,
            created_at: now_naive(),
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<String> {
                diesel::insert_into(propagation_outbox::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(row.event_id)
            })
            .await
    }

    fn list_pending(&self, limit: i64) -> Result<Vec<PropagationEvent>> {
        let mut conn = get_connection(&self.pool)?;
        let now = now_naive();

        let rows = propagation_outbox::table
            .filter(propagation_outbox::status.eq(PropagationStatus::Pending.as_str()))
            .filter(
                propagation_outbox::next_retry_at
                    .is_null()
                    .or(propagation_outbox::next_retry_at.le(now)),
            )
            .order((
                propagation_outbox::created_at.asc(),
                propagation_outbox::event_id.asc(),
            ))
            .limit(limit)
            .select(PropagationOutboxDB::as_select())
            .load::<PropagationOutboxDB>(&mut conn)
            .map_err(StorageError::from)?;

        rows.into_iter().map(PropagationEvent::try_from).collect()
    }

    async fn mark_sent(&self, event_ids: Vec<String>) -> Result<()> {
        if event_ids.is_empty() {
            return Ok(());
        }

        self.writer
            .exec(move |conn| {
                diesel::update(
                    propagation_outbox::table
                        .filter(propagation_outbox::event_id.eq_any(event_ids)),
                )
                .set((
                    propagation_outbox::status.eq(PropagationStatus::Sent.as_str()),
                    propagation_outbox::next_retry_at.eq::<Option<chrono::NaiveDateTime>>(None),
                    propagation_outbox::last_error.eq::<Option<String>>(None),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn schedule_retry(
        &self,
        event_ids: Vec<String>,
        backoff_seconds: i64,
        last_error: Option<String>,
    ) -> Result<()> {
        if event_ids.is_empty() {
            return Ok(());
        }

        self.writer
            .exec(move |conn| {
                let retry_at = now_naive() + Duration::seconds(backoff_seconds);
                diesel::update(
                    propagation_outbox::table
                        .filter(propagation_outbox::event_id.eq_any(event_ids)),
                )
                .set((
                    propagation_outbox::retry_count.eq(propagation_outbox::retry_count + 1),
                    propagation_outbox::next_retry_at.eq(Some(retry_at)),
                    propagation_outbox::status.eq(PropagationStatus::Pending.as_str()),
                    propagation_outbox::last_error.eq(last_error),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_dead(&self, event_ids: Vec<String>, last_error: Option<String>) -> Result<()> {
        if event_ids.is_empty() {
            return Ok(());
        }

        self.writer
            .exec(move |conn| {
                diesel::update(
                    propagation_outbox::table
                        .filter(propagation_outbox::event_id.eq_any(event_ids)),
                )
                .set((
                    propagation_outbox::status.eq(PropagationStatus::Dead.as_str()),
                    propagation_outbox::next_retry_at.eq::<Option<chrono::NaiveDateTime>>(None),
                    propagation_outbox::last_error.eq(last_error),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::db::{open_store, DbOptions, SERVER_MIGRATIONS};

    fn setup_db() -> PropagationOutboxRepository {
        let dir = tempdir().expect("tempdir").keep();
        let db_path = dir.join("outbox.db").to_string_lossy().to_string();
        let (pool, writer) =
            open_store(&db_path, &DbOptions::default(), SERVER_MIGRATIONS).expect("open store");
        PropagationOutboxRepository::new(pool, writer)
    }

    fn push(steps: i32) -> DailyMetricPush {
        DailyMetricPush::daily_steps(
            "ana@example.com",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            Some(steps),
        )
    }

    #[tokio::test]
    async fn pending_events_come_back_in_creation_order() {
        let repo = setup_db();
        let first = repo.enqueue(push(1000)).await.unwrap();
        let second = repo.enqueue(push(2000)).await.unwrap();

        let pending = repo.list_pending(10).unwrap();
        let ids: Vec<_> = pending.iter().map(|e| e.event_id.clone()).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(pending[0].payload, push(1000));
        assert_eq!(pending[0].status, PropagationStatus::Pending);
    }

    #[tokio::test]
    async fn retry_hides_event_until_backoff_elapses() {
        let repo = setup_db();
        let id = repo.enqueue(push(1000)).await.unwrap();

        repo.schedule_retry(vec![id.clone()], 300, Some("timeout".into()))
            .await
            .unwrap();
        assert!(repo.list_pending(10).unwrap().is_empty());

        repo.schedule_retry(vec![id.clone()], -1, Some("timeout".into()))
            .await
            .unwrap();
        let pending = repo.list_pending(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn sent_and_dead_events_leave_the_queue() {
        let repo = setup_db();
        let sent = repo.enqueue(push(1000)).await.unwrap();
        let dead = repo.enqueue(push(2000)).await.unwrap();

        repo.mark_sent(vec![sent]).await.unwrap();
        repo.mark_dead(vec![dead], Some("400 Bad Request".into()))
            .await
            .unwrap();

        assert!(repo.list_pending(10).unwrap().is_empty());
        assert_eq!(repo.count_by_status(PropagationStatus::Sent).unwrap(), 1);
        assert_eq!(repo.count_by_status(PropagationStatus::Dead).unwrap(), 1);
    }
}
