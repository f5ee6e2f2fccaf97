use chrono::NaiveDateTime;
use diesel::prelude::*;
use sleepsync_core::errors::{DatabaseError, Error, Result};
use sleepsync_core::propagation::{PropagationEvent, PropagationStatus};

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(primary_key(event_id))]
#[diesel(table_name = crate::schema::propagation_outbox)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PropagationOutboxDB {
    pub event_id: String,
    pub payload: String,
    pub status: String,
    pub retry_count: i32,
    pub next_retry_at: Option<NaiveDateTime>,
    pub last_error: Option<String>,
    pub created_at: NaiveDateTime,
}

impl TryFrom<PropagationOutboxDB> for PropagationEvent {
    type Error = Error;

    fn try_from(row: PropagationOutboxDB) -> Result<Self> {
        let status = row
            .status
            .parse::<PropagationStatus>()
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(e)))?;
        Ok(PropagationEvent {
            event_id: row.event_id,
            payload: serde_json::from_str(&row.payload)?,
            status,
            retry_count: row.retry_count,
            next_retry_at: row.next_retry_at,
            last_error: row.last_error,
            created_at: row.created_at,
        })
    }
}
