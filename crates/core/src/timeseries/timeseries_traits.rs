use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::timeseries_model::{
    DailyKey, DailyRecord, DailyRecordPatch, NewPredictionEntry, NewSleepSession,
    PredictionHistoryEntry, PredictionPeriod, SleepSession,
};
use crate::errors::Result;
use crate::reconcile::UpsertOutcome;

/// Storage contract for the time-series authority.
#[async_trait]
pub trait TimeSeriesRepositoryTrait: Send + Sync {
    fn get_daily(&self, key: &DailyKey) -> Result<Option<DailyRecord>>;

    /// Daily rows with `from <= date <= to`, oldest first.
    fn list_daily_between(
        &self,
        email: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRecord>>;

    async fn upsert_daily(&self, key: DailyKey, patch: DailyRecordPatch) -> Result<UpsertOutcome>;

    /// Most recent first.
    fn list_sleep_sessions(&self, email: &str) -> Result<Vec<SleepSession>>;

    /// Sessions with `from <= sleep_time < to`, most recent first.
    fn list_sleep_sessions_between(
        &self,
        email: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<SleepSession>>;

    fn latest_sleep_session(&self, email: &str) -> Result<Option<SleepSession>>;

    /// Keyed by `(email, sleep_date)`.
    async fn upsert_sleep_session(&self, session: NewSleepSession) -> Result<UpsertOutcome>;

    async fn append_prediction(
        &self,
        period: PredictionPeriod,
        entry: NewPredictionEntry,
    ) -> Result<PredictionHistoryEntry>;

    fn list_predictions(
        &self,
        period: PredictionPeriod,
        email: &str,
    ) -> Result<Vec<PredictionHistoryEntry>>;
}
