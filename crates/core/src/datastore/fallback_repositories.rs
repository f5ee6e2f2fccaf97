use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::fallback_store::FallbackStore;
use crate::errors::Result;
use crate::profiles::{
    Account, AccountPatch, FeedbackEntry, NewAccount, NewFeedback, ProfileRepositoryTrait,
    WorkProfile, WorkProfilePatch,
};
use crate::reconcile::UpsertOutcome;
use crate::timeseries::{
    DailyKey, DailyRecord, DailyRecordPatch, NewPredictionEntry, NewSleepSession,
    PredictionHistoryEntry, PredictionPeriod, SleepSession, TimeSeriesRepositoryTrait,
};

pub type ProfileStore = FallbackStore<dyn ProfileRepositoryTrait>;
pub type TimeSeriesStore = FallbackStore<dyn TimeSeriesRepositoryTrait>;

#[async_trait]
impl ProfileRepositoryTrait for FallbackStore<dyn ProfileRepositoryTrait> {
    fn get_account(&self, email: &str) -> Result<Option<Account>> {
        self.read("get_account", |repo| repo.get_account(email))
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        self.read("list_accounts", |repo| repo.list_accounts())
    }

    fn get_work_profile(&self, email: &str) -> Result<Option<WorkProfile>> {
        self.read("get_work_profile", |repo| repo.get_work_profile(email))
    }

    fn list_feedback(&self, email: &str) -> Result<Vec<FeedbackEntry>> {
        self.read("list_feedback", |repo| repo.list_feedback(email))
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<Account> {
        self.write("create_account", |repo| {
            repo.create_account(new_account.clone())
        })
        .await
    }

    async fn upsert_account(&self, email: String, patch: AccountPatch) -> Result<UpsertOutcome> {
        self.write("upsert_account", |repo| {
            repo.upsert_account(email.clone(), patch.clone())
        })
        .await
    }

    async fn update_account(&self, email: String, patch: AccountPatch) -> Result<Account> {
        self.write("update_account", |repo| {
            repo.update_account(email.clone(), patch.clone())
        })
        .await
    }

    async fn upsert_work_profile(
        &self,
        email: String,
        patch: WorkProfilePatch,
    ) -> Result<UpsertOutcome> {
        self.write("upsert_work_profile", |repo| {
            repo.upsert_work_profile(email.clone(), patch.clone())
        })
        .await
    }

    async fn insert_feedback(&self, entry: NewFeedback) -> Result<FeedbackEntry> {
        self.write("insert_feedback", |repo| repo.insert_feedback(entry.clone()))
            .await
    }
}

#[async_trait]
impl TimeSeriesRepositoryTrait for FallbackStore<dyn TimeSeriesRepositoryTrait> {
    fn get_daily(&self, key: &DailyKey) -> Result<Option<DailyRecord>> {
        self.read("get_daily", |repo| repo.get_daily(key))
    }

    fn list_daily_between(
        &self,
        email: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRecord>> {
        self.read("list_daily_between", |repo| {
            repo.list_daily_between(email, from, to)
        })
    }

    async fn upsert_daily(&self, key: DailyKey, patch: DailyRecordPatch) -> Result<UpsertOutcome> {
        self.write("upsert_daily", |repo| {
            repo.upsert_daily(key.clone(), patch.clone())
        })
        .await
    }

    fn list_sleep_sessions(&self, email: &str) -> Result<Vec<SleepSession>> {
        self.read("list_sleep_sessions", |repo| repo.list_sleep_sessions(email))
    }

    fn list_sleep_sessions_between(
        &self,
        email: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<SleepSession>> {
        self.read("list_sleep_sessions_between", |repo| {
            repo.list_sleep_sessions_between(email, from, to)
        })
    }

    fn latest_sleep_session(&self, email: &str) -> Result<Option<SleepSession>> {
        self.read("latest_sleep_session", |repo| repo.latest_sleep_session(email))
    }

    async fn upsert_sleep_session(&self, session: NewSleepSession) -> Result<UpsertOutcome> {
        self.write("upsert_sleep_session", |repo| {
            repo.upsert_sleep_session(session.clone())
        })
        .await
    }

    async fn append_prediction(
        &self,
        period: PredictionPeriod,
        entry: NewPredictionEntry,
    ) -> Result<PredictionHistoryEntry> {
        self.write("append_prediction", |repo| {
            repo.append_prediction(period, entry.clone())
        })
        .await
    }

    fn list_predictions(
        &self,
        period: PredictionPeriod,
        email: &str,
    ) -> Result<Vec<PredictionHistoryEntry>> {
        self.read("list_predictions", |repo| repo.list_predictions(period, email))
    }
}
