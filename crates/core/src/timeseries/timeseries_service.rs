use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use log::{debug, info, warn};

use super::aggregation::{aggregate_labels, LabelCounts};
use super::prediction_model::{PredictionFeatures, PredictionResponse, ProfileSource, SleepClassifier};
use super::sleep_summary::{summarize_month, summarize_week, MonthlySleepSummary, WeeklySleepSummary};
use super::timeseries_model::*;
use super::timeseries_traits::TimeSeriesRepositoryTrait;
use crate::errors::{Error, Result};
use crate::reconcile::{MergePolicy, MessageResponse, UpsertOutcome};
use crate::utils::time_utils::{now_naive, parse_timestamp_or, today};

/// Time-series authority: daily records, sleep sessions and predictions.
pub struct TimeSeriesService {
    repository: Arc<dyn TimeSeriesRepositoryTrait>,
    policy: MergePolicy,
    profiles: Option<Arc<dyn ProfileSource>>,
    classifier: Option<Arc<dyn SleepClassifier>>,
}

impl TimeSeriesService {
    pub fn new(repository: Arc<dyn TimeSeriesRepositoryTrait>, policy: MergePolicy) -> Self {
        Self {
            repository,
            policy,
            profiles: None,
            classifier: None,
        }
    }

    pub fn with_profile_source(mut self, profiles: Arc<dyn ProfileSource>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn SleepClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub async fn sync_daily(&self, request: SyncDailyRequest) -> Result<MessageResponse> {
        let (key, patch) = request.to_key_and_patch(self.policy, today());
        if key.email.is_empty() {
            return Err(Error::validation("email is required"));
        }
        let outcome = self.repository.upsert_daily(key.clone(), patch).await?;
        debug!(
            "[Reconcile] Daily {} {} -> {:?}",
            key.email, key.date, outcome
        );
        Ok(MessageResponse::synced("Daily data"))
    }

    /// Upserts today's label for the account.
    pub async fn save_prediction(&self, request: SavePredictionRequest) -> Result<MessageResponse> {
        let email = request.email.trim().to_string();
        if email.is_empty() {
            return Err(Error::validation("email is required"));
        }
        let key = DailyKey {
            email,
            date: today(),
        };
        let patch = DailyRecordPatch {
            prediction_result: Some(request.prediction_result.code()),
            ..Default::default()
        };
        self.repository.upsert_daily(key, patch).await?;
        Ok(MessageResponse::new("Prediction saved"))
    }

    pub async fn save_sleep_record(&self, request: SleepRecordRequest) -> Result<MessageResponse> {
        let session = request.to_session()?;
        let outcome = self.repository.upsert_sleep_session(session).await?;
        Ok(match outcome {
            UpsertOutcome::Inserted => MessageResponse::new("Record saved"),
            _ => MessageResponse::new("Record updated"),
        })
    }

    pub async fn sync_sleep_record(&self, request: SleepRecordRequest) -> Result<MessageResponse> {
        let session = request.to_session()?;
        let email = session.email.clone();
        let date = session.sleep_date;
        let outcome = self.repository.upsert_sleep_session(session).await?;
        debug!("[Reconcile] Sleep record {} {} -> {:?}", email, date, outcome);
        Ok(MessageResponse::synced("Sleep record"))
    }

    pub async fn sync_prediction(
        &self,
        period: PredictionPeriod,
        request: SyncPredictionRequest,
    ) -> Result<MessageResponse> {
        let email = request.email.trim().to_string();
        if email.is_empty() {
            return Err(Error::validation("email is required"));
        }
        let created_at = parse_timestamp_or(request.created_at.as_deref(), now_naive());
        self.repository
            .append_prediction(
                period,
                NewPredictionEntry {
                    email,
                    prediction_result: request.prediction_result,
                    created_at,
                },
            )
            .await?;
        Ok(MessageResponse::synced(period.entity_name()))
    }

    pub fn list_predictions(
        &self,
        period: PredictionPeriod,
        email: &str,
    ) -> Result<Vec<PredictionHistoryEntry>> {
        self.repository.list_predictions(period, email)
    }

    /// One entry per night, most recent first.
    pub fn sleep_history(&self, email: &str) -> Result<Vec<SleepHistoryItem>> {
        let sessions = self.repository.list_sleep_sessions(email)?;
        let mut seen = HashSet::new();
        Ok(sessions
            .iter()
            .filter(|s| seen.insert(s.sleep_time.date()))
            .map(SleepHistoryItem::from)
            .collect())
    }

    pub fn aggregate_prediction(
        &self,
        period: PredictionPeriod,
        email: &str,
    ) -> Result<PredictionLabel> {
        self.aggregate_prediction_as_of(period, email, today())
    }

    pub fn aggregate_prediction_as_of(
        &self,
        period: PredictionPeriod,
        email: &str,
        as_of: NaiveDate,
    ) -> Result<PredictionLabel> {
        let from = as_of - Duration::days(period.window_days());
        let records = self.repository.list_daily_between(email, from, as_of)?;
        if records.is_empty() {
            return Err(Error::not_found(format!(
                "No daily records for {} in the last {} days",
                email,
                period.window_days()
            )));
        }
        let counts = LabelCounts::from_records(&records);
        let label = aggregate_labels(period, counts);
        debug!(
            "[Prediction] {:?} aggregate for {}: {:?} -> {}",
            period, email, counts, label
        );
        Ok(label)
    }

    /// Sessions starting between `start` and `end + 1 day`.
    pub fn weekly_sleep_summary(
        &self,
        email: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<WeeklySleepSummary> {
        let from = start.and_time(NaiveTime::MIN);
        let to = (end + Duration::days(1)).and_time(NaiveTime::MIN);
        let sessions = self
            .repository
            .list_sleep_sessions_between(email, from, to)?;
        summarize_week(&sessions)
            .ok_or_else(|| Error::not_found("No sleep records found for the week"))
    }

    pub fn monthly_sleep_summary(
        &self,
        email: &str,
        year: i32,
        month: u32,
    ) -> Result<MonthlySleepSummary> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| Error::validation(format!("Invalid month {}-{}", year, month)))?;
        let from = first.and_time(NaiveTime::MIN);
        let to = from + Duration::days(32);
        let sessions = self
            .repository
            .list_sleep_sessions_between(email, from, to)?;
        summarize_month(&sessions, year, month)
            .ok_or_else(|| Error::not_found("No sleep records found for the month"))
    }

    /// Classifies the account's current state and records the label on today's row.
    pub async fn predict(&self, email: &str) -> Result<PredictionResponse> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or_else(|| Error::Unavailable("Prediction model is not loaded".to_string()))?;
        let profiles = self
            .profiles
            .as_ref()
            .ok_or_else(|| Error::Unavailable("Profile authority is not configured".to_string()))?;

        let profile = profiles
            .fetch_profile(email)
            .await?
            .ok_or_else(|| Error::not_found("User profile not found"))?;

        let sleep_duration = match self.repository.latest_sleep_session(email)? {
            Some(session) => session.duration,
            None => {
                warn!("[Prediction] No sleep record for {}, using 0h", email);
                0.0
            }
        };

        let features = PredictionFeatures::from_profile(&profile, sleep_duration);
        let label = classifier.classify(&features)?;

        let account = &profile.account;
        let key = DailyKey {
            email: email.to_string(),
            date: today(),
        };
        let patch = DailyRecordPatch {
            upper_pressure: account.upper_pressure,
            lower_pressure: account.lower_pressure,
            daily_steps: account.daily_steps,
            heart_rate: account.heart_rate,
            duration: Some(sleep_duration),
            prediction_result: Some(label.code()),
        };
        self.repository.upsert_daily(key, patch).await?;
        info!("[Prediction] {} classified as {}", email, label);

        Ok(PredictionResponse { prediction: label })
    }
}
