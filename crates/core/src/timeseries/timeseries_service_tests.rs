use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::*;
use crate::errors::{Error, Result};
use crate::profiles::{Account, UserProfile, DEFAULT_ROLE};
use crate::reconcile::{MergePolicy, UpsertOutcome};
use crate::utils::time_utils::today;

#[derive(Default)]
struct MemoryTimeSeries {
    daily: Mutex<Vec<DailyRecord>>,
    sessions: Mutex<Vec<SleepSession>>,
    predictions: Mutex<Vec<(PredictionPeriod, PredictionHistoryEntry)>>,
}

#[async_trait]
impl TimeSeriesRepositoryTrait for MemoryTimeSeries {
    fn get_daily(&self, key: &DailyKey) -> Result<Option<DailyRecord>> {
        Ok(self
            .daily
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.email == key.email && r.date == key.date)
            .cloned())
    }

    fn list_daily_between(
        &self,
        email: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRecord>> {
        Ok(self
            .daily
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.email == email && r.date >= from && r.date <= to)
            .cloned()
            .collect())
    }

    async fn upsert_daily(&self, key: DailyKey, patch: DailyRecordPatch) -> Result<UpsertOutcome> {
        let mut daily = self.daily.lock().unwrap();
        if let Some(row) = daily
            .iter_mut()
            .find(|r| r.email == key.email && r.date == key.date)
        {
            if let Some(v) = patch.upper_pressure {
                row.upper_pressure = Some(v);
            }
            if let Some(v) = patch.lower_pressure {
                row.lower_pressure = Some(v);
            }
            if let Some(v) = patch.daily_steps {
                row.daily_steps = Some(v);
            }
            if let Some(v) = patch.heart_rate {
                row.heart_rate = Some(v);
            }
            if let Some(v) = patch.duration {
                row.duration = v;
            }
            if let Some(v) = patch.prediction_result {
                row.prediction_result = Some(v);
            }
            return Ok(UpsertOutcome::Updated);
        }
        let id = daily.len() as i32 + 1;
        daily.push(DailyRecord {
            id,
            email: key.email,
            date: key.date,
            upper_pressure: patch.upper_pressure,
            lower_pressure: patch.lower_pressure,
            daily_steps: patch.daily_steps,
            heart_rate: patch.heart_rate,
            duration: patch.duration.unwrap_or(0.0),
            prediction_result: patch.prediction_result,
        });
        Ok(UpsertOutcome::Inserted)
    }

    fn list_sleep_sessions(&self, email: &str) -> Result<Vec<SleepSession>> {
        let mut rows: Vec<SleepSession> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.email == email)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.sleep_time.cmp(&a.sleep_time));
        Ok(rows)
    }

    fn list_sleep_sessions_between(
        &self,
        email: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<SleepSession>> {
        Ok(self
            .list_sleep_sessions(email)?
            .into_iter()
            .filter(|s| s.sleep_time >= from && s.sleep_time < to)
            .collect())
    }

    fn latest_sleep_session(&self, email: &str) -> Result<Option<SleepSession>> {
        Ok(self.list_sleep_sessions(email)?.into_iter().next())
    }

    async fn upsert_sleep_session(&self, session: NewSleepSession) -> Result<UpsertOutcome> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(row) = sessions
            .iter_mut()
            .find(|s| s.email == session.email && s.sleep_date == session.sleep_date)
        {
            row.sleep_time = session.sleep_time;
            row.wake_time = session.wake_time;
            row.duration = session.duration;
            return Ok(UpsertOutcome::Updated);
        }
        let id = sessions.len() as i32 + 1;
        sessions.push(SleepSession {
            id,
            email: session.email,
            sleep_date: session.sleep_date,
            sleep_time: session.sleep_time,
            wake_time: session.wake_time,
            duration: session.duration,
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn append_prediction(
        &self,
        period: PredictionPeriod,
        entry: NewPredictionEntry,
    ) -> Result<PredictionHistoryEntry> {
        let mut predictions = self.predictions.lock().unwrap();
        let row = PredictionHistoryEntry {
            id: predictions.len() as i32 + 1,
            email: entry.email,
            prediction_result: entry.prediction_result,
            created_at: entry.created_at,
        };
        predictions.push((period, row.clone()));
        Ok(row)
    }

    fn list_predictions(
        &self,
        period: PredictionPeriod,
        email: &str,
    ) -> Result<Vec<PredictionHistoryEntry>> {
        Ok(self
            .predictions
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, e)| *p == period && e.email == email)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

struct FixedClassifier(PredictionLabel);

impl SleepClassifier for FixedClassifier {
    fn classify(&self, _features: &PredictionFeatures) -> Result<PredictionLabel> {
        Ok(self.0)
    }
}

struct StaticProfiles(Option<UserProfile>);

#[async_trait]
impl ProfileSource for StaticProfiles {
    async fn fetch_profile(&self, _email: &str) -> Result<Option<UserProfile>> {
        Ok(self.0.clone())
    }
}

fn service() -> (TimeSeriesService, Arc<MemoryTimeSeries>) {
    let repo = Arc::new(MemoryTimeSeries::default());
    let service = TimeSeriesService::new(
        repo.clone() as Arc<dyn TimeSeriesRepositoryTrait>,
        MergePolicy::PresentValues,
    );
    (service, repo)
}

fn key(date: &str) -> DailyKey {
    DailyKey {
        email: "ana@example.com".into(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
    }
}

fn profile() -> UserProfile {
    UserProfile::new(
        Account {
            id: 1,
            email: "ana@example.com".into(),
            hashed_password: String::new(),
            role: DEFAULT_ROLE.into(),
            name: None,
            gender: Some(1),
            work: None,
            date_of_birth: None,
            age: Some(34),
            weight: 60.0,
            height: 165.0,
            upper_pressure: Some(118),
            lower_pressure: Some(76),
            daily_steps: None,
            heart_rate: Some(64),
        },
        None,
    )
}

#[tokio::test]
async fn repeated_daily_sync_is_idempotent() {
    let (service, repo) = service();
    let request = SyncDailyRequest {
        email: "ana@example.com".into(),
        date: Some("2024-05-01".into()),
        upper_pressure: Some(120),
        duration: Some(7.0),
        ..Default::default()
    };

    service.sync_daily(request.clone()).await.unwrap();
    let first = repo.get_daily(&key("2024-05-01")).unwrap().unwrap();
    service.sync_daily(request).await.unwrap();
    let second = repo.get_daily(&key("2024-05-01")).unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(repo.daily.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn daily_sync_never_nulls_absent_fields() {
    let (service, repo) = service();
    service
        .sync_daily(SyncDailyRequest {
            email: "ana@example.com".into(),
            date: Some("2024-05-01".into()),
            heart_rate: Some(72),
            ..Default::default()
        })
        .await
        .unwrap();
    service
        .sync_daily(SyncDailyRequest {
            email: "ana@example.com".into(),
            date: Some("2024-05-01T08:00:00".into()),
            daily_steps: Some(9000),
            ..Default::default()
        })
        .await
        .unwrap();

    let row = repo.get_daily(&key("2024-05-01")).unwrap().unwrap();
    assert_eq!(row.heart_rate, Some(72));
    assert_eq!(row.daily_steps, Some(9000));
}

#[tokio::test]
async fn unparseable_date_lands_on_today() {
    let (service, repo) = service();
    service
        .sync_daily(SyncDailyRequest {
            email: "ana@example.com".into(),
            date: Some("garbage".into()),
            daily_steps: Some(100),
            ..Default::default()
        })
        .await
        .unwrap();
    let rows = repo.daily.lock().unwrap();
    assert_eq!(rows[0].date, today());
}

#[tokio::test]
async fn save_sleep_record_reports_insert_then_update() {
    let (service, repo) = service();
    let request = SleepRecordRequest {
        email: "ana@example.com".into(),
        sleep_time: "2024-05-01T23:00:00".into(),
        wake_time: "2024-05-01T06:00:00".into(),
    };
    let first = service.save_sleep_record(request.clone()).await.unwrap();
    assert_eq!(first.message, "Record saved");

    let later = SleepRecordRequest {
        sleep_time: "2024-05-01T23:30:00".into(),
        ..request
    };
    let second = service.save_sleep_record(later).await.unwrap();
    assert_eq!(second.message, "Record updated");

    let sessions = repo.sessions.lock().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].duration, 6.5);
}

#[tokio::test]
async fn weekly_aggregate_is_not_found_without_rows() {
    let (service, _repo) = service();
    let err = service
        .aggregate_prediction(PredictionPeriod::Weekly, "ana@example.com")
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn aggregate_window_excludes_older_rows() {
    let (service, repo) = service();
    let as_of = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
    for (offset, label) in [(1, 1), (2, 1), (3, 0), (20, 2), (21, 2), (22, 2)] {
        repo.upsert_daily(
            DailyKey {
                email: "ana@example.com".into(),
                date: as_of - Duration::days(offset),
            },
            DailyRecordPatch {
                prediction_result: Some(label),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let weekly = service
        .aggregate_prediction_as_of(PredictionPeriod::Weekly, "ana@example.com", as_of)
        .unwrap();
    let monthly = service
        .aggregate_prediction_as_of(PredictionPeriod::Monthly, "ana@example.com", as_of)
        .unwrap();
    assert_eq!(weekly, PredictionLabel::Normal);
    assert_eq!(monthly, PredictionLabel::SleepApnea);
}

#[tokio::test]
async fn predict_requires_classifier() {
    let (service, _repo) = service();
    let service = service.with_profile_source(Arc::new(StaticProfiles(Some(profile()))));
    let err = service.predict("ana@example.com").await.unwrap_err();
    assert!(matches!(err, Error::Unavailable(_)));
}

#[tokio::test]
async fn predict_unknown_profile_is_not_found() {
    let (service, _repo) = service();
    let service = service
        .with_profile_source(Arc::new(StaticProfiles(None)))
        .with_classifier(Arc::new(FixedClassifier(PredictionLabel::Normal)));
    let err = service.predict("ana@example.com").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn predict_records_label_on_todays_row() {
    let (service, repo) = service();
    let service = service
        .with_profile_source(Arc::new(StaticProfiles(Some(profile()))))
        .with_classifier(Arc::new(FixedClassifier(PredictionLabel::Insomnia)));

    let response = service.predict("ana@example.com").await.unwrap();
    assert_eq!(response.prediction, PredictionLabel::Insomnia);

    let row = repo
        .get_daily(&DailyKey {
            email: "ana@example.com".into(),
            date: today(),
        })
        .unwrap()
        .unwrap();
    assert_eq!(row.prediction_result, Some(0));
    assert_eq!(row.upper_pressure, Some(118));
    assert_eq!(row.heart_rate, Some(64));
    assert_eq!(row.daily_steps, None);
}

#[tokio::test]
async fn synced_predictions_are_appended_per_period() {
    let (service, _repo) = service();
    for created_at in [Some("2024-05-01T10:00:00Z"), None] {
        service
            .sync_prediction(
                PredictionPeriod::Weekly,
                SyncPredictionRequest {
                    email: "ana@example.com".into(),
                    prediction_result: PredictionLabel::Normal,
                    created_at: created_at.map(str::to_string),
                },
            )
            .await
            .unwrap();
    }
    let weekly = service
        .list_predictions(PredictionPeriod::Weekly, "ana@example.com")
        .unwrap();
    let monthly = service
        .list_predictions(PredictionPeriod::Monthly, "ana@example.com")
        .unwrap();
    assert_eq!(weekly.len(), 2);
    assert!(monthly.is_empty());
}
