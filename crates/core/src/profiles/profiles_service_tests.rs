use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::*;
use crate::errors::{Error, Result};
use crate::propagation::{
    DailyMetricPush, DailyMetricsPropagator, PropagationDispatcher, PropagationMode,
};
use crate::reconcile::{MergePolicy, UpsertOutcome};

#[derive(Default)]
struct MemoryProfiles {
    accounts: Mutex<Vec<Account>>,
    work: Mutex<Vec<WorkProfile>>,
    feedback: Mutex<Vec<FeedbackEntry>>,
}

fn apply_patch(account: &mut Account, patch: AccountPatch) {
    if let Some(v) = patch.name {
        account.name = Some(v);
    }
    if let Some(v) = patch.gender {
        account.gender = Some(v);
    }
    if let Some(v) = patch.work {
        account.work = Some(v);
    }
    if let Some(v) = patch.date_of_birth {
        account.date_of_birth = Some(v);
    }
    if let Some(v) = patch.age {
        account.age = Some(v);
    }
    if let Some(v) = patch.weight {
        account.weight = v;
    }
    if let Some(v) = patch.height {
        account.height = v;
    }
    if let Some(v) = patch.upper_pressure {
        account.upper_pressure = Some(v);
    }
    if let Some(v) = patch.lower_pressure {
        account.lower_pressure = Some(v);
    }
    if let Some(v) = patch.daily_steps {
        account.daily_steps = Some(v);
    }
    if let Some(v) = patch.heart_rate {
        account.heart_rate = Some(v);
    }
}

fn blank_account(id: i32, email: &str, password: &str, role: &str) -> Account {
    Account {
        id,
        email: email.to_string(),
        hashed_password: password.to_string(),
        role: role.to_string(),
        name: None,
        gender: None,
        work: None,
        date_of_birth: None,
        age: None,
        weight: 0.0,
        height: 0.0,
        upper_pressure: None,
        lower_pressure: None,
        daily_steps: None,
        heart_rate: None,
    }
}

#[async_trait]
impl ProfileRepositoryTrait for MemoryProfiles {
    fn get_account(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    fn get_work_profile(&self, email: &str) -> Result<Option<WorkProfile>> {
        Ok(self
            .work
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.email == email)
            .cloned())
    }

    fn list_feedback(&self, email: &str) -> Result<Vec<FeedbackEntry>> {
        Ok(self
            .feedback
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.email == email)
            .cloned()
            .collect())
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.email == new_account.email) {
            return Err(Error::Conflict("taken".into()));
        }
        let mut account = blank_account(
            accounts.len() as i32 + 1,
            &new_account.email,
            &new_account.hashed_password,
            &new_account.role,
        );
        apply_patch(&mut account, new_account.fields);
        accounts.push(account.clone());
        Ok(account)
    }

    async fn upsert_account(&self, email: String, patch: AccountPatch) -> Result<UpsertOutcome> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.iter_mut().find(|a| a.email == email) {
            apply_patch(account, patch);
            return Ok(UpsertOutcome::Updated);
        }
        let mut account = blank_account(
            accounts.len() as i32 + 1,
            &email,
            OFFLINE_CREATED_PASSWORD,
            DEFAULT_ROLE,
        );
        apply_patch(&mut account, patch);
        accounts.push(account);
        Ok(UpsertOutcome::Inserted)
    }

    async fn update_account(&self, email: String, patch: AccountPatch) -> Result<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.email == email)
            .ok_or_else(|| Error::not_found("User not found"))?;
        apply_patch(account, patch);
        Ok(account.clone())
    }

    async fn upsert_work_profile(
        &self,
        email: String,
        patch: WorkProfilePatch,
    ) -> Result<UpsertOutcome> {
        let mut work = self.work.lock().unwrap();
        if let Some(row) = work.iter_mut().find(|w| w.email == email) {
            if let Some(v) = patch.work_id {
                row.work_id = Some(v);
            }
            if let Some(v) = patch.quality_of_sleep {
                row.quality_of_sleep = v;
            }
            return Ok(UpsertOutcome::Updated);
        }
        let id = work.len() as i32 + 1;
        work.push(WorkProfile {
            id,
            email,
            work_id: patch.work_id,
            quality_of_sleep: patch.quality_of_sleep.unwrap_or(DEFAULT_QUALITY_OF_SLEEP),
            physical_activity_level: patch
                .physical_activity_level
                .unwrap_or(DEFAULT_PHYSICAL_ACTIVITY_LEVEL),
            stress_level: patch.stress_level.unwrap_or(DEFAULT_STRESS_LEVEL),
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn insert_feedback(&self, entry: NewFeedback) -> Result<FeedbackEntry> {
        let mut feedback = self.feedback.lock().unwrap();
        let row = FeedbackEntry {
            id: feedback.len() as i32 + 1,
            email: entry.email,
            feedback: entry.feedback,
            created_at: entry.created_at,
        };
        feedback.push(row.clone());
        Ok(row)
    }
}

#[derive(Default)]
struct CapturingPropagator {
    pushed: Mutex<Vec<DailyMetricPush>>,
}

#[async_trait]
impl DailyMetricsPropagator for CapturingPropagator {
    async fn push_daily(&self, payload: &DailyMetricPush) -> Result<()> {
        self.pushed.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

fn service(
    policy: MergePolicy,
) -> (ProfileService, Arc<MemoryProfiles>, Arc<CapturingPropagator>) {
    let repo = Arc::new(MemoryProfiles::default());
    let propagator = Arc::new(CapturingPropagator::default());
    let dispatcher = PropagationDispatcher::new(
        PropagationMode::Inline,
        Some(propagator.clone() as Arc<dyn DailyMetricsPropagator>),
        None,
    );
    let service = ProfileService::new(
        repo.clone() as Arc<dyn ProfileRepositoryTrait>,
        Arc::new(dispatcher),
        policy,
    );
    (service, repo, propagator)
}

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "pw".to_string(),
        role: None,
    }
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let (service, _repo, _) = service(MergePolicy::PresentValues);
    let response = service
        .register(register_request("ana@example.com"))
        .await
        .unwrap();
    assert_eq!(response.role, DEFAULT_ROLE);

    let err = service
        .register(register_request("ana@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn sync_user_creates_offline_account_then_merges() {
    let (service, repo, _) = service(MergePolicy::PresentValues);
    service
        .sync_user(SyncUserRequest {
            email: "ana@example.com".into(),
            name: Some("Ana".into()),
            heart_rate: Some(70),
            ..Default::default()
        })
        .await
        .unwrap();

    let created = repo.get_account("ana@example.com").unwrap().unwrap();
    assert_eq!(created.hashed_password, OFFLINE_CREATED_PASSWORD);
    assert_eq!(created.role, DEFAULT_ROLE);

    service
        .sync_user(SyncUserRequest {
            email: "ana@example.com".into(),
            weight: Some(60.0),
            ..Default::default()
        })
        .await
        .unwrap();

    let merged = repo.get_account("ana@example.com").unwrap().unwrap();
    assert_eq!(merged.name.as_deref(), Some("Ana"));
    assert_eq!(merged.heart_rate, Some(70));
    assert_eq!(merged.weight, 60.0);
    assert_eq!(repo.list_accounts().unwrap().len(), 1);
}

#[tokio::test]
async fn blood_pressure_write_propagates_only_pressures() {
    let (service, _repo, propagator) = service(MergePolicy::PresentValues);
    service
        .register(register_request("ana@example.com"))
        .await
        .unwrap();

    service
        .save_blood_pressure(BloodPressureRequest {
            email: "ana@example.com".into(),
            upper_pressure: Some(120),
            lower_pressure: Some(80),
        })
        .await
        .unwrap();

    let pushed = propagator.pushed.lock().unwrap();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].upper_pressure, Some(120));
    assert_eq!(pushed[0].lower_pressure, Some(80));
    assert_eq!(pushed[0].heart_rate, None);
}

#[tokio::test]
async fn metric_write_for_unknown_account_is_not_found_and_not_propagated() {
    let (service, _repo, propagator) = service(MergePolicy::PresentValues);
    let err = service
        .save_heart_rate(HeartRateRequest {
            email: "ghost@example.com".into(),
            heart_rate: Some(60),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(propagator.pushed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn save_work_maps_title_and_creates_work_profile() {
    let (service, _repo, _) = service(MergePolicy::PresentValues);
    service
        .register(register_request("ana@example.com"))
        .await
        .unwrap();

    let profile = service
        .save_work(ProfileFieldRequest {
            email: "ana@example.com".into(),
            work: Some("Software Engineer".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(profile.account.work.as_deref(), Some("Software Engineer"));
    assert_eq!(profile.work_id, Some(9));
    assert_eq!(profile.quality_of_sleep, Some(DEFAULT_QUALITY_OF_SLEEP));
    assert_eq!(
        profile.physical_activity_level,
        Some(DEFAULT_PHYSICAL_ACTIVITY_LEVEL)
    );
}

#[tokio::test]
async fn save_dob_derives_age() {
    let (service, repo, _) = service(MergePolicy::PresentValues);
    service
        .register(register_request("ana@example.com"))
        .await
        .unwrap();
    service
        .save_date_of_birth(ProfileFieldRequest {
            email: "ana@example.com".into(),
            date_of_birth: Some("1990-01-01".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let account = repo.get_account("ana@example.com").unwrap().unwrap();
    assert!(account.date_of_birth.is_some());
    assert!(account.age.unwrap_or_default() >= 34);
}

#[tokio::test]
async fn sync_feedback_defaults_unparseable_timestamp() {
    let (service, repo, _) = service(MergePolicy::PresentValues);
    service
        .sync_feedback(SyncFeedbackRequest {
            email: "ana@example.com".into(),
            feedback: "great".into(),
            created_at: Some("2024-05-01T08:15:00".into()),
        })
        .await
        .unwrap();
    service
        .sync_feedback(SyncFeedbackRequest {
            email: "ana@example.com".into(),
            feedback: "again".into(),
            created_at: Some("last tuesday".into()),
        })
        .await
        .unwrap();

    let rows = repo.list_feedback("ana@example.com").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].created_at.format("%Y-%m-%d %H:%M").to_string(),
        "2024-05-01 08:15"
    );
}
