use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::Level;

use super::*;
use crate::errors::{DatabaseError, Error, Result};
use crate::profiles::{
    Account, AccountPatch, FeedbackEntry, NewAccount, NewFeedback, ProfileRepositoryTrait,
    WorkProfile, WorkProfilePatch, DEFAULT_ROLE,
};
use crate::reconcile::UpsertOutcome;

#[derive(Clone, Copy)]
enum Health {
    Healthy,
    Unreachable,
    Broken,
}

struct ScriptedProfiles {
    health: Health,
    accounts: Mutex<Vec<Account>>,
    calls: Mutex<usize>,
}

impl ScriptedProfiles {
    fn new(health: Health) -> Arc<Self> {
        Arc::new(Self {
            health,
            accounts: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
        })
    }

    fn check(&self) -> Result<()> {
        *self.calls.lock().unwrap() += 1;
        match self.health {
            Health::Healthy => Ok(()),
            Health::Unreachable => Err(Error::Database(DatabaseError::ConnectionFailed(
                "connection timed out".into(),
            ))),
            Health::Broken => Err(Error::Database(DatabaseError::QueryFailed(
                "no such table: accounts".into(),
            ))),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ProfileRepositoryTrait for ScriptedProfiles {
    fn get_account(&self, email: &str) -> Result<Option<Account>> {
        self.check()?;
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        self.check()?;
        Ok(self.accounts.lock().unwrap().clone())
    }

    fn get_work_profile(&self, _email: &str) -> Result<Option<WorkProfile>> {
        self.check()?;
        Ok(None)
    }

    fn list_feedback(&self, _email: &str) -> Result<Vec<FeedbackEntry>> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<Account> {
        self.check()?;
        let account = Account {
            id: 1,
            email: new_account.email,
            hashed_password: new_account.hashed_password,
            role: new_account.role,
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
        };
        self.accounts.lock().unwrap().push(account.clone());
        Ok(account)
    }

    async fn upsert_account(&self, _email: String, _patch: AccountPatch) -> Result<UpsertOutcome> {
        self.check()?;
        Ok(UpsertOutcome::Inserted)
    }

    async fn update_account(&self, email: String, _patch: AccountPatch) -> Result<Account> {
        self.check()?;
        self.get_account(&email)?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    async fn upsert_work_profile(
        &self,
        _email: String,
        _patch: WorkProfilePatch,
    ) -> Result<UpsertOutcome> {
        self.check()?;
        Ok(UpsertOutcome::Inserted)
    }

    async fn insert_feedback(&self, _entry: NewFeedback) -> Result<FeedbackEntry> {
        self.check()?;
        Err(Error::Unexpected("not used".into()))
    }
}

fn new_account(email: &str) -> NewAccount {
    NewAccount {
        email: email.into(),
        hashed_password: "x".into(),
        role: DEFAULT_ROLE.into(),
        fields: AccountPatch::default(),
    }
}

fn store(primary: &Arc<ScriptedProfiles>, fallback: &Arc<ScriptedProfiles>) -> ProfileStore {
    FallbackStore::new(
        primary.clone() as Arc<dyn ProfileRepositoryTrait>,
        fallback.clone() as Arc<dyn ProfileRepositoryTrait>,
    )
}

#[tokio::test]
async fn healthy_primary_never_touches_fallback() {
    let primary = ScriptedProfiles::new(Health::Healthy);
    let fallback = ScriptedProfiles::new(Health::Healthy);
    let store = store(&primary, &fallback);

    store.create_account(new_account("ana@example.com")).await.unwrap();
    assert!(store.get_account("ana@example.com").unwrap().is_some());
    assert_eq!(fallback.calls(), 0);
    assert_eq!(store.fallback_count(), 0);
}

#[tokio::test]
async fn unreachable_primary_routes_writes_and_reads_to_fallback() {
    let primary = ScriptedProfiles::new(Health::Unreachable);
    let fallback = ScriptedProfiles::new(Health::Healthy);
    let store = store(&primary, &fallback);

    store.create_account(new_account("ana@example.com")).await.unwrap();
    let found = store.get_account("ana@example.com").unwrap();

    assert!(found.is_some());
    assert_eq!(fallback.accounts.lock().unwrap().len(), 1);
    assert_eq!(store.fallback_count(), 2);
}

#[tokio::test]
async fn unrelated_storage_errors_also_fall_back() {
    let primary = ScriptedProfiles::new(Health::Broken);
    let fallback = ScriptedProfiles::new(Health::Healthy);
    let store = store(&primary, &fallback);

    assert!(store.list_accounts().unwrap().is_empty());
    assert_eq!(store.fallback_count(), 1);
}

#[tokio::test]
async fn domain_outcomes_do_not_fall_back() {
    let primary = ScriptedProfiles::new(Health::Healthy);
    let fallback = ScriptedProfiles::new(Health::Healthy);
    let store = store(&primary, &fallback);

    let err = store
        .update_account("ghost@example.com".into(), AccountPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn fallback_failure_is_surfaced() {
    let primary = ScriptedProfiles::new(Health::Unreachable);
    let fallback = ScriptedProfiles::new(Health::Broken);
    let store = store(&primary, &fallback);

    let err = store.list_accounts().unwrap_err();
    assert!(err.is_storage_failure());
    assert!(!err.is_connectivity());
}

#[test]
fn connectivity_logs_at_warn_everything_else_at_error() {
    let timeout = Error::Database(DatabaseError::ConnectionFailed("timeout".into()));
    let query = Error::Database(DatabaseError::QueryFailed("syntax".into()));
    assert_eq!(fallback_log_level(&timeout), Level::Warn);
    assert_eq!(fallback_log_level(&query), Level::Error);
}
