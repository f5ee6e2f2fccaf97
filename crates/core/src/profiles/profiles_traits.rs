use async_trait::async_trait;

use super::profiles_model::{
    Account, AccountPatch, FeedbackEntry, NewAccount, NewFeedback, WorkProfile, WorkProfilePatch,
};
use crate::errors::Result;
use crate::reconcile::UpsertOutcome;

/// Storage contract for the profile authority.
#[async_trait]
pub trait ProfileRepositoryTrait: Send + Sync {
    fn get_account(&self, email: &str) -> Result<Option<Account>>;
    fn list_accounts(&self) -> Result<Vec<Account>>;
    fn get_work_profile(&self, email: &str) -> Result<Option<WorkProfile>>;
    fn list_feedback(&self, email: &str) -> Result<Vec<FeedbackEntry>>;

    /// Fails with `Error::Conflict` when the email is taken.
    async fn create_account(&self, new_account: NewAccount) -> Result<Account>;

    /// Natural-key upsert; a missing account is created with the offline
    /// placeholder password.
    async fn upsert_account(&self, email: String, patch: AccountPatch) -> Result<UpsertOutcome>;

    /// Applies `patch` to an existing account; `Error::NotFound` otherwise.
    async fn update_account(&self, email: String, patch: AccountPatch) -> Result<Account>;

    async fn upsert_work_profile(
        &self,
        email: String,
        patch: WorkProfilePatch,
    ) -> Result<UpsertOutcome>;

    async fn insert_feedback(&self, entry: NewFeedback) -> Result<FeedbackEntry>;
}
