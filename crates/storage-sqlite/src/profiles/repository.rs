use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use sleepsync_core::errors::{Error, Result};
use sleepsync_core::profiles::{
    Account, AccountPatch, FeedbackEntry, NewAccount, NewFeedback, ProfileRepositoryTrait,
    WorkProfile, WorkProfilePatch, DEFAULT_ROLE, OFFLINE_CREATED_PASSWORD,
};
use sleepsync_core::reconcile::UpsertOutcome;
use sleepsync_core::utils::time_utils::now_naive;

use super::model::{
    AccountChangesetDB, AccountDB, FeedbackDB, NewAccountDB, NewFeedbackDB, NewWorkProfileDB,
    WorkProfileChangesetDB, WorkProfileDB,
};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{is_unique_violation, StorageError};
use crate::schema::{accounts, feedback, work_profiles};

pub struct ProfileRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ProfileRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        ProfileRepository { pool, writer }
    }
}

fn find_account(conn: &mut SqliteConnection, email: &str) -> Result<Option<AccountDB>> {
    Ok(accounts::table
        .filter(accounts::email.eq(email))
        .select(AccountDB::as_select())
        .first::<AccountDB>(conn)
        .optional()
        .map_err(StorageError::from)?)
}

fn update_account_row(
    conn: &mut SqliteConnection,
    email: &str,
    patch: AccountPatch,
) -> Result<usize> {
    let changes = AccountChangesetDB::new(patch, now_naive());
    Ok(
        diesel::update(accounts::table.filter(accounts::email.eq(email)))
            .set(&changes)
            .execute(conn)
            .map_err(StorageError::from)?,
    )
}

/// Insert-or-merge inside the caller's transaction. A unique conflict on
/// insert means another writer created the row first; merge into it instead.
fn upsert_account_tx(
    conn: &mut SqliteConnection,
    email: &str,
    patch: AccountPatch,
) -> Result<UpsertOutcome> {
    if find_account(conn, email)?.is_some() {
        if patch.is_empty() {
            return Ok(UpsertOutcome::Unchanged);
        }
        update_account_row(conn, email, patch)?;
        return Ok(UpsertOutcome::Updated);
    }

    let row = NewAccountDB::new(
        email.to_string(),
        OFFLINE_CREATED_PASSWORD.to_string(),
        DEFAULT_ROLE.to_string(),
        patch.clone(),
        now_naive(),
    );
    match diesel::insert_into(accounts::table).values(&row).execute(conn) {
        Ok(_) => Ok(UpsertOutcome::Inserted),
        Err(e) if is_unique_violation(&e) => {
            debug!("[Reconcile] account {} appeared concurrently, merging", email);
            update_account_row(conn, email, patch)?;
            Ok(UpsertOutcome::Updated)
        }
        Err(e) => Err(StorageError::from(e).into()),
    }
}

fn upsert_work_profile_tx(
    conn: &mut SqliteConnection,
    email: &str,
    patch: WorkProfilePatch,
) -> Result<UpsertOutcome> {
    let existing = work_profiles::table
        .filter(work_profiles::email.eq(email))
        .select(work_profiles::id)
        .first::<i32>(conn)
        .optional()
        .map_err(StorageError::from)?;

    let apply = |conn: &mut SqliteConnection, patch: WorkProfilePatch| -> Result<UpsertOutcome> {
        if patch.is_empty() {
            return Ok(UpsertOutcome::Unchanged);
        }
        diesel::update(work_profiles::table.filter(work_profiles::email.eq(email)))
            .set(&WorkProfileChangesetDB::from(patch))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(UpsertOutcome::Updated)
    };

    if existing.is_some() {
        return apply(conn, patch);
    }

    let row = NewWorkProfileDB::new(email.to_string(), &patch);
    match diesel::insert_into(work_profiles::table)
        .values(&row)
        .execute(conn)
    {
        Ok(_) => Ok(UpsertOutcome::Inserted),
        Err(e) if is_unique_violation(&e) => apply(conn, patch),
        Err(e) => Err(StorageError::from(e).into()),
    }
}

#[async_trait]
impl ProfileRepositoryTrait for ProfileRepository {
    fn get_account(&self, email: &str) -> Result<Option<Account>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(find_account(&mut conn, email)?.map(Account::from))
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = accounts::table
            .order(accounts::id.asc())
            .select(AccountDB::as_select())
            .load::<AccountDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    fn get_work_profile(&self, email: &str) -> Result<Option<WorkProfile>> {
        let mut conn = get_connection(&self.pool)?;
        let row = work_profiles::table
            .filter(work_profiles::email.eq(email))
            .select(WorkProfileDB::as_select())
            .first::<WorkProfileDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(WorkProfile::from))
    }

    fn list_feedback(&self, email: &str) -> Result<Vec<FeedbackEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = feedback::table
            .filter(feedback::email.eq(email))
            .order(feedback::id.asc())
            .select(FeedbackDB::as_select())
            .load::<FeedbackDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(FeedbackEntry::from).collect())
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<Account> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Account> {
                if find_account(conn, &new_account.email)?.is_some() {
                    return Err(Error::Conflict("Email already registered".to_string()));
                }
                let row = NewAccountDB::new(
                    new_account.email,
                    new_account.hashed_password,
                    new_account.role,
                    new_account.fields,
                    now_naive(),
                );
                let created = diesel::insert_into(accounts::table)
                    .values(&row)
                    .returning(AccountDB::as_returning())
                    .get_result(conn)
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            Error::Conflict("Email already registered".to_string())
                        } else {
                            StorageError::from(e).into()
                        }
                    })?;
                Ok(Account::from(created))
            })
            .await
    }

    async fn upsert_account(&self, email: String, patch: AccountPatch) -> Result<UpsertOutcome> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| upsert_account_tx(conn, &email, patch))
            .await
    }

    async fn update_account(&self, email: String, patch: AccountPatch) -> Result<Account> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Account> {
                if find_account(conn, &email)?.is_none() {
                    return Err(Error::not_found("User not found"));
                }
                if !patch.is_empty() {
                    update_account_row(conn, &email, patch)?;
                }
                find_account(conn, &email)?
                    .map(Account::from)
                    .ok_or_else(|| Error::not_found("User not found"))
            })
            .await
    }

    async fn upsert_work_profile(
        &self,
        email: String,
        patch: WorkProfilePatch,
    ) -> Result<UpsertOutcome> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| upsert_work_profile_tx(conn, &email, patch))
            .await
    }

    async fn insert_feedback(&self, entry: NewFeedback) -> Result<FeedbackEntry> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<FeedbackEntry> {
                let row = diesel::insert_into(feedback::table)
                    .values(&NewFeedbackDB::from(entry))
                    .returning(FeedbackDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(FeedbackEntry::from(row))
            })
            .await
    }
}
