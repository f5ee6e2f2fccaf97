//! Database models for the profile authority tables.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use sleepsync_core::profiles::{
    Account, AccountPatch, FeedbackEntry, NewFeedback, WorkProfile, WorkProfilePatch,
    DEFAULT_PHYSICAL_ACTIVITY_LEVEL, DEFAULT_QUALITY_OF_SLEEP, DEFAULT_STRESS_LEVEL,
};

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountDB {
    pub id: i32,
    pub email: String,
    pub hashed_password: String,
    pub role: String,
    pub name: Option<String>,
    pub gender: Option<i32>,
    pub work: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
    pub weight: f64,
    pub height: f64,
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<AccountDB> for Account {
    fn from(db: AccountDB) -> Self {
        Account {
            id: db.id,
            email: db.email,
            hashed_password: db.hashed_password,
            role: db.role,
            name: db.name,
            gender: db.gender,
            work: db.work,
            date_of_birth: db.date_of_birth,
            age: db.age,
            weight: db.weight,
            height: db.height,
            upper_pressure: db.upper_pressure,
            lower_pressure: db.lower_pressure,
            daily_steps: db.daily_steps,
            heart_rate: db.heart_rate,
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::accounts)]
pub struct NewAccountDB {
    pub email: String,
    pub hashed_password: String,
    pub role: String,
    pub name: Option<String>,
    pub gender: Option<i32>,
    pub work: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
    pub weight: f64,
    pub height: f64,
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewAccountDB {
    /// Omitted numeric fields take the table defaults.
    pub fn new(
        email: String,
        hashed_password: String,
        role: String,
        fields: AccountPatch,
        now: NaiveDateTime,
    ) -> Self {
        NewAccountDB {
            email,
            hashed_password,
            role,
            name: fields.name,
            gender: fields.gender,
            work: fields.work,
            date_of_birth: fields.date_of_birth,
            age: fields.age,
            weight: fields.weight.unwrap_or(0.0),
            height: fields.height.unwrap_or(0.0),
            upper_pressure: fields.upper_pressure,
            lower_pressure: fields.lower_pressure,
            daily_steps: fields.daily_steps,
            heart_rate: fields.heart_rate,
            created_at: now,
            updated_at: now,
        }
    }
}

/// `None` columns are left out of the UPDATE, which is what keeps absent
/// fields untouched.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::accounts)]
pub struct AccountChangesetDB {
    pub name: Option<String>,
    pub gender: Option<i32>,
    pub work: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
    pub updated_at: NaiveDateTime,
}

impl AccountChangesetDB {
    pub fn new(patch: AccountPatch, now: NaiveDateTime) -> Self {
        AccountChangesetDB {
            name: patch.name,
            gender: patch.gender,
            work: patch.work,
            date_of_birth: patch.date_of_birth,
            age: patch.age,
            weight: patch.weight,
            height: patch.height,
            upper_pressure: patch.upper_pressure,
            lower_pressure: patch.lower_pressure,
            daily_steps: patch.daily_steps,
            heart_rate: patch.heart_rate,
            updated_at: now,
        }
    }
}

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::work_profiles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WorkProfileDB {
    pub id: i32,
    pub email: String,
    pub work_id: Option<i32>,
    pub quality_of_sleep: f64,
    pub physical_activity_level: f64,
    pub stress_level: f64,
}

impl From<WorkProfileDB> for WorkProfile {
    fn from(db: WorkProfileDB) -> Self {
        WorkProfile {
            id: db.id,
            email: db.email,
            work_id: db.work_id,
            quality_of_sleep: db.quality_of_sleep,
            physical_activity_level: db.physical_activity_level,
            stress_level: db.stress_level,
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::work_profiles)]
pub struct NewWorkProfileDB {
    pub email: String,
    pub work_id: Option<i32>,
    pub quality_of_sleep: f64,
    pub physical_activity_level: f64,
    pub stress_level: f64,
}

impl NewWorkProfileDB {
    pub fn new(email: String, patch: &WorkProfilePatch) -> Self {
        NewWorkProfileDB {
            email,
            work_id: patch.work_id,
            quality_of_sleep: patch.quality_of_sleep.unwrap_or(DEFAULT_QUALITY_OF_SLEEP),
            physical_activity_level: patch
                .physical_activity_level
                .unwrap_or(DEFAULT_PHYSICAL_ACTIVITY_LEVEL),
            stress_level: patch.stress_level.unwrap_or(DEFAULT_STRESS_LEVEL),
        }
    }
}

#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::work_profiles)]
pub struct WorkProfileChangesetDB {
    pub work_id: Option<i32>,
    pub quality_of_sleep: Option<f64>,
    pub physical_activity_level: Option<f64>,
    pub stress_level: Option<f64>,
}

impl From<WorkProfilePatch> for WorkProfileChangesetDB {
    fn from(patch: WorkProfilePatch) -> Self {
        WorkProfileChangesetDB {
            work_id: patch.work_id,
            quality_of_sleep: patch.quality_of_sleep,
            physical_activity_level: patch.physical_activity_level,
            stress_level: patch.stress_level,
        }
    }
}

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::feedback)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FeedbackDB {
    pub id: i32,
    pub email: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

impl From<FeedbackDB> for FeedbackEntry {
    fn from(db: FeedbackDB) -> Self {
        FeedbackEntry {
            id: db.id,
            email: db.email,
            feedback: db.body,
            created_at: db.created_at,
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::feedback)]
pub struct NewFeedbackDB {
    pub email: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

impl From<NewFeedback> for NewFeedbackDB {
    fn from(entry: NewFeedback) -> Self {
        NewFeedbackDB {
            email: entry.email,
            body: entry.feedback,
            created_at: entry.created_at,
        }
    }
}
