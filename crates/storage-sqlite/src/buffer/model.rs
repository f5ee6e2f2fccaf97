//! Buffer rows and their receiver wire shapes.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use sleepsync_core::profiles::{SyncFeedbackRequest, SyncUserRequest, SyncWorkDataRequest};
use sleepsync_core::timeseries::{
    PredictionLabel, SleepRecordRequest, SyncDailyRequest, SyncPredictionRequest,
};
use sleepsync_core::utils::time_utils::{format_date, format_timestamp};

pub const UNSYNCED: i32 = 0;
pub const SYNCED: i32 = 1;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = super::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRowDB {
    pub id: i32,
    pub email: String,
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
    pub synced: i32,
    pub version: i32,
}

impl From<UserRowDB> for SyncUserRequest {
    fn from(row: UserRowDB) -> Self {
        SyncUserRequest {
            email: row.email,
            name: row.name,
            gender: row.gender,
            work: row.work,
            date_of_birth: row.date_of_birth.map(format_date),
            age: row.age,
            weight: row.weight,
            height: row.height,
            upper_pressure: row.upper_pressure,
            lower_pressure: row.lower_pressure,
            daily_steps: row.daily_steps,
            heart_rate: row.heart_rate,
        }
    }
}

/// Insert values and, on an existing email, the merge changeset. `None`
/// columns are skipped by the update.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = super::schema::users)]
pub struct UserChangesDB {
    pub email: String,
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
    pub synced: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = super::schema::work_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WorkDataRowDB {
    pub id: i32,
    pub email: String,
    pub work_id: Option<i32>,
    pub quality_of_sleep: Option<f64>,
    pub physical_activity_level: Option<f64>,
    pub stress_level: Option<f64>,
    pub synced: i32,
    pub version: i32,
}

impl From<WorkDataRowDB> for SyncWorkDataRequest {
    fn from(row: WorkDataRowDB) -> Self {
        SyncWorkDataRequest {
            email: row.email,
            work_id: row.work_id,
            quality_of_sleep: row.quality_of_sleep,
            physical_activity_level: row.physical_activity_level,
            stress_level: row.stress_level,
        }
    }
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = super::schema::work_data)]
pub struct WorkDataChangesDB {
    pub email: String,
    pub work_id: Option<i32>,
    pub quality_of_sleep: Option<f64>,
    pub physical_activity_level: Option<f64>,
    pub stress_level: Option<f64>,
    pub synced: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = super::schema::feedback)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FeedbackRowDB {
    pub id: i32,
    pub email: String,
    pub body: String,
    pub created_at: NaiveDateTime,
    pub synced: i32,
    pub version: i32,
}

impl From<FeedbackRowDB> for SyncFeedbackRequest {
    fn from(row: FeedbackRowDB) -> Self {
        SyncFeedbackRequest {
            email: row.email,
            feedback: row.body,
            created_at: Some(format_timestamp(row.created_at)),
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = super::schema::feedback)]
pub struct NewFeedbackRowDB {
    pub email: String,
    pub body: String,
    pub created_at: NaiveDateTime,
    pub synced: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = super::schema::daily)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DailyRowDB {
    pub id: i32,
    pub email: String,
    pub date: NaiveDate,
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
    pub duration: Option<f64>,
    pub prediction_result: Option<i32>,
    pub synced: i32,
    pub version: i32,
}

impl From<DailyRowDB> for SyncDailyRequest {
    fn from(row: DailyRowDB) -> Self {
        SyncDailyRequest {
            email: row.email,
            date: Some(format_date(row.date)),
            upper_pressure: row.upper_pressure,
            lower_pressure: row.lower_pressure,
            daily_steps: row.daily_steps,
            heart_rate: row.heart_rate,
            duration: row.duration,
            prediction_result: row.prediction_result.and_then(PredictionLabel::from_code),
        }
    }
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = super::schema::daily)]
pub struct DailyChangesDB {
    pub email: String,
    pub date: NaiveDate,
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
    pub duration: Option<f64>,
    pub prediction_result: Option<i32>,
    pub synced: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = super::schema::sleep_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SleepRecordRowDB {
    pub id: i32,
    pub email: String,
    pub sleep_time: NaiveDateTime,
    pub wake_time: NaiveDateTime,
    pub synced: i32,
    pub version: i32,
}

impl From<SleepRecordRowDB> for SleepRecordRequest {
    fn from(row: SleepRecordRowDB) -> Self {
        SleepRecordRequest {
            email: row.email,
            sleep_time: format_timestamp(row.sleep_time),
            wake_time: format_timestamp(row.wake_time),
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = super::schema::sleep_records)]
pub struct NewSleepRecordRowDB {
    pub email: String,
    pub sleep_time: NaiveDateTime,
    pub wake_time: NaiveDateTime,
    pub synced: i32,
}

/// Row of either buffered prediction table.
#[derive(Queryable, Debug, Clone)]
pub struct PredictionRowDB {
    pub id: i32,
    pub email: String,
    pub prediction_result: String,
    pub created_at: NaiveDateTime,
    pub synced: i32,
    pub version: i32,
}

impl PredictionRowDB {
    /// `None` when the stored label text is not a known label.
    pub fn to_request(&self) -> Option<SyncPredictionRequest> {
        let label = self.prediction_result.parse::<PredictionLabel>().ok()?;
        Some(SyncPredictionRequest {
            email: self.email.clone(),
            prediction_result: label,
            created_at: Some(format_timestamp(self.created_at)),
        })
    }
}
