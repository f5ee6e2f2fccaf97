//! Database models for the time-series authority tables.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use sleepsync_core::errors::{DatabaseError, Error, Result};
use sleepsync_core::timeseries::{
    DailyKey, DailyRecord, DailyRecordPatch, NewSleepSession, PredictionHistoryEntry,
    PredictionLabel, SleepSession,
};

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::daily_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DailyRecordDB {
    pub id: i32,
    pub email: String,
    pub date: NaiveDate,
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
    pub duration: f64,
    pub prediction_result: Option<i32>,
}

impl From<DailyRecordDB> for DailyRecord {
    fn from(db: DailyRecordDB) -> Self {
        DailyRecord {
            id: db.id,
            email: db.email,
            date: db.date,
            upper_pressure: db.upper_pressure,
            lower_pressure: db.lower_pressure,
            daily_steps: db.daily_steps,
            heart_rate: db.heart_rate,
            duration: db.duration,
            prediction_result: db.prediction_result,
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::daily_records)]
pub struct NewDailyRecordDB {
    pub email: String,
    pub date: NaiveDate,
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
    pub duration: f64,
    pub prediction_result: Option<i32>,
}

impl NewDailyRecordDB {
    pub fn new(key: &DailyKey, patch: &DailyRecordPatch) -> Self {
        NewDailyRecordDB {
            email: key.email.clone(),
            date: key.date,
            upper_pressure: patch.upper_pressure,
            lower_pressure: patch.lower_pressure,
            daily_steps: patch.daily_steps,
            heart_rate: patch.heart_rate,
            duration: patch.duration.unwrap_or(0.0),
            prediction_result: patch.prediction_result,
        }
    }
}

#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::daily_records)]
pub struct DailyRecordChangesetDB {
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
    pub duration: Option<f64>,
    pub prediction_result: Option<i32>,
}

impl From<DailyRecordPatch> for DailyRecordChangesetDB {
    fn from(patch: DailyRecordPatch) -> Self {
        DailyRecordChangesetDB {
            upper_pressure: patch.upper_pressure,
            lower_pressure: patch.lower_pressure,
            daily_steps: patch.daily_steps,
            heart_rate: patch.heart_rate,
            duration: patch.duration,
            prediction_result: patch.prediction_result,
        }
    }
}

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sleep_sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SleepSessionDB {
    pub id: i32,
    pub email: String,
    pub sleep_date: NaiveDate,
    pub sleep_time: NaiveDateTime,
    pub wake_time: NaiveDateTime,
    pub duration: f64,
}

impl From<SleepSessionDB> for SleepSession {
    fn from(db: SleepSessionDB) -> Self {
        SleepSession {
            id: db.id,
            email: db.email,
            sleep_date: db.sleep_date,
            sleep_time: db.sleep_time,
            wake_time: db.wake_time,
            duration: db.duration,
        }
    }
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::sleep_sessions)]
pub struct NewSleepSessionDB {
    pub email: String,
    pub sleep_date: NaiveDate,
    pub sleep_time: NaiveDateTime,
    pub wake_time: NaiveDateTime,
    pub duration: f64,
}

impl From<NewSleepSession> for NewSleepSessionDB {
    fn from(session: NewSleepSession) -> Self {
        NewSleepSessionDB {
            email: session.email,
            sleep_date: session.sleep_date,
            sleep_time: session.sleep_time,
            wake_time: session.wake_time,
            duration: session.duration,
        }
    }
}

/// Row of either prediction history table; both share one column layout.
#[derive(Queryable, Debug, Clone)]
pub struct PredictionRowDB {
    pub id: i32,
    pub email: String,
    pub prediction_result: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<PredictionRowDB> for PredictionHistoryEntry {
    type Error = Error;

    fn try_from(db: PredictionRowDB) -> Result<Self> {
        let label = db
            .prediction_result
            .parse::<PredictionLabel>()
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(e)))?;
        Ok(PredictionHistoryEntry {
            id: db.id,
            email: db.email,
            prediction_result: label,
            created_at: db.created_at,
        })
    }
}
