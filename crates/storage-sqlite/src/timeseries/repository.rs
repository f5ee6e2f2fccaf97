use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use sleepsync_core::errors::Result;
use sleepsync_core::reconcile::UpsertOutcome;
use sleepsync_core::timeseries::{
    DailyKey, DailyRecord, DailyRecordPatch, NewPredictionEntry, NewSleepSession,
    PredictionHistoryEntry, PredictionPeriod, SleepSession, TimeSeriesRepositoryTrait,
};

use super::model::{
    DailyRecordChangesetDB, DailyRecordDB, NewDailyRecordDB, NewSleepSessionDB, PredictionRowDB,
    SleepSessionDB,
};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{is_unique_violation, StorageError};
use crate::schema::{daily_records, monthly_predictions, sleep_sessions, weekly_predictions};

pub struct TimeSeriesRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TimeSeriesRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        TimeSeriesRepository { pool, writer }
    }
}

fn merge_daily(
    conn: &mut SqliteConnection,
    key: &DailyKey,
    patch: DailyRecordPatch,
) -> Result<UpsertOutcome> {
    if patch.is_empty() {
        return Ok(UpsertOutcome::Unchanged);
    }
    diesel::update(
        daily_records::table
            .filter(daily_records::email.eq(&key.email))
            .filter(daily_records::date.eq(key.date)),
    )
    .set(&DailyRecordChangesetDB::from(patch))
    .execute(conn)
    .map_err(StorageError::from)?;
    Ok(UpsertOutcome::Updated)
}

fn upsert_daily_tx(
    conn: &mut SqliteConnection,
    key: &DailyKey,
    patch: DailyRecordPatch,
) -> Result<UpsertOutcome> {
    let existing = daily_records::table
        .filter(daily_records::email.eq(&key.email))
        .filter(daily_records::date.eq(key.date))
        .select(daily_records::id)
        .first::<i32>(conn)
        .optional()
        .map_err(StorageError::from)?;
    if existing.is_some() {
        return merge_daily(conn, key, patch);
    }

    let row = NewDailyRecordDB::new(key, &patch);
    match diesel::insert_into(daily_records::table)
        .values(&row)
        .execute(conn)
    {
        Ok(_) => Ok(UpsertOutcome::Inserted),
        Err(e) if is_unique_violation(&e) => {
            debug!(
                "[Reconcile] daily {} {} appeared concurrently, merging",
                key.email, key.date
            );
            merge_daily(conn, key, patch)
        }
        Err(e) => Err(StorageError::from(e).into()),
    }
}

fn upsert_sleep_tx(conn: &mut SqliteConnection, session: NewSleepSession) -> Result<UpsertOutcome> {
    let row = NewSleepSessionDB::from(session);
    let target = sleep_sessions::table
        .filter(sleep_sessions::email.eq(row.email.clone()))
        .filter(sleep_sessions::sleep_date.eq(row.sleep_date));

    let existing = target
        .clone()
        .select(sleep_sessions::id)
        .first::<i32>(conn)
        .optional()
        .map_err(StorageError::from)?;
    if existing.is_some() {
        diesel::update(target.clone())
            .set(&row)
            .execute(conn)
            .map_err(StorageError::from)?;
        return Ok(UpsertOutcome::Updated);
    }

    match diesel::insert_into(sleep_sessions::table)
        .values(&row)
        .execute(conn)
    {
        Ok(_) => Ok(UpsertOutcome::Inserted),
        Err(e) if is_unique_violation(&e) => {
            diesel::update(target)
                .set(&row)
                .execute(conn)
                .map_err(StorageError::from)?;
            Ok(UpsertOutcome::Updated)
        }
        Err(e) => Err(StorageError::from(e).into()),
    }
}

#[async_trait]
impl TimeSeriesRepositoryTrait for TimeSeriesRepository {
    fn get_daily(&self, key: &DailyKey) -> Result<Option<DailyRecord>> {
        let mut conn = get_connection(&self.pool)?;
        let row = daily_records::table
            .filter(daily_records::email.eq(&key.email))
            .filter(daily_records::date.eq(key.date))
            .select(DailyRecordDB::as_select())
            .first::<DailyRecordDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(DailyRecord::from))
    }

    fn list_daily_between(
        &self,
        email: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRecord>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = daily_records::table
            .filter(daily_records::email.eq(email))
            .filter(daily_records::date.ge(from))
            .filter(daily_records::date.le(to))
            .order(daily_records::date.asc())
            .select(DailyRecordDB::as_select())
            .load::<DailyRecordDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(DailyRecord::from).collect())
    }

    async fn upsert_daily(&self, key: DailyKey, patch: DailyRecordPatch) -> Result<UpsertOutcome> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| upsert_daily_tx(conn, &key, patch))
            .await
    }

    fn list_sleep_sessions(&self, email: &str) -> Result<Vec<SleepSession>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sleep_sessions::table
            .filter(sleep_sessions::email.eq(email))
            .order(sleep_sessions::sleep_time.desc())
            .select(SleepSessionDB::as_select())
            .load::<SleepSessionDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(SleepSession::from).collect())
    }

    fn list_sleep_sessions_between(
        &self,
        email: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<SleepSession>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sleep_sessions::table
            .filter(sleep_sessions::email.eq(email))
            .filter(sleep_sessions::sleep_time.ge(from))
            .filter(sleep_sessions::sleep_time.lt(to))
            .order(sleep_sessions::sleep_time.desc())
            .select(SleepSessionDB::as_select())
            .load::<SleepSessionDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(SleepSession::from).collect())
    }

    fn latest_sleep_session(&self, email: &str) -> Result<Option<SleepSession>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sleep_sessions::table
            .filter(sleep_sessions::email.eq(email))
            .order(sleep_sessions::sleep_time.desc())
            .select(SleepSessionDB::as_select())
            .first::<SleepSessionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(SleepSession::from))
    }

    async fn upsert_sleep_session(&self, session: NewSleepSession) -> Result<UpsertOutcome> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| upsert_sleep_tx(conn, session))
            .await
    }

    async fn append_prediction(
        &self,
        period: PredictionPeriod,
        entry: NewPredictionEntry,
    ) -> Result<PredictionHistoryEntry> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PredictionHistoryEntry> {
                let label = entry.prediction_result.as_str().to_string();
                let row = match period {
                    PredictionPeriod::Weekly => diesel::insert_into(weekly_predictions::table)
                        .values((
                            weekly_predictions::email.eq(&entry.email),
                            weekly_predictions::prediction_result.eq(&label),
                            weekly_predictions::created_at.eq(entry.created_at),
                        ))
                        .returning((
                            weekly_predictions::id,
                            weekly_predictions::email,
                            weekly_predictions::prediction_result,
                            weekly_predictions::created_at,
                        ))
                        .get_result::<PredictionRowDB>(conn),
                    PredictionPeriod::Monthly => diesel::insert_into(monthly_predictions::table)
                        .values((
                            monthly_predictions::email.eq(&entry.email),
                            monthly_predictions::prediction_result.eq(&label),
                            monthly_predictions::created_at.eq(entry.created_at),
                        ))
                        .returning((
                            monthly_predictions::id,
                            monthly_predictions::email,
                            monthly_predictions::prediction_result,
                            monthly_predictions::created_at,
                        ))
                        .get_result::<PredictionRowDB>(conn),
                }
                .map_err(StorageError::from)?;
                PredictionHistoryEntry::try_from(row)
            })
            .await
    }

    fn list_predictions(
        &self,
        period: PredictionPeriod,
        email: &str,
    ) -> Result<Vec<PredictionHistoryEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = match period {
            PredictionPeriod::Weekly => weekly_predictions::table
                .filter(weekly_predictions::email.eq(email))
                .order(weekly_predictions::id.asc())
                .load::<PredictionRowDB>(&mut conn),
            PredictionPeriod::Monthly => monthly_predictions::table
                .filter(monthly_predictions::email.eq(email))
                .order(monthly_predictions::id.asc())
                .load::<PredictionRowDB>(&mut conn),
        }
        .map_err(StorageError::from)?;
        rows.into_iter()
            .map(PredictionHistoryEntry::try_from)
            .collect()
    }
}
