use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::warn;
use sleepsync_core::errors::{Error, Result};
use sleepsync_core::profiles::{SyncFeedbackRequest, SyncUserRequest, SyncWorkDataRequest};
use sleepsync_core::reconcile::MergePolicy;
use sleepsync_core::sync::{BufferTable, BufferedRow, LocalBufferTrait};
use sleepsync_core::timeseries::{
    PredictionLabel, PredictionPeriod, SleepRecordRequest, SyncDailyRequest,
};
use sleepsync_core::utils::time_utils::{now_naive, today};

use super::model::*;
use super::schema::{
    daily, feedback, monthly_predictions, sleep_records, users, weekly_predictions, work_data,
};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;

/// Local writes are taken as given: zero is a real value, blanks are not.
const LOCAL_POLICY: MergePolicy = MergePolicy::PresentValues;

/// Client-side store of rows created while offline. Every save marks the
/// row unsynced and bumps its version so the next pass resends it.
pub struct LocalBufferRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

fn require_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::validation("email is required"));
    }
    Ok(email.to_string())
}

fn upsert_daily_row(conn: &mut SqliteConnection, row: &DailyChangesDB) -> Result<()> {
    diesel::insert_into(daily::table)
        .values(row)
        .on_conflict((daily::email, daily::date))
        .do_update()
        .set((row, daily::version.eq(daily::version + 1)))
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

impl LocalBufferRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        LocalBufferRepository { pool, writer }
    }

    pub async fn save_user(&self, user: SyncUserRequest) -> Result<()> {
        let email = require_email(&user.email)?;
        let patch = user.to_patch(LOCAL_POLICY);
        let row = UserChangesDB {
            email,
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
            synced: UNSYNCED,
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(users::table)
                    .values(&row)
                    .on_conflict(users::email)
                    .do_update()
                    .set((&row, users::version.eq(users::version + 1)))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    pub async fn save_work_data(&self, work: SyncWorkDataRequest) -> Result<()> {
        let email = require_email(&work.email)?;
        let patch = work.to_patch(LOCAL_POLICY);
        let row = WorkDataChangesDB {
            email,
            work_id: patch.work_id,
            quality_of_sleep: patch.quality_of_sleep,
            physical_activity_level: patch.physical_activity_level,
            stress_level: patch.stress_level,
            synced: UNSYNCED,
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(work_data::table)
                    .values(&row)
                    .on_conflict(work_data::email)
                    .do_update()
                    .set((&row, work_data::version.eq(work_data::version + 1)))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    pub async fn save_feedback(&self, email: &str, body: &str) -> Result<()> {
        let row = NewFeedbackRowDB {
            email: require_email(email)?,
            body: body.to_string(),
            created_at: now_naive(),
            synced: UNSYNCED,
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(feedback::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    /// Merges into the `(email, date)` row; the date defaults to today.
    pub async fn save_daily(&self, request: SyncDailyRequest) -> Result<()> {
        require_email(&request.email)?;
        let (key, patch) = request.to_key_and_patch(LOCAL_POLICY, today());
        let row = DailyChangesDB {
            email: key.email,
            date: key.date,
            upper_pressure: patch.upper_pressure,
            lower_pressure: patch.lower_pressure,
            daily_steps: patch.daily_steps,
            heart_rate: patch.heart_rate,
            duration: patch.duration,
            prediction_result: patch.prediction_result,
            synced: UNSYNCED,
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| upsert_daily_row(conn, &row))
            .await
    }

    /// Stores the session and carries its duration onto the daily row of the
    /// night it started.
    pub async fn save_sleep_record(&self, request: SleepRecordRequest) -> Result<()> {
        let session = request.to_session()?;
        let record = NewSleepRecordRowDB {
            email: session.email.clone(),
            sleep_time: session.sleep_time,
            wake_time: session.wake_time,
            synced: UNSYNCED,
        };
        let day = DailyChangesDB {
            email: session.email,
            date: session.sleep_date,
            upper_pressure: None,
            lower_pressure: None,
            daily_steps: None,
            heart_rate: None,
            duration: Some(session.duration),
            prediction_result: None,
            synced: UNSYNCED,
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(sleep_records::table)
                    .values(&record)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                upsert_daily_row(conn, &day)
            })
            .await
    }

    pub async fn save_prediction(
        &self,
        period: PredictionPeriod,
        email: &str,
        label: PredictionLabel,
    ) -> Result<()> {
        let email = require_email(email)?;
        let label = label.as_str().to_string();
        let created_at = now_naive();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                match period {
                    PredictionPeriod::Weekly => diesel::insert_into(weekly_predictions::table)
                        .values((
                            weekly_predictions::email.eq(&email),
                            weekly_predictions::prediction_result.eq(&label),
                            weekly_predictions::created_at.eq(created_at),
                            weekly_predictions::synced.eq(UNSYNCED),
                        ))
                        .execute(conn),
                    PredictionPeriod::Monthly => diesel::insert_into(monthly_predictions::table)
                        .values((
                            monthly_predictions::email.eq(&email),
                            monthly_predictions::prediction_result.eq(&label),
                            monthly_predictions::created_at.eq(created_at),
                            monthly_predictions::synced.eq(UNSYNCED),
                        ))
                        .execute(conn),
                }
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    pub async fn save_weekly_prediction(&self, email: &str, label: PredictionLabel) -> Result<()> {
        self.save_prediction(PredictionPeriod::Weekly, email, label)
            .await
    }

    pub async fn save_monthly_prediction(&self, email: &str, label: PredictionLabel) -> Result<()> {
        self.save_prediction(PredictionPeriod::Monthly, email, label)
            .await
    }

    /// Removes the account and, through the foreign keys, every child row.
    pub async fn delete_user(&self, email: &str) -> Result<usize> {
        let email = email.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(users::table.filter(users::email.eq(email)))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}

fn buffered<T: serde::Serialize>(
    table: BufferTable,
    id: i32,
    version: i32,
    value: T,
) -> Result<BufferedRow> {
    Ok(BufferedRow {
        table,
        id,
        version,
        payload: serde_json::to_value(value)?,
    })
}

fn prediction_rows(table: BufferTable, rows: Vec<PredictionRowDB>) -> Result<Vec<BufferedRow>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match row.to_request() {
            Some(request) => out.push(buffered(table, row.id, row.version, request)?),
            None => warn!(
                "[Buffer] {} row {} has unknown label '{}', skipping",
                table, row.id, row.prediction_result
            ),
        }
    }
    Ok(out)
}

#[async_trait]
impl LocalBufferTrait for LocalBufferRepository {
    fn list_unsynced(&self, table: BufferTable) -> Result<Vec<BufferedRow>> {
        let mut conn = get_connection(&self.pool)?;
        let conn = &mut conn;

        let rows = match table {
            BufferTable::Users => users::table
                .filter(users::synced.eq(UNSYNCED))
                .order(users::id.asc())
                .select(UserRowDB::as_select())
                .load::<UserRowDB>(conn)
                .map_err(StorageError::from)?
                .into_iter()
                .map(|row| buffered(table, row.id, row.version, SyncUserRequest::from(row)))
                .collect::<Result<Vec<_>>>()?,
            BufferTable::WorkData => work_data::table
                .filter(work_data::synced.eq(UNSYNCED))
                .order(work_data::id.asc())
                .select(WorkDataRowDB::as_select())
                .load::<WorkDataRowDB>(conn)
                .map_err(StorageError::from)?
                .into_iter()
                .map(|row| buffered(table, row.id, row.version, SyncWorkDataRequest::from(row)))
                .collect::<Result<Vec<_>>>()?,
            BufferTable::Feedback => feedback::table
                .filter(feedback::synced.eq(UNSYNCED))
                .order(feedback::id.asc())
                .select(FeedbackRowDB::as_select())
                .load::<FeedbackRowDB>(conn)
                .map_err(StorageError::from)?
                .into_iter()
                .map(|row| buffered(table, row.id, row.version, SyncFeedbackRequest::from(row)))
                .collect::<Result<Vec<_>>>()?,
            BufferTable::Daily => daily::table
                .filter(daily::synced.eq(UNSYNCED))
                .order(daily::id.asc())
                .select(DailyRowDB::as_select())
                .load::<DailyRowDB>(conn)
                .map_err(StorageError::from)?
                .into_iter()
                .map(|row| buffered(table, row.id, row.version, SyncDailyRequest::from(row)))
                .collect::<Result<Vec<_>>>()?,
            BufferTable::SleepRecords => sleep_records::table
                .filter(sleep_records::synced.eq(UNSYNCED))
                .order(sleep_records::id.asc())
                .select(SleepRecordRowDB::as_select())
                .load::<SleepRecordRowDB>(conn)
                .map_err(StorageError::from)?
                .into_iter()
                .map(|row| buffered(table, row.id, row.version, SleepRecordRequest::from(row)))
                .collect::<Result<Vec<_>>>()?,
            BufferTable::WeeklyPredictions => {
                let rows = weekly_predictions::table
                    .filter(weekly_predictions::synced.eq(UNSYNCED))
                    .order(weekly_predictions::id.asc())
                    .load::<PredictionRowDB>(conn)
                    .map_err(StorageError::from)?;
                prediction_rows(table, rows)?
            }
            BufferTable::MonthlyPredictions => {
                let rows = monthly_predictions::table
                    .filter(monthly_predictions::synced.eq(UNSYNCED))
                    .order(monthly_predictions::id.asc())
                    .load::<PredictionRowDB>(conn)
                    .map_err(StorageError::from)?;
                prediction_rows(table, rows)?
            }
        };
        Ok(rows)
    }

    async fn mark_synced(&self, row: &BufferedRow) -> Result<bool> {
        let (table, id, version) = (row.table, row.id, row.version);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let flagged = match table {
                    BufferTable::Users => diesel::update(
                        users::table.filter(users::id.eq(id).and(users::version.eq(version))),
                    )
                    .set(users::synced.eq(SYNCED))
                    .execute(conn),
                    BufferTable::WorkData => diesel::update(
                        work_data::table
                            .filter(work_data::id.eq(id).and(work_data::version.eq(version))),
                    )
                    .set(work_data::synced.eq(SYNCED))
                    .execute(conn),
                    BufferTable::Feedback => diesel::update(
                        feedback::table
                            .filter(feedback::id.eq(id).and(feedback::version.eq(version))),
                    )
                    .set(feedback::synced.eq(SYNCED))
                    .execute(conn),
                    BufferTable::Daily => diesel::update(
                        daily::table.filter(daily::id.eq(id).and(daily::version.eq(version))),
                    )
                    .set(daily::synced.eq(SYNCED))
                    .execute(conn),
                    BufferTable::SleepRecords => diesel::update(
                        sleep_records::table.filter(
                            sleep_records::id
                                .eq(id)
                                .and(sleep_records::version.eq(version)),
                        ),
                    )
                    .set(sleep_records::synced.eq(SYNCED))
                    .execute(conn),
                    BufferTable::WeeklyPredictions => diesel::update(
                        weekly_predictions::table.filter(
                            weekly_predictions::id
                                .eq(id)
                                .and(weekly_predictions::version.eq(version)),
                        ),
                    )
                    .set(weekly_predictions::synced.eq(SYNCED))
                    .execute(conn),
                    BufferTable::MonthlyPredictions => diesel::update(
                        monthly_predictions::table.filter(
                            monthly_predictions::id
                                .eq(id)
                                .and(monthly_predictions::version.eq(version)),
                        ),
                    )
                    .set(monthly_predictions::synced.eq(SYNCED))
                    .execute(conn),
                }
                .map_err(StorageError::from)?;
                Ok(flagged > 0)
            })
            .await
    }

    fn count_unsynced(&self, table: BufferTable) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let conn = &mut conn;
        let count = match table {
            BufferTable::Users => users::table
                .filter(users::synced.eq(UNSYNCED))
                .count()
                .get_result::<i64>(conn),
            BufferTable::WorkData => work_data::table
                .filter(work_data::synced.eq(UNSYNCED))
                .count()
                .get_result::<i64>(conn),
            BufferTable::Feedback => feedback::table
                .filter(feedback::synced.eq(UNSYNCED))
                .count()
                .get_result::<i64>(conn),
            BufferTable::Daily => daily::table
                .filter(daily::synced.eq(UNSYNCED))
                .count()
                .get_result::<i64>(conn),
            BufferTable::SleepRecords => sleep_records::table
                .filter(sleep_records::synced.eq(UNSYNCED))
                .count()
                .get_result::<i64>(conn),
            BufferTable::WeeklyPredictions => weekly_predictions::table
                .filter(weekly_predictions::synced.eq(UNSYNCED))
                .count()
                .get_result::<i64>(conn),
            BufferTable::MonthlyPredictions => monthly_predictions::table
                .filter(monthly_predictions::synced.eq(UNSYNCED))
                .count()
                .get_result::<i64>(conn),
        }
        .map_err(StorageError::from)?;
        Ok(count)
    }
}
