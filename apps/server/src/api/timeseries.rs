//! Time-series authority endpoints: sleep records, saved labels and the
//! weekly/monthly sleep summaries.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sleepsync_core::reconcile::MessageResponse;
use sleepsync_core::timeseries::{
    MonthlySleepSummary, PredictionHistoryEntry, PredictionPeriod, SavePredictionRequest,
    SleepHistoryItem, SleepRecordRequest, WeeklySleepSummary,
};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::main_lib::AppState;

#[derive(Debug, Deserialize)]
struct WeekQuery {
    start_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
struct MonthQuery {
    month: u32,
    year: i32,
}

fn parse_query_date(name: &str, raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("{} must be YYYY-MM-DD, got '{}'", name, raw)))
}

async fn save_sleep_record(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SleepRecordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.timeseries()?.save_sleep_record(req).await?))
}

async fn get_sleep_records(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<SleepHistoryItem>>> {
    Ok(Json(state.timeseries()?.sleep_history(&email)?))
}

async fn weekly_sleep_data(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
    ApiQuery(query): ApiQuery<WeekQuery>,
) -> ApiResult<Json<WeeklySleepSummary>> {
    let start = parse_query_date("start_date", &query.start_date)?;
    let end = parse_query_date("end_date", &query.end_date)?;
    if end < start {
        return Err(ApiError::BadRequest(
            "end_date must not be before start_date".to_string(),
        ));
    }
    debug!("Weekly sleep summary for {} ({} .. {})", email, start, end);
    Ok(Json(
        state
            .timeseries()?
            .weekly_sleep_summary(&email, start, end)?,
    ))
}

async fn monthly_sleep_data(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
    ApiQuery(query): ApiQuery<MonthQuery>,
) -> ApiResult<Json<MonthlySleepSummary>> {
    debug!(
        "Monthly sleep summary for {} ({}-{:02})",
        email, query.year, query.month
    );
    Ok(Json(state.timeseries()?.monthly_sleep_summary(
        &email,
        query.year,
        query.month,
    )?))
}

async fn save_prediction(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SavePredictionRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.timeseries()?.save_prediction(req).await?))
}

async fn prediction_history(
    State(state): State<Arc<AppState>>,
    Path((period, email)): Path<(PredictionPeriod, String)>,
) -> ApiResult<Json<Vec<PredictionHistoryEntry>>> {
    Ok(Json(state.timeseries()?.list_predictions(period, &email)?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Sleep records
        .route("/save-sleep-record/", post(save_sleep_record))
        .route("/get-sleep-records/:email", get(get_sleep_records))
        .route("/get-weekly-sleep-data/:email", get(weekly_sleep_data))
        .route("/get-monthly-sleep-data/:email", get(monthly_sleep_data))
        // Labels
        .route("/save_prediction", post(save_prediction))
        .route("/predictions/:period/:email", get(prediction_history))
}
