//! Receivers for rows pushed by the offline sync agent. Every receiver is an
//! idempotent upsert on the row's natural key.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use sleepsync_core::profiles::{SyncFeedbackRequest, SyncUserRequest, SyncWorkDataRequest};
use sleepsync_core::reconcile::MessageResponse;
use sleepsync_core::timeseries::{
    PredictionPeriod, SleepRecordRequest, SyncDailyRequest, SyncPredictionRequest,
};
use tracing::debug;

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::main_lib::AppState;

async fn sync_users(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SyncUserRequest>,
) -> ApiResult<Json<MessageResponse>> {
    debug!("[Reconcile] sync_users for {}", req.email);
    Ok(Json(state.profiles()?.sync_user(req).await?))
}

async fn sync_work_data(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SyncWorkDataRequest>,
) -> ApiResult<Json<MessageResponse>> {
    debug!("[Reconcile] sync_work_data for {}", req.email);
    Ok(Json(state.profiles()?.sync_work_data(req).await?))
}

async fn sync_feedback(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SyncFeedbackRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.profiles()?.sync_feedback(req).await?))
}

async fn sync_daily(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SyncDailyRequest>,
) -> ApiResult<Json<MessageResponse>> {
    debug!("[Reconcile] sync_daily for {} on {:?}", req.email, req.date);
    Ok(Json(state.timeseries()?.sync_daily(req).await?))
}

async fn sync_sleep_records(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SleepRecordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.timeseries()?.sync_sleep_record(req).await?))
}

async fn sync_weekly_predictions(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SyncPredictionRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(
        state
            .timeseries()?
            .sync_prediction(PredictionPeriod::Weekly, req)
            .await?,
    ))
}

async fn sync_monthly_predictions(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SyncPredictionRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(
        state
            .timeseries()?
            .sync_prediction(PredictionPeriod::Monthly, req)
            .await?,
    ))
}

pub fn profile_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync_users", post(sync_users))
        .route("/sync_work_data", post(sync_work_data))
        .route("/sync_feedback", post(sync_feedback))
}

pub fn timeseries_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync_daily", post(sync_daily))
        .route("/sync_sleep_records", post(sync_sleep_records))
        .route("/sync_weekly_predictions", post(sync_weekly_predictions))
        .route("/sync_monthly_predictions", post(sync_monthly_predictions))
}
