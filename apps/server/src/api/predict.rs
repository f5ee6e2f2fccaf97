//! Classification and majority-vote aggregation over daily labels.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use sleepsync_core::timeseries::{
    EmailRequest, PredictionLabel, PredictionPeriod, PredictionResponse,
};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::main_lib::AppState;

#[derive(Debug, Serialize)]
pub struct WeeklyPredictionResponse {
    pub weekly_prediction: PredictionLabel,
}

#[derive(Debug, Serialize)]
pub struct MonthlyPredictionResponse {
    pub monthly_prediction: PredictionLabel,
}

fn require_email(req: &EmailRequest) -> ApiResult<&str> {
    let email = req.email.trim();
    if email.is_empty() {
        return Err(ApiError::BadRequest("email is required".to_string()));
    }
    Ok(email)
}

async fn predict(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> ApiResult<Json<PredictionResponse>> {
    let email = require_email(&req)?;
    let response = state.timeseries()?.predict(email).await?;
    info!("Prediction for {}: {}", email, response.prediction);
    Ok(Json(response))
}

async fn weekly_predict(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> ApiResult<Json<WeeklyPredictionResponse>> {
    let email = require_email(&req)?;
    let label = state
        .timeseries()?
        .aggregate_prediction(PredictionPeriod::Weekly, email)?;
    Ok(Json(WeeklyPredictionResponse {
        weekly_prediction: label,
    }))
}

async fn monthly_predict(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> ApiResult<Json<MonthlyPredictionResponse>> {
    let email = require_email(&req)?;
    let label = state
        .timeseries()?
        .aggregate_prediction(PredictionPeriod::Monthly, email)?;
    Ok(Json(MonthlyPredictionResponse {
        monthly_prediction: label,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/predict", post(predict))
        .route("/weekly_predict", post(weekly_predict))
        .route("/monthly_predict", post(monthly_predict))
}
