//! Profile authority endpoints: registration, profile edits, health metrics
//! and feedback.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use sleepsync_core::profiles::{
    Account, AccountSummary, BloodPressureRequest, DailyStepsRequest, HeartRateRequest,
    ProfileFieldRequest, RegisterRequest, RegisterResponse, SubmitFeedbackRequest, UserProfile,
};
use sleepsync_core::reconcile::MessageResponse;
use tracing::debug;

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::main_lib::AppState;

async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    debug!("Registering {}", req.email);
    Ok(Json(state.profiles()?.register(req).await?))
}

async fn get_user_profile(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    debug!("Fetching profile for {}", email);
    Ok(Json(state.profiles()?.get_profile(&email)?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ProfileFieldRequest>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.profiles()?.update_profile(req).await?))
}

async fn save_name(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ProfileFieldRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.profiles()?.save_name(req).await?))
}

async fn save_gender(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ProfileFieldRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.profiles()?.save_gender(req).await?))
}

async fn save_date_of_birth(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ProfileFieldRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.profiles()?.save_date_of_birth(req).await?))
}

async fn save_weight(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ProfileFieldRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.profiles()?.save_weight(req).await?))
}

async fn save_height(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ProfileFieldRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.profiles()?.save_height(req).await?))
}

async fn save_work(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ProfileFieldRequest>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.profiles()?.save_work(req).await?))
}

async fn save_blood_pressure(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<BloodPressureRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.profiles()?.save_blood_pressure(req).await?))
}

async fn save_daily_steps(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<DailyStepsRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.profiles()?.save_daily_steps(req).await?))
}

async fn save_heart_rate(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<HeartRateRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.profiles()?.save_heart_rate(req).await?))
}

async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SubmitFeedbackRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.profiles()?.submit_feedback(req).await?))
}

async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<AccountSummary>>> {
    Ok(Json(state.profiles()?.list_accounts()?))
}

async fn user_detail(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> ApiResult<Json<Account>> {
    Ok(Json(state.profiles()?.get_account_detail(&email)?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Accounts
        .route("/register/", post(register))
        .route("/user-profile/:email", get(get_user_profile))
        .route("/user-profile/update", put(update_profile))
        // Single-field edits
        .route("/save-name/", put(save_name))
        .route("/save-gender/", put(save_gender))
        .route("/save-dob/", put(save_date_of_birth))
        .route("/save-weight/", put(save_weight))
        .route("/save-height/", put(save_height))
        .route("/save-work/", put(save_work))
        // Health metrics (propagated to the time-series authority)
        .route("/save-blood-pressure/", put(save_blood_pressure))
        .route("/save-daily-steps/", put(save_daily_steps))
        .route("/save-heart-rate/", put(save_heart_rate))
        // Feedback and admin listing
        .route("/submit-feedback/", post(submit_feedback))
        .route("/api/users/", get(list_users))
        .route("/api/user/detail/:email", get(user_detail))
}
