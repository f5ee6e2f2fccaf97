mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use sleepsync_core::propagation::{drain_propagation_outbox, PropagationStatus};
use sleepsync_core::timeseries::{
    DailyKey, PredictionFeatures, PredictionLabel, SleepClassifier, TimeSeriesRepositoryTrait,
};
use sleepsync_core::utils::time_utils::today;
use sleepsync_server::{app_router, build_state, build_state_with_classifier};
use tempfile::tempdir;

use common::{config, send, serve};

fn today_key(email: &str) -> DailyKey {
    DailyKey {
        email: email.to_string(),
        date: today(),
    }
}

/// Flags short sleepers as insomniac.
struct ShortSleepClassifier;

impl SleepClassifier for ShortSleepClassifier {
    fn classify(&self, features: &PredictionFeatures) -> sleepsync_core::Result<PredictionLabel> {
        Ok(if features.sleep_duration < 6.0 {
            PredictionLabel::Insomnia
        } else {
            PredictionLabel::Normal
        })
    }
}

#[tokio::test]
async fn blood_pressure_reaches_the_timeseries_authority() {
    let dir = tempdir().unwrap();
    let timeseries = build_state(config("timeseries", dir.path(), &[])).unwrap();
    let timeseries_url = serve(timeseries.clone()).await;

    let profile = build_state(config(
        "profile",
        dir.path(),
        &[("SLEEPSYNC_TIMESERIES_URL", timeseries_url)],
    ))
    .unwrap();
    let app = app_router(profile);

    let (status, _) = send(
        &app,
        Method::POST,
        "/register/",
        Some(json!({"email": "ana@example.com", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/save-blood-pressure/",
        Some(json!({"email": "ana@example.com", "upperPressure": 120, "lowerPressure": 80})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (_, profile) = send(&app, Method::GET, "/user-profile/ana@example.com", None).await;
    assert_eq!(profile["upper_pressure"], 120);
    assert_eq!(profile["lower_pressure"], 80);

    let row = timeseries
        .timeseries_store
        .as_ref()
        .unwrap()
        .get_daily(&today_key("ana@example.com"))
        .unwrap()
        .expect("propagated daily row");
    assert_eq!(row.upper_pressure, Some(120));
    assert_eq!(row.lower_pressure, Some(80));
    assert_eq!(row.heart_rate, None);
}

#[tokio::test]
async fn unreachable_timeseries_authority_does_not_fail_the_write() {
    let dir = tempdir().unwrap();
    let profile = build_state(config(
        "profile",
        dir.path(),
        &[
            ("SLEEPSYNC_TIMESERIES_URL", "http://127.0.0.1:9".to_string()),
            ("SLEEPSYNC_PROPAGATION_TIMEOUT_SECS", "1".to_string()),
        ],
    ))
    .unwrap();
    let app = app_router(profile);
    send(
        &app,
        Method::POST,
        "/register/",
        Some(json!({"email": "ana@example.com", "password": "pw"})),
    )
    .await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/save-heart-rate/",
        Some(json!({"email": "ana@example.com", "heartRate": 58})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, profile) = send(&app, Method::GET, "/user-profile/ana@example.com", None).await;
    assert_eq!(profile["heart_rate"], 58);
}

#[tokio::test]
async fn durable_mode_queues_until_the_outbox_drains() {
    let dir = tempdir().unwrap();
    let timeseries = build_state(config("timeseries", dir.path(), &[])).unwrap();
    let timeseries_url = serve(timeseries.clone()).await;

    let profile = build_state(config(
        "profile",
        dir.path(),
        &[
            ("SLEEPSYNC_TIMESERIES_URL", timeseries_url),
            ("SLEEPSYNC_PROPAGATION_MODE", "durable".to_string()),
        ],
    ))
    .unwrap();
    let app = app_router(profile.clone());
    send(
        &app,
        Method::POST,
        "/register/",
        Some(json!({"email": "ana@example.com", "password": "pw"})),
    )
    .await;
    let (status, _) = send(
        &app,
        Method::PUT,
        "/save-daily-steps/",
        Some(json!({"email": "ana@example.com", "dailySteps": 8000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let outbox = profile.propagation_outbox.clone().expect("durable outbox");
    let store = timeseries.timeseries_store.clone().unwrap();
    assert_eq!(outbox.count_by_status(PropagationStatus::Pending).unwrap(), 1);
    assert!(store.get_daily(&today_key("ana@example.com")).unwrap().is_none());

    let propagator = profile.propagator.clone().unwrap();
    let report = drain_propagation_outbox(outbox.as_ref(), propagator.as_ref(), 10)
        .await
        .unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(outbox.count_by_status(PropagationStatus::Sent).unwrap(), 1);

    let row = store
        .get_daily(&today_key("ana@example.com"))
        .unwrap()
        .expect("drained daily row");
    assert_eq!(row.daily_steps, Some(8000));
}

#[tokio::test]
async fn predict_reads_the_remote_profile_and_labels_today() {
    let dir = tempdir().unwrap();
    let profile = build_state(config("profile", dir.path(), &[])).unwrap();
    let profile_url = serve(profile).await;

    let timeseries = build_state_with_classifier(
        config(
            "timeseries",
            dir.path(),
            &[("SLEEPSYNC_PROFILE_URL", profile_url.clone())],
        ),
        Some(Arc::new(ShortSleepClassifier)),
    )
    .unwrap();
    let app = app_router(timeseries.clone());

    push_user_row(&profile_url).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/predict",
        Some(json!({"email": "nobody@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &app,
        Method::POST,
        "/save-sleep-record/",
        Some(json!({
            "email": "ana@example.com",
            "sleep_time": "2024-05-06T01:00:00",
            "wake_time": "2024-05-06T05:00:00",
        })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/predict",
        Some(json!({"email": "ana@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"prediction": "Insomnia"}));

    let row = timeseries
        .timeseries_store
        .as_ref()
        .unwrap()
        .get_daily(&today_key("ana@example.com"))
        .unwrap()
        .expect("labelled daily row");
    assert_eq!(row.prediction_result, Some(PredictionLabel::Insomnia.code()));
    assert_eq!(row.duration, 4.0);
}

/// Creates `ana@example.com` through the `sync_users` receiver, the way the agent would.
async fn push_user_row(profile_url: &str) {
    use sleepsync_core::sync::{BufferTable, BufferedRow, SyncTransport};
    use sleepsync_sync_client::{SyncApiClient, SyncEndpoints};

    let client = SyncApiClient::new(
        SyncEndpoints::new(Some(profile_url.to_string()), None),
        std::time::Duration::from_secs(5),
    )
    .unwrap();
    let row = BufferedRow {
        table: BufferTable::Users,
        id: 1,
        version: 0,
        payload: json!({"email": "ana@example.com", "gender": 1, "age": 29}),
    };
    client.deliver(&row).await.expect("user row delivered");
}
