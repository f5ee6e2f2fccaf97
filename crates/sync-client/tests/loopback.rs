use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use sleepsync_core::propagation::{DailyMetricPush, DailyMetricsPropagator};
use sleepsync_core::sync::{BufferTable, BufferedRow, SyncTransport};
use sleepsync_core::timeseries::ProfileSource;
use sleepsync_core::Error;
use sleepsync_sync_client::{SyncApiClient, SyncEndpoints};

type Received = Arc<Mutex<Vec<(String, Value)>>>;

async fn spawn_receiver(received: Received) -> String {
    let record = |path: &'static str| {
        move |State(received): State<Received>, Json(body): Json<Value>| async move {
            received.lock().unwrap().push((path.to_string(), body));
            Json(json!({ "message": "ok" }))
        }
    };

    let app = Router::new()
        .route("/sync_users", post(record("/sync_users")))
        .route("/sync_daily", post(record("/sync_daily")))
        .route(
            "/sync_feedback",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "database is down" })),
                )
            }),
        )
        .route(
            "/user-profile/:email",
            get(|Path(email): Path<String>| async move {
                if email == "ana@example.com" {
                    Ok(Json(json!({
                        "id": 1,
                        "email": email,
                        "role": "user",
                        "name": "Ana",
                        "gender": 0,
                        "work": "nurse",
                        "date_of_birth": null,
                        "age": 34,
                        "weight": 60.0,
                        "height": 165.0,
                        "upper_pressure": 118,
                        "lower_pressure": 76,
                        "daily_steps": null,
                        "heart_rate": 64,
                        "work_id": 5,
                        "quality_of_sleep": 6.0,
                        "physical_activity_level": 40.0,
                        "stress_level": 4.0
                    })))
                } else {
                    Err((StatusCode::NOT_FOUND, Json(json!({ "detail": "User not found" }))))
                }
            }),
        )
        .with_state(received);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base: &str) -> SyncApiClient {
    SyncApiClient::new(
        SyncEndpoints::new(Some(base.to_string()), Some(base.to_string())),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn rows_are_routed_to_their_receivers() {
    let received = Received::default();
    let base = spawn_receiver(received.clone()).await;
    let client = client(&base);

    client
        .deliver(&BufferedRow {
            table: BufferTable::Users,
            id: 1,
            version: 0,
            payload: json!({ "email": "ana@example.com", "name": "Ana" }),
        })
        .await
        .unwrap();
    client
        .push_daily(&DailyMetricPush {
            email: "ana@example.com".into(),
            date: "2024-05-01".into(),
            upper_pressure: Some(120),
            lower_pressure: Some(80),
            daily_steps: None,
            heart_rate: None,
        })
        .await
        .unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received[0].0, "/sync_users");
    assert_eq!(received[1].0, "/sync_daily");
    assert_eq!(received[1].1["upper_pressure"], 120);
    assert!(received[1].1.get("heart_rate").is_none());
}

#[tokio::test]
async fn non_success_status_surfaces_remote_error_with_detail() {
    let base = spawn_receiver(Received::default()).await;
    let err = client(&base)
        .deliver(&BufferedRow {
            table: BufferTable::Feedback,
            id: 7,
            version: 0,
            payload: json!({ "email": "ana@example.com", "feedback": "hi" }),
        })
        .await
        .unwrap_err();
    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database is down");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn profile_lookup_maps_404_to_none() {
    let base = spawn_receiver(Received::default()).await;
    let client = client(&base);

    let profile = client.fetch_profile("ana@example.com").await.unwrap().unwrap();
    assert_eq!(profile.account.heart_rate, Some(64));
    assert_eq!(profile.work_id, Some(5));
    assert!(client.fetch_profile("ghost@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn unreachable_receiver_is_a_network_error() {
    let client = client("http://127.0.0.1:9");
    let err = client
        .deliver(&BufferedRow {
            table: BufferTable::Daily,
            id: 1,
            version: 0,
            payload: json!({ "email": "ana@example.com" }),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)));
}
