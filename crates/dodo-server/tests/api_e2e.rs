//! End-to-end tests against a live server on an ephemeral port.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use dodo_core::{Authenticator, Config, Database};
use dodo_server::{router, AppState};

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

async fn spawn_app() -> String {
    let db = Database::open_memory().unwrap();
    let tokens = HashMap::from([
        (ALICE.to_string(), "alice".to_string()),
        (BOB.to_string(), "bob".to_string()),
    ]);
    let state = AppState::new(db, Authenticator::from_tokens(tokens), Config::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn body(resp: reqwest::Response) -> Value {
    resp.json().await.unwrap()
}

async fn create_daily_habit(client: &Client, base: &str, token: &str) -> Value {
    let resp = client
        .post(format!("{base}/api/habits"))
        .bearer_auth(token)
        .json(&json!({ "title": "Stretch", "frequencyType": "daily" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body(resp).await["habit"].clone()
}

#[tokio::test]
async fn root_and_health_are_public() {
    let base = spawn_app().await;
    let client = Client::new();

    let root = body(client.get(&base).send().await.unwrap()).await;
    assert_eq!(root["name"], "dodo-api");

    let health = body(client.get(format!("{base}/api/health")).send().await.unwrap()).await;
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let base = spawn_app().await;
    let client = Client::new();

    let resp = client.get(format!("{base}/api/habits")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(resp).await["error"], "Missing bearer token.");

    let resp = client
        .get(format!("{base}/api/habits"))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(resp).await["error"], "Invalid or expired token.");
}

#[tokio::test]
async fn complete_uncomplete_round_trip_moves_xp() {
    let base = spawn_app().await;
    let client = Client::new();
    let habit = create_daily_habit(&client, &base, ALICE).await;
    let id = habit["id"].as_str().unwrap();
    let today = Utc::now().date_naive().to_string();

    let first = body(
        client
            .post(format!("{base}/api/habits/{id}/complete"))
            .bearer_auth(ALICE)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(first["completion"]["completed"], true);
    assert_eq!(first["completion"]["date"], today.as_str());
    assert_eq!(first["habit"]["currentStreak"], 1);
    let awarded = first["completion"]["xpDelta"].as_i64().unwrap();
    assert!(awarded > 0);
    assert_eq!(first["progress"]["experiencePoints"].as_i64(), Some(awarded));

    // Completing the same day again changes nothing.
    let again = body(
        client
            .post(format!("{base}/api/habits/{id}/complete"))
            .bearer_auth(ALICE)
            .json(&json!({ "date": today }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(again["completion"]["xpDelta"], 0);

    let history = body(
        client
            .get(format!("{base}/api/habits/history?habitId={id}"))
            .bearer_auth(ALICE)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(history["history"].as_array().unwrap().len(), 1);

    let undone = body(
        client
            .delete(format!("{base}/api/habits/{id}/complete?date={today}"))
            .bearer_auth(ALICE)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(undone["completion"]["completed"], false);
    assert_eq!(undone["completion"]["xpDelta"].as_i64(), Some(-awarded));
    assert_eq!(undone["habit"]["currentStreak"], 0);

    let profile = body(
        client
            .get(format!("{base}/api/profile"))
            .bearer_auth(ALICE)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(profile["profile"]["userId"], "alice");
    assert_eq!(profile["profile"]["experiencePoints"], 0);
    assert_eq!(profile["profile"]["level"], 1);
}

#[tokio::test]
async fn completion_before_the_anchor_is_rejected() {
    let base = spawn_app().await;
    let client = Client::new();
    let habit = create_daily_habit(&client, &base, ALICE).await;
    let id = habit["id"].as_str().unwrap();
    let yesterday = (Utc::now().date_naive() - Duration::days(1)).to_string();

    let resp = client
        .post(format!("{base}/api/habits/{id}/complete"))
        .bearer_auth(ALICE)
        .json(&json!({ "date": yesterday }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await["error"], "Habit does not apply on this date.");
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let base = spawn_app().await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/api/habits"))
        .bearer_auth(ALICE)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await["error"], "Invalid request payload.");

    let resp = client
        .post(format!("{base}/api/habits"))
        .bearer_auth(ALICE)
        .json(&json!({ "title": "Run", "frequencyType": "interval" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(resp).await["error"],
        "intervalDays is required for interval habits."
    );
}

#[tokio::test]
async fn habits_are_scoped_to_their_owner() {
    let base = spawn_app().await;
    let client = Client::new();
    let habit = create_daily_habit(&client, &base, ALICE).await;
    let id = habit["id"].as_str().unwrap();

    let resp = client
        .patch(format!("{base}/api/habits/{id}"))
        .bearer_auth(BOB)
        .json(&json!({ "title": "Mine now" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(resp).await["error"], "Habit not found.");

    let bob_list = body(
        client
            .get(format!("{base}/api/habits"))
            .bearer_auth(BOB)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert!(bob_list["habits"].as_array().unwrap().is_empty());

    let resp = client
        .delete(format!("{base}/api/habits/{id}"))
        .bearer_auth(ALICE)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn timer_start_and_pause_show_on_the_habit() {
    let base = spawn_app().await;
    let client = Client::new();
    let habit = create_daily_habit(&client, &base, ALICE).await;
    let id = habit["id"].as_str().unwrap();

    let started = body(
        client
            .post(format!("{base}/api/habits/{id}/start"))
            .bearer_auth(ALICE)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert!(started["habit"]["timerStartedAt"].is_string());

    let paused = body(
        client
            .post(format!("{base}/api/habits/{id}/pause"))
            .bearer_auth(ALICE)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert!(paused["habit"]["timerStartedAt"].is_null());
}

#[tokio::test]
async fn task_and_category_flow() {
    let base = spawn_app().await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/api/categories"))
        .bearer_auth(ALICE)
        .json(&json!({ "name": "Work" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let category = body(resp).await["category"].clone();
    let category_id = category["id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{base}/api/tasks"))
        .bearer_auth(ALICE)
        .json(&json!({
            "title": "Write report",
            "categoryId": category_id,
            "scheduledAt": "2099-01-01T09:00:00Z",
            "deadline": "2099-01-01T17:00:00Z",
            "priority": 3
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task = body(resp).await["task"].clone();
    let task_id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["completed"], false);

    let listed = body(
        client
            .get(format!("{base}/api/tasks?date=2099-01-01"))
            .bearer_auth(ALICE)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(listed["tasks"].as_array().unwrap().len(), 1);

    let resp = client
        .get(format!(
            "{base}/api/tasks?date=2099-01-01&startAt=2099-01-01T00:00:00Z&endAt=2099-01-02T00:00:00Z"
        ))
        .bearer_auth(ALICE)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(resp).await["error"],
        "Use either date or startAt/endAt filters, not both."
    );

    let done = body(
        client
            .patch(format!("{base}/api/tasks/{task_id}"))
            .bearer_auth(ALICE)
            .json(&json!({ "completed": true }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(done["task"]["completed"], true);
    assert!(done["progress"]["experiencePoints"].as_i64().unwrap() > 0);

    let resp = client
        .delete(format!("{base}/api/categories/{category_id}"))
        .bearer_auth(ALICE)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let listed = body(
        client
            .get(format!("{base}/api/tasks"))
            .bearer_auth(ALICE)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert!(listed["tasks"][0]["categoryId"].is_null());

    let resp = client
        .delete(format!("{base}/api/tasks/{task_id}"))
        .bearer_auth(ALICE)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .patch(format!("{base}/api/tasks/{task_id}"))
        .bearer_auth(ALICE)
        .json(&json!({ "completed": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(resp).await["error"], "Task not found.");
}
