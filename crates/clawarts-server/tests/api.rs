//! Integration tests for the HTTP API
//!
//! Every test builds a fresh in-memory app and drives it through the router.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use clawarts_server::config::{AppConfig, MissingParticipantPolicy};
use clawarts_server::{create_app, AppState};

const SYNC_KEY: &str = "test-secret";

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.board.sync_key = Some(SYNC_KEY.to_string());
    config
}

fn app_with(config: AppConfig) -> Router {
    create_app(AppState::in_memory(config).unwrap())
}

fn app() -> Router {
    app_with(test_config())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn post_with_key(app: &Router, uri: &str, key: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::post(uri).header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("x-tick-key", key);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

fn assert_close(value: &Value, expected: f64) {
    let actual = value.as_f64().unwrap_or_else(|| panic!("not a number: {}", value));
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

async fn fund(app: &Router, round: &str, idea: &str, funder: &str, amount: f64, direction: &str) -> StatusCode {
    let (status, _) = post(
        app,
        "/api/clawarts/fund",
        json!({
            "roundId": round,
            "ideaId": idea,
            "funder": funder,
            "amount": amount,
            "direction": direction,
        }),
    )
    .await;
    status
}

async fn submit_idea(app: &Router, round: &str, title: &str) -> String {
    let (status, body) = post(
        app,
        "/api/clawarts/idea",
        json!({ "roundId": round, "title": title, "submittedBy": "agent" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["ideaId"].as_str().unwrap().to_string()
}

/// World with round R: I1 wins, I2 loses with 100 believed by A,
/// B/C believe I1 with 60/40 and D challenges I1 with 20.
async fn example_round(app: &Router) -> (String, String) {
    assert_eq!(post(app, "/api/clawarts/init", json!({})).await.0, StatusCode::OK);
    let (_, body) = post(app, "/api/clawarts/startRound", json!({})).await;
    let round = body["roundId"].as_str().unwrap().to_string();

    for address in ["A", "B", "C", "D"] {
        let (status, _) = post(
            app,
            "/api/clawarts/join",
            json!({ "address": address, "displayName": address }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let i1 = submit_idea(app, &round, "Winner").await;
    let i2 = submit_idea(app, &round, "Loser").await;

    assert_eq!(fund(app, &round, &i2, "A", 100.0, "believe").await, StatusCode::OK);
    assert_eq!(fund(app, &round, &i1, "B", 60.0, "believe").await, StatusCode::OK);
    assert_eq!(fund(app, &round, &i1, "C", 40.0, "believe").await, StatusCode::OK);
    assert_eq!(fund(app, &round, &i1, "D", 20.0, "challenge").await, StatusCode::OK);

    let (status, _) = post(
        app,
        "/api/clawarts/declareWinner",
        json!({ "roundId": round, "ideaId": i1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (round, i1)
}

async fn total_won(app: &Router, address: &str) -> Value {
    let (status, body) = get(app, &format!("/api/clawarts/participant/{}", address)).await;
    assert_eq!(status, StatusCode::OK);
    body["totalWon"].clone()
}

async fn treasury(app: &Router) -> Value {
    get(app, "/api/clawarts/world").await.1["treasuryDumble"].clone()
}

// ============ Health ============

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["archive"], "disabled");
    assert_eq!(body["store"]["persistent"], false);
}

// ============ Ledger ============

#[tokio::test]
async fn test_world_missing_answers_with_error_body() {
    let app = app();
    let (status, body) = get(&app, "/api/clawarts/world").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "World not initialized");

    let (status, body) = get(&app, "/api/clawarts/round").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "No active round");
}

#[tokio::test]
async fn test_example_round_settles_end_to_end() {
    let app = app();
    let (round, _) = example_round(&app).await;
    assert_close(&treasury(&app).await, 20.0);

    let (status, body) = post(&app, "/api/clawarts/settle", json!({ "roundId": round })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["winningIdea"], "Winner");
    assert_close(&body["losingBelieversPool"], 100.0);
    assert_close(&body["treasuryFee"], 10.0);
    assert_close(&body["rewardPool"], 90.0);
    assert_close(&body["challengerBonus"], 9.0);
    assert_close(&body["believerRewardPool"], 81.0);
    assert_eq!(body["payouts"].as_array().unwrap().len(), 3);

    assert_close(&total_won(&app, "A").await, 0.0);
    assert_close(&total_won(&app, "B").await, 48.6);
    assert_close(&total_won(&app, "C").await, 32.4);
    assert_close(&total_won(&app, "D").await, 9.0);
    assert_close(&treasury(&app).await, 30.0);

    let (_, history) = get(&app, "/api/clawarts/history").await;
    assert_eq!(history["rounds"][0]["phase"], "settled");
    assert!(history["rounds"][0]["endedAt"].is_number());

    let (_, board) = get(&app, "/api/clawarts/leaderboard").await;
    assert_eq!(board["participants"][0]["address"], "B");
}

#[tokio::test]
async fn test_base_unit_scale_stakes_settle_with_json_body() {
    let app = app();
    assert_eq!(post(&app, "/api/clawarts/init", json!({})).await.0, StatusCode::OK);
    let (_, body) = post(&app, "/api/clawarts/startRound", json!({})).await;
    let round = body["roundId"].as_str().unwrap().to_string();
    for address in ["A", "B"] {
        post(&app, "/api/clawarts/join", json!({ "address": address, "displayName": address })).await;
    }
    let i1 = submit_idea(&app, &round, "Winner").await;
    let i2 = submit_idea(&app, &round, "Loser").await;

    assert_eq!(fund(&app, &round, &i2, "A", 1e20, "believe").await, StatusCode::OK);
    assert_eq!(fund(&app, &round, &i1, "B", 1e20, "believe").await, StatusCode::OK);
    post(&app, "/api/clawarts/declareWinner", json!({ "roundId": round, "ideaId": i1 })).await;

    let (status, body) = post(&app, "/api/clawarts/settle", json!({ "roundId": round })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let won = total_won(&app, "B").await.as_f64().unwrap();
    assert!((won - 8.1e19).abs() / 8.1e19 < 1e-9, "unexpected payout {}", won);
}

#[tokio::test]
async fn test_second_settlement_is_rejected() {
    let app = app();
    let (round, _) = example_round(&app).await;

    assert_eq!(
        post(&app, "/api/clawarts/settle", json!({ "roundId": round })).await.0,
        StatusCode::OK
    );
    let (status, body) = post(&app, "/api/clawarts/settle", json!({ "roundId": round })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_SETTLED");

    assert_close(&total_won(&app, "B").await, 48.6);
    assert_close(&treasury(&app).await, 30.0);
}

#[tokio::test]
async fn test_unguarded_second_settlement_applies_twice() {
    let mut config = test_config();
    config.settlement.guard_double_settlement = false;
    let app = app_with(config);
    let (round, _) = example_round(&app).await;

    for _ in 0..2 {
        let (status, _) = post(&app, "/api/clawarts/settle", json!({ "roundId": round })).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_close(&total_won(&app, "B").await, 97.2);
    assert_close(&treasury(&app).await, 40.0);
}

#[tokio::test]
async fn test_settle_without_winner_is_not_found() {
    let app = app();
    post(&app, "/api/clawarts/init", json!({})).await;
    let (_, body) = post(&app, "/api/clawarts/startRound", json!({})).await;

    let (status, body) = post(
        &app,
        "/api/clawarts/settle",
        json!({ "roundId": body["roundId"] }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "WINNER_NOT_FOUND");
}

#[tokio::test]
async fn test_missing_participant_fail_policy_rolls_back() {
    let mut config = test_config();
    config.settlement.missing_participant = MissingParticipantPolicy::Fail;
    let app = app_with(config);

    post(&app, "/api/clawarts/init", json!({})).await;
    let (_, body) = post(&app, "/api/clawarts/startRound", json!({})).await;
    let round = body["roundId"].as_str().unwrap().to_string();
    let idea = submit_idea(&app, &round, "Only").await;

    // Funding by a stranger is refused outright
    let (status, body) = post(
        &app,
        "/api/clawarts/fund",
        json!({
            "roundId": round,
            "ideaId": idea,
            "funder": "stranger",
            "amount": 5,
            "direction": "challenge",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "MISSING_PARTICIPANT");

    // Nothing was written
    assert_close(&treasury(&app).await, 0.0);
    let (_, ideas) = get(&app, &format!("/api/clawarts/ideas?roundId={}", round)).await;
    assert_close(&ideas[0]["totalChallenged"], 0.0);
}

#[tokio::test]
async fn test_fund_validation() {
    let app = app();
    let (status, body) = post(
        &app,
        "/api/clawarts/fund",
        json!({ "roundId": "ROUND-001", "ideaId": "x", "funder": "A", "amount": 1, "direction": "believe" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "WORLD_NOT_INITIALIZED");

    let (round, i1) = example_round(&app).await;
    assert_eq!(fund(&app, &round, &i1, "B", 0.0, "believe").await, StatusCode::BAD_REQUEST);
    assert_eq!(fund(&app, &round, &i1, "B", -3.0, "believe").await, StatusCode::BAD_REQUEST);
    assert_eq!(fund(&app, &round, &i1, "B", 5.0, "sideways").await, StatusCode::BAD_REQUEST);
    assert_eq!(fund(&app, &round, "nope", "B", 5.0, "believe").await, StatusCode::NOT_FOUND);
    assert_eq!(fund(&app, "ROUND-999", &i1, "B", 5.0, "believe").await, StatusCode::NOT_FOUND);

    // Missing field and malformed body are both 400
    let (status, body) = post(&app, "/api/clawarts/fund", json!({ "roundId": round })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let request = Request::post("/api/clawarts/fund")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);

    // Rejected calls left the stake totals alone
    let (_, ideas) = get(&app, &format!("/api/clawarts/ideas?roundId={}", round)).await;
    let winner = ideas
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["id"] == i1.as_str())
        .unwrap();
    assert_close(&winner["totalBelieved"], 100.0);
}

#[tokio::test]
async fn test_funding_settled_round_is_rejected() {
    let app = app();
    let (round, i1) = example_round(&app).await;
    post(&app, "/api/clawarts/settle", json!({ "roundId": round })).await;

    assert_eq!(fund(&app, &round, &i1, "B", 5.0, "believe").await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_round_state_actions() {
    let app = app();
    let (_, body) = get(&app, "/api/clawarts/round/state").await;
    assert_eq!(body["action"], "none");

    post(&app, "/api/clawarts/init", json!({})).await;
    let (_, body) = get(&app, "/api/clawarts/round/state").await;
    assert_eq!(body["action"], "open_round");
    assert_eq!(body["nextRoundId"], "ROUND-001");

    post(&app, "/api/clawarts/startRound", json!({})).await;
    let (_, body) = get(&app, "/api/clawarts/round/state").await;
    assert_eq!(body["action"], "wait");
    assert_eq!(body["roundId"], "ROUND-001");
    assert_eq!(body["expired"], false);

    let (_, active) = get(&app, "/api/clawarts/round/active").await;
    assert_eq!(active["roundId"], "ROUND-001");
    assert!(active["ideas"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_summon_and_characters() {
    let app = app();
    post(&app, "/api/clawarts/init", json!({})).await;
    post(&app, "/api/clawarts/startRound", json!({})).await;

    let (status, body) = post(
        &app,
        "/api/clawarts/summon",
        json!({ "spellWord": "Ab", "roundId": "ROUND-001" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["character"]["spellWord"], "ab");
    assert_eq!(body["character"]["appearances"], 1);

    let (status, _) = post(
        &app,
        "/api/clawarts/updateCharacter",
        json!({ "id": body["characterId"], "name": "Abby" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = get(&app, "/api/clawarts/characters").await;
    assert_eq!(list["characters"][0]["name"], "Abby");
}

#[tokio::test]
async fn test_protected_world_writes_require_key() {
    let mut config = test_config();
    config.board.protect_world_writes = true;
    let app = app_with(config);

    let (status, _) = post_with_key(&app, "/api/clawarts/init", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = post_with_key(&app, "/api/clawarts/init", Some(SYNC_KEY), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // Reads stay public
    assert_eq!(get(&app, "/api/clawarts/world").await.0, StatusCode::OK);
}

// ============ Task board ============

fn sync_body(tasks: Value) -> Value {
    json!({
        "project": { "slug": "tick-coord", "name": "Tick Coord" },
        "agents": [{ "name": "claw", "type": "agent", "roles": ["dev"], "status": "active" }],
        "tasks": tasks,
    })
}

#[tokio::test]
async fn test_sync_requires_key() {
    let app = app();
    let body = sync_body(json!([]));

    let (status, resp) = post_with_key(&app, "/api/tick/sync", None, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["code"], "UNAUTHORIZED");

    let (status, _) = post_with_key(&app, "/api/tick/sync", Some("wrong"), body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // No key configured refuses everyone
    let unkeyed = app_with(AppConfig::default());
    let (status, _) = post_with_key(&unkeyed, "/api/tick/sync", Some(SYNC_KEY), body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sync_and_read_tasks() {
    let app = app();
    let (status, body) = post_with_key(
        &app,
        "/api/tick/sync",
        Some(SYNC_KEY),
        sync_body(json!([
            { "id": "TASK-1", "title": "Parse", "status": "done", "assigned_to": "claw" },
            { "id": "TASK-2", "title": "Render", "status": "in_progress" },
            { "id": "TASK-3", "title": "Ship", "status": "blocked", "depends_on": ["TASK-2"] },
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "project": "tick-coord", "tasksSynced": 3, "tasksRemoved": 0 }));

    let (_, projects) = get(&app, "/api/tick/projects").await;
    assert_eq!(projects[0]["taskCount"], 3);
    assert_eq!(projects[0]["doneCount"], 1);
    assert_eq!(projects[0]["agents"][0]["type"], "agent");

    let (status, body) = get(&app, "/api/tick/tasks?slug=tick-coord").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project"]["slug"], "tick-coord");
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0]["assignedTo"], "claw");
    assert_eq!(tasks[0]["priority"], "medium");
    assert_eq!(tasks[2]["dependsOn"][0], "TASK-2");

    let (_, body) = get(&app, "/api/tick/tasks?slug=tick-coord&status=blocked").await;
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);

    // Resync without TASK-3
    let (_, body) = post_with_key(
        &app,
        "/api/tick/sync",
        Some(SYNC_KEY),
        sync_body(json!([
            { "id": "TASK-1", "title": "Parse", "status": "done" },
            { "id": "TASK-2", "title": "Render", "status": "done" },
        ])),
    )
    .await;
    assert_eq!(body["tasksRemoved"], 1);

    let (_, body) = get(&app, "/api/tick/tasks?slug=tick-coord").await;
    assert_eq!(body["tasks"].as_array().unwrap().len(), 2);
    assert_eq!(body["project"]["doneCount"], 2);
}

#[tokio::test]
async fn test_sync_without_slug_is_bad_request() {
    let app = app();
    let (status, body) = post_with_key(
        &app,
        "/api/tick/sync",
        Some(SYNC_KEY),
        json!({ "project": { "name": "nameless" }, "tasks": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid input: Missing project.slug");
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_tasks_query_errors() {
    let app = app();
    let (status, body) = get(&app, "/api/tick/tasks").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad request: Missing ?slug= parameter");

    let (status, _) = get(&app, "/api/tick/tasks?slug=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_threads_and_project_delete() {
    let app = app();
    post_with_key(
        &app,
        "/api/tick/sync",
        Some(SYNC_KEY),
        sync_body(json!([{ "id": "TASK-1", "title": "Parse", "status": "todo" }])),
    )
    .await;

    let (status, _) = post(
        &app,
        "/api/tick/threads",
        json!({
            "projectSlug": "tick-coord",
            "tickId": "TASK-1",
            "userId": "u1",
            "userName": "Ana",
            "message": "Taking this",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/api/tick/task?slug=tick-coord&tickId=TASK-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["title"], "Parse");
    assert_eq!(body["threads"][0]["message"], "Taking this");

    let delete = |key: Option<&str>| {
        let mut builder = Request::delete("/api/tick/projects/tick-coord");
        if let Some(key) = key {
            builder = builder.header("x-tick-key", key);
        }
        builder.body(Body::empty()).unwrap()
    };
    assert_eq!(send(&app, delete(None)).await.0, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, delete(Some(SYNC_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tasksRemoved"], 1);

    let (_, projects) = get(&app, "/api/tick/projects").await;
    assert!(projects.as_array().unwrap().is_empty());
    assert_eq!(
        get(&app, "/api/tick/task?slug=tick-coord&tickId=TASK-1").await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/tick/projects")
        .header("origin", "https://dashboard.example")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
