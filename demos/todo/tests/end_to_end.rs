//! End-to-end tests: HTTP requests through the full pipeline into the
//! application service and its notification handlers.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tidy_runtime::DispatcherBuilder;
use tidy_testing::{CallLog, FailingHandler, RecordingHandler, init_test_tracing};
use todo_app::domain::TodoItemCompletedEvent;
use todo_app::seed::SEED_LIST_TITLE;
use todo_app::{ApplicationBuilder, Config, InMemoryTodoDatabase};
use tower::ServiceExt;

const USER_TOKEN: &str = "user-token";
const ADMIN_TOKEN: &str = "admin-token";

struct Harness {
    app: Router,
    database: InMemoryTodoDatabase,
    _static_root: TempDir,
}

async fn harness(register: impl FnOnce(DispatcherBuilder) -> DispatcherBuilder) -> Harness {
    init_test_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("index.html"), "<!doctype html><title>Todo</title>").unwrap();

    let static_root = dir.path().to_string_lossy().into_owned();
    let config = Config::from_lookup(|key| match key {
        "APP_ENVIRONMENT" => Some("Development".to_string()),
        "STATIC_ROOT" => Some(static_root.clone()),
        "AUTH_TOKENS" => Some(format!(
            "{USER_TOKEN}=alice,{ADMIN_TOKEN}=administrator@localhost:Administrator"
        )),
        _ => None,
    });

    let database = InMemoryTodoDatabase::new();
    let app = ApplicationBuilder::new(config)
        .database(Arc::new(database.clone()))
        .handlers(register)
        .build()
        .await
        .expect("application builds");

    Harness {
        app: app.router(),
        database,
        _static_root: dir,
    }
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(request.body(body).unwrap()).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seeded_list(app: &Router) -> Value {
    let response = send(app, Method::GET, "/api/TodoLists", Some(USER_TOKEN), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let vm = json_body(response).await;
    vm["lists"]
        .as_array()
        .unwrap()
        .iter()
        .find(|list| list["title"] == SEED_LIST_TITLE)
        .cloned()
        .expect("seed list present")
}

#[tokio::test]
async fn test_development_startup_seeds_one_list() {
    let harness = harness(|builder| builder).await;
    assert_eq!(harness.database.counts().await, (1, 4));

    let list = seeded_list(&harness.app).await;
    assert_eq!(list["items"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_api_requires_a_token() {
    let harness = harness(|builder| builder).await;

    let response = send(&harness.app, Method::GET, "/api/TodoLists", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&harness.app, Method::GET, "/api/TodoLists", Some("stolen"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_probes_are_anonymous() {
    let harness = harness(|builder| builder).await;
    let response = send(&harness.app, Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_completing_an_item_notifies_handlers_before_responding() {
    let log = CallLog::new();
    let recorder = RecordingHandler::new("audit", &log);
    let harness = harness(move |builder| builder.register::<TodoItemCompletedEvent, _>(recorder)).await;

    let list = seeded_list(&harness.app).await;
    let item = &list["items"][0];
    assert_eq!(item["done"], false);

    let response = send(
        &harness.app,
        Method::PUT,
        &format!("/api/TodoItems/{}", item["id"].as_str().unwrap()),
        Some(USER_TOKEN),
        Some(json!({ "id": item["id"], "title": item["title"], "done": true })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(log.entries(), vec!["audit:TodoItemCompletedEvent"]);

    // Already done: no second notification
    let response = send(
        &harness.app,
        Method::PUT,
        &format!("/api/TodoItems/{}", item["id"].as_str().unwrap()),
        Some(USER_TOKEN),
        Some(json!({ "id": item["id"], "title": item["title"], "done": true })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(log.entries().len(), 1);
}

#[tokio::test]
async fn test_failing_handler_yields_generic_500_but_keeps_the_change() {
    let log = CallLog::new();
    let failing = FailingHandler::new("mailer", &log);
    let harness = harness(move |builder| builder.register::<TodoItemCompletedEvent, _>(failing)).await;

    let list = seeded_list(&harness.app).await;
    let item = list["items"][1].clone();

    let response = send(
        &harness.app,
        Method::PUT,
        &format!("/api/TodoItems/{}", item["id"].as_str().unwrap()),
        Some(USER_TOKEN),
        Some(json!({ "id": item["id"], "title": item["title"], "done": true })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["message"], "An internal error occurred");
    assert!(!body.to_string().contains("mailer"));
    assert_eq!(log.entries(), vec!["mailer:TodoItemCompletedEvent"]);

    let list = seeded_list(&harness.app).await;
    let stored = list["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|candidate| candidate["id"] == item["id"])
        .unwrap();
    assert_eq!(stored["done"], true);
}

#[tokio::test]
async fn test_create_list_and_item() {
    let harness = harness(|builder| builder).await;

    let response = send(
        &harness.app,
        Method::POST,
        "/api/TodoLists",
        Some(USER_TOKEN),
        Some(json!({ "title": "Groceries", "colour": "#CCFF99" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let list_id = json_body(response).await;

    let response = send(
        &harness.app,
        Method::POST,
        "/api/TodoItems",
        Some(USER_TOKEN),
        Some(json!({ "listId": list_id, "title": "Milk" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        &harness.app,
        Method::GET,
        &format!("/api/TodoItems?listId={}", list_id.as_str().unwrap()),
        Some(USER_TOKEN),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json_body(response).await;
    assert_eq!(page["totalCount"], 1);
    assert_eq!(page["items"][0]["title"], "Milk");
    assert_eq!(harness.database.counts().await, (2, 5));
}

#[tokio::test]
async fn test_validation_failure_is_422() {
    let harness = harness(|builder| builder).await;

    let response = send(
        &harness.app,
        Method::POST,
        "/api/TodoLists",
        Some(USER_TOKEN),
        Some(json!({ "title": SEED_LIST_TITLE })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_item_is_404() {
    let harness = harness(|builder| builder).await;
    let id = uuid::Uuid::new_v4();

    let response = send(
        &harness.app,
        Method::DELETE,
        &format!("/api/TodoItems/{id}"),
        Some(USER_TOKEN),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_purge_requires_administrator() {
    let harness = harness(|builder| builder).await;

    let response = send(&harness.app, Method::POST, "/api/TodoLists/purge", Some(USER_TOKEN), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(harness.database.counts().await, (1, 4));

    let response = send(&harness.app, Method::POST, "/api/TodoLists/purge", Some(ADMIN_TOKEN), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(harness.database.counts().await, (0, 0));
}

#[tokio::test]
async fn test_unmatched_path_serves_the_spa_document() {
    let harness = harness(|builder| builder).await;
    let response = send(&harness.app, Method::GET, "/lists/42", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
