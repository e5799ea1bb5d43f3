//! Tests of the Assistants API client against a local axum mock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

use chatwidget_gateway::assistant::{
    AssistantGateway, AssistantProvider, MAX_POLL_ATTEMPTS, OpenAiConnector, PollPolicy,
    ProviderConnector, RunStatus,
};
use chatwidget_gateway::error::ProviderError;
use chatwidget_gateway::settings::{SettingsStore, WidgetSettings};

const API_KEY: &str = "sk-mock-key";
const WRONG_KEY: &str = "sk-wrong-key-000000000000";

#[derive(Default)]
struct MockApi {
    run_polls: AtomicU32,
    polls_until_complete: u32,
    posted: Mutex<Vec<Value>>,
    message_queries: Mutex<Vec<(String, String)>>,
}

async fn require_headers(request: Request, next: Next) -> Response {
    let headers = request.headers();
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();
    let auth_ok = presented == API_KEY;
    let beta_ok = headers
        .get("openai-beta")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "assistants=v2");
    if !auth_ok || !beta_ok {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": format!("Incorrect API key provided: {presented}")}})),
        )
            .into_response();
    }
    next.run(request).await
}

async fn create_thread() -> Json<Value> {
    Json(json!({"id": "thread_mock", "object": "thread", "created_at": 0}))
}

async fn retrieve_thread(Path(thread_id): Path<String>) -> Response {
    if thread_id == "thread_mock" {
        Json(json!({"id": thread_id, "object": "thread"})).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"message": format!("No thread found with id '{thread_id}'.")}})),
        )
            .into_response()
    }
}

async fn create_message(
    State(api): State<Arc<MockApi>>,
    Path(thread_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.posted.lock().unwrap().push(body.clone());
    Json(json!({
        "id": "msg_user",
        "object": "thread.message",
        "thread_id": thread_id,
        "role": "user",
        "content": [{"type": "text", "text": {"value": body["content"], "annotations": []}}]
    }))
}

async fn list_messages(
    State(api): State<Arc<MockApi>>,
    Query(query): Query<Vec<(String, String)>>,
) -> Json<Value> {
    api.message_queries.lock().unwrap().extend(query);
    Json(json!({
        "object": "list",
        "data": [{
            "id": "msg_reply",
            "object": "thread.message",
            "role": "assistant",
            "content": [
                {"type": "image_file", "image_file": {"file_id": "file_1"}},
                {"type": "text", "text": {"value": "Mock reply", "annotations": []}}
            ]
        }],
        "has_more": false
    }))
}

async fn create_run(State(api): State<Arc<MockApi>>, Json(body): Json<Value>) -> Json<Value> {
    api.posted.lock().unwrap().push(body);
    Json(json!({"id": "run_mock", "object": "thread.run", "status": "queued"}))
}

async fn retrieve_run(
    State(api): State<Arc<MockApi>>,
    Path((_thread_id, run_id)): Path<(String, String)>,
) -> Json<Value> {
    let n = api.run_polls.fetch_add(1, Ordering::SeqCst) + 1;
    let status = if n >= api.polls_until_complete {
        "completed"
    } else {
        "in_progress"
    };
    Json(json!({"id": run_id, "object": "thread.run", "status": status, "last_error": null}))
}

/// Serve the mock under `/v1` and return its base URL.
async fn start_mock(api: Arc<MockApi>) -> Option<Url> {
    let app = Router::new()
        .route("/v1/threads", post(create_thread))
        .route("/v1/threads/{thread_id}", get(retrieve_thread))
        .route(
            "/v1/threads/{thread_id}/messages",
            get(list_messages).post(create_message),
        )
        .route("/v1/threads/{thread_id}/runs", post(create_run))
        .route("/v1/threads/{thread_id}/runs/{run_id}", get(retrieve_run))
        .layer(middleware::from_fn(require_headers))
        .with_state(api);

    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => return None,
        Err(e) => panic!("Failed to bind mock API: {e}"),
    };
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Some(Url::parse(&format!("http://{addr}/v1")).unwrap())
}

#[tokio::test]
async fn test_gateway_round_trip_through_http_client() {
    let api = Arc::new(MockApi {
        polls_until_complete: 3,
        ..MockApi::default()
    });
    let Some(base_url) = start_mock(api.clone()).await else {
        return;
    };

    let settings = Arc::new(SettingsStore::new(WidgetSettings {
        api_key: Some(SecretString::from(API_KEY)),
        assistant_id: "asst_mock".to_string(),
        ..WidgetSettings::default()
    }));
    let connector = Arc::new(OpenAiConnector::new(base_url).unwrap());
    let gateway = AssistantGateway::new(settings, connector).with_poll_policy(PollPolicy {
        interval: Duration::from_millis(1),
        max_attempts: MAX_POLL_ATTEMPTS,
    });

    let reply = gateway.get_reply("What's new?", None).await.unwrap();
    assert_eq!(reply.text, "Mock reply");
    assert_eq!(reply.thread_id, "thread_mock");
    assert_eq!(api.run_polls.load(Ordering::SeqCst), 3);

    assert_eq!(
        *api.posted.lock().unwrap(),
        vec![
            json!({"role": "user", "content": "What's new?"}),
            json!({"assistant_id": "asst_mock"}),
        ]
    );
    assert_eq!(
        *api.message_queries.lock().unwrap(),
        vec![
            ("limit".to_string(), "1".to_string()),
            ("order".to_string(), "desc".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unknown_thread_is_reported_as_not_found() {
    let api = Arc::new(MockApi::default());
    let Some(base_url) = start_mock(api).await else {
        return;
    };
    let provider = OpenAiConnector::new(base_url)
        .unwrap()
        .connect(&SecretString::from(API_KEY));

    let thread = provider.retrieve_thread("thread_mock").await.unwrap();
    assert_eq!(thread.id, "thread_mock");

    let err = provider.retrieve_thread("thread_missing").await.unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_status_errors_are_redacted() {
    let api = Arc::new(MockApi::default());
    let Some(base_url) = start_mock(api).await else {
        return;
    };
    let provider = OpenAiConnector::new(base_url)
        .unwrap()
        .connect(&SecretString::from(WRONG_KEY));

    let err = provider.create_thread().await.unwrap_err();
    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Incorrect API key provided"));
            assert!(!body.contains(WRONG_KEY), "body leaked key: {body}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_run_status_decoding() {
    let api = Arc::new(MockApi {
        polls_until_complete: 2,
        ..MockApi::default()
    });
    let Some(base_url) = start_mock(api).await else {
        return;
    };
    let provider = OpenAiConnector::new(base_url)
        .unwrap()
        .connect(&SecretString::from(API_KEY));

    let run = provider.create_run("thread_mock", "asst_mock").await.unwrap();
    assert_eq!(run.status, RunStatus::Queued);
    let run = provider.retrieve_run("thread_mock", &run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::InProgress);
    let run = provider.retrieve_run("thread_mock", &run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.last_error.is_none());
}
