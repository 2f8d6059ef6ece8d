//! Integration test: run a mock chat backend on a free port and drive a real
//! ChatSession + ChatClient through the first-exchange, failure, and reset
//! flows. Does not require the hosted service.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lib::backend::ChatClient;
use lib::config::VisualConfig;
use lib::session::{ChatSession, Role, SendOutcome, DEFAULT_CONTEXT, SEND_ERROR_REPLY};
use lib::store::WidgetStore;
use lib::token::StaticToken;

const API_KEY: &str = "test-key";

#[derive(Default)]
struct MockBackend {
    chats: Mutex<Vec<String>>,
    confirmed: Mutex<Vec<String>>,
    resets: AtomicUsize,
}

fn authorized(headers: &HeaderMap) -> bool {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer "))
        .unwrap_or(false);
    let key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == API_KEY)
        .unwrap_or(false);
    bearer && key
}

async fn get_contexto() -> Json<Value> {
    Json(json!({ "contexto": "summer-sale" }))
}

async fn confirm_contexto(
    State(state): State<Arc<MockBackend>>,
    Path(name): Path<String>,
) -> Json<Value> {
    state.confirmed.lock().expect("lock").push(name);
    Json(json!({}))
}

async fn history(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if headers.get("x-session-id").is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(json!({ "history": [] })))
}

async fn chat(
    State(state): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let msg = body
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or_default()
        .to_string();
    state.chats.lock().expect("lock").push(msg);
    Ok(Json(
        json!({ "response": "Hola, ¿en qué puedo ayudarte?" }),
    ))
}

async fn reset(State(state): State<Arc<MockBackend>>) -> Json<Value> {
    state.resets.fetch_add(1, Ordering::SeqCst);
    Json(json!({}))
}

async fn spawn_mock() -> (String, Arc<MockBackend>) {
    let state = Arc::new(MockBackend::default());
    let app = Router::new()
        .route("/get_contexto", get(get_contexto))
        .route("/get_contexto/:name", get(confirm_contexto))
        .route("/history", get(history))
        .route("/chat", post(chat))
        .route("/reset", post(reset))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), state)
}

fn temp_store() -> WidgetStore {
    let dir = std::env::temp_dir().join(format!("charla-flow-test-{}", uuid::Uuid::new_v4()));
    WidgetStore::new(dir.join("state.json"))
}

fn session_against(base_url: &str, store: WidgetStore) -> ChatSession<ChatClient> {
    let client = ChatClient::new(base_url, Some(API_KEY.to_string()), Duration::from_secs(5))
        .expect("build client");
    ChatSession::new(
        client,
        Box::new(StaticToken::new(Some("jwt".to_string()))),
        store,
        VisualConfig::default(),
    )
}

#[tokio::test]
async fn fresh_session_first_exchange() {
    let (base_url, state) = spawn_mock().await;
    let store = temp_store();
    let mut session = session_against(&base_url, store.clone());

    session.initialize().await.expect("initialize");
    assert_eq!(session.active_context(), "summer-sale");
    assert_eq!(
        state.confirmed.lock().expect("lock").as_slice(),
        ["summer-sale"]
    );
    // Empty server history => one seeded welcome message.
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].role, Role::Assistant);

    let outcome = session.send_message("hola").await.expect("send");
    assert_eq!(outcome, SendOutcome::Delivered);
    assert!(!session.loading());

    let transcript = session.messages();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].role, Role::User);
    assert_eq!(transcript[1].content, "hola");
    assert_eq!(transcript[2].role, Role::Assistant);
    assert_eq!(transcript[2].content, "Hola, ¿en qué puedo ayudarte?");
    assert_eq!(state.chats.lock().expect("lock").as_slice(), ["hola"]);

    // The full transcript (welcome included) is persisted after the exchange.
    assert_eq!(store.load().chat_history.expect("history").len(), 3);
}

#[tokio::test]
async fn unreachable_backend_degrades_gracefully() {
    // Reserve a port and close it again so connections are refused.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
        listener.local_addr().expect("local_addr").port()
    };
    let base_url = format!("http://127.0.0.1:{}", port);
    let mut session = session_against(&base_url, temp_store());

    session.initialize().await.expect("initialize");
    assert_eq!(session.active_context(), DEFAULT_CONTEXT);
    assert_eq!(session.messages().len(), 1);

    let outcome = session.send_message("hola").await.expect("send");
    assert_eq!(outcome, SendOutcome::Failed);
    assert!(!session.loading());
    let last = session.messages().last().expect("message");
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, SEND_ERROR_REPLY);
}

#[tokio::test]
async fn reset_notifies_backend_and_clears_state() {
    let (base_url, state) = spawn_mock().await;
    let store = temp_store();
    let mut session = session_against(&base_url, store.clone());
    session.initialize().await.expect("initialize");
    session.send_message("hola").await.expect("send");

    session.reset_session().await.expect("reset");
    assert_eq!(state.resets.load(Ordering::SeqCst), 1);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].role, Role::Assistant);

    let stored = store.load();
    assert!(stored.session_id.is_none());
    assert!(stored.chat_history.is_none());
}
