//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use sqlx::PgPool;
use storyteller_core::ids::IdGenerator;
use storyteller_core::model::{FinishReason, ModelEvent, ToolCall};
use storyteller_core::quota::{Entitlements, QuotaPolicy};
use storyteller_core::story::STORY_TOOL_NAME;
use storyteller_narration::application::turn_handler::TurnOrchestrator;
use storyteller_narration::domain::story_tool::StoryTool;
use storyteller_store::PgChatStore;
use storyteller_test_support::{FixedClock, ScriptedLanguageModel, SequenceIds, StubSynthesizer};
use tower::ServiceExt;
use uuid::Uuid;

use storyteller_api::identity::{USER_EMAIL_HEADER, USER_TYPE_HEADER};
use storyteller_api::routes;
use storyteller_api::state::AppState;

pub const READER_EMAIL: &str = "reader@example.com";
pub const READER_ID: Uuid = Uuid::from_u128(0xA);

/// Ceiling used by `build_test_app`; small so quota tests stay short.
pub const TEST_CEILING: u64 = 3;

/// A model turn that narrates a little and calls the story tool once.
pub fn story_script() -> Vec<ModelEvent> {
    vec![
        ModelEvent::TextDelta("Once upon ".to_owned()),
        ModelEvent::TextDelta("a time.".to_owned()),
        ModelEvent::ToolCall(ToolCall {
            call_id: "call-1".to_owned(),
            tool_name: STORY_TOOL_NAME.to_owned(),
            args: json!({
                "story": "A lantern flickered in the attic.",
                "choices": ["Climb the stairs", "Call for help"],
                "completed": false,
                "storyId": "seg-1"
            }),
        }),
        ModelEvent::Finish(FinishReason::ToolCalls),
    ]
}

/// Inserts the reader account the chat tests authenticate as.
pub async fn seed_reader(pool: &PgPool) {
    sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2)")
        .bind(READER_ID)
        .bind(READER_EMAIL)
        .execute(pool)
        .await
        .unwrap();
}

/// Build the full app router with a real `PgChatStore`, a scripted model, a
/// stub synthesizer and a fixed clock. Uses the same router as `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    let store = Arc::new(PgChatStore::new(pool));
    let ids: Arc<dyn IdGenerator> = Arc::new(SequenceIds::starting_after(0x1000));
    let synthesizer = Arc::new(StubSynthesizer::new("/audio"));
    let quota = QuotaPolicy {
        guest: Entitlements {
            max_messages_per_day: TEST_CEILING,
        },
        regular: Entitlements {
            max_messages_per_day: TEST_CEILING,
        },
    };
    let orchestrator = TurnOrchestrator::new(
        store.clone(),
        store,
        Arc::new(ScriptedLanguageModel::new(story_script())),
        Arc::new(StoryTool::new(synthesizer.clone(), ids.clone())),
        Arc::new(FixedClock::mid_january()),
        ids,
        quota,
    );

    routes::app(
        AppState::new(Arc::new(orchestrator), synthesizer),
        &std::env::temp_dir(),
    )
}

/// Request body for one chat turn with a single user message.
pub fn turn_body(chat_id: Uuid, message_id: Uuid, text: &str) -> serde_json::Value {
    json!({
        "id": chat_id,
        "messages": [{ "id": message_id, "role": "user", "content": text }]
    })
}

/// Send a chat turn as the reader and return the status and the raw body.
pub async fn post_chat(app: Router, body: &serde_json::Value) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .header(USER_EMAIL_HEADER, READER_EMAIL)
        .header(USER_TYPE_HEADER, "regular")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    (status, String::from_utf8(body_bytes.to_vec()).unwrap())
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
