//! Chat turn endpoint.
//!
//! The response body is a data stream: one `TYPE:JSON` frame per line,
//! carrying step starts, text deltas, the tool call and its result, errors,
//! and the finish reason.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::post};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use storyteller_core::message::Part;
use storyteller_narration::domain::commands::{HandleTurn, IncomingMessage};
use storyteller_narration::domain::errors::TurnError;
use storyteller_narration::domain::events::TurnEvent;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::Caller;
use crate::state::AppState;

pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const DATA_STREAM_VERSION: &str = "v1";

/// Request body for POST /api/chat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Chat the turn belongs to.
    #[serde(alias = "id")]
    pub chat_id: Uuid,
    /// Client-side transcript; only the last message is new.
    #[serde(default)]
    pub messages: Vec<ClientMessage>,
}

/// A message as sent by the chat client.
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Raw parts; kinds the server does not model are dropped.
    #[serde(default)]
    pub parts: Vec<Value>,
}

impl ClientMessage {
    fn into_incoming(self) -> IncomingMessage {
        let mut parts: Vec<Part> = self
            .parts
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Part>(raw) {
                Ok(part) => Some(part),
                Err(error) => {
                    debug!(%error, "dropping unsupported client part");
                    None
                }
            })
            .collect();
        if parts.is_empty() {
            parts.extend(
                self.content
                    .filter(|content| !content.trim().is_empty())
                    .map(Part::text),
            );
        }

        IncomingMessage {
            id: self.id.and_then(|id| Uuid::parse_str(&id).ok()),
            parts,
        }
    }
}

/// Encodes one turn event as a data-stream line.
#[must_use]
pub fn data_stream_frame(event: &TurnEvent) -> String {
    let (code, payload) = match event {
        TurnEvent::StepStarted { message_id } => ('f', json!({ "messageId": message_id })),
        TurnEvent::TextDelta(text) => ('0', json!(text)),
        TurnEvent::ToolCall {
            tool_call_id,
            tool_name,
            args,
        } => (
            '9',
            json!({ "toolCallId": tool_call_id, "toolName": tool_name, "args": args }),
        ),
        TurnEvent::ToolResult {
            tool_call_id,
            result,
        } => ('a', json!({ "toolCallId": tool_call_id, "result": result })),
        TurnEvent::Error(message) => ('3', json!(message)),
        TurnEvent::Finished { reason } => ('d', json!({ "finishReason": reason.as_str() })),
    };
    format!("{code}:{payload}\n")
}

/// POST /api/chat
#[instrument(skip_all, fields(chat_id = %request.chat_id))]
async fn chat(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let message = request
        .messages
        .into_iter()
        .last()
        .ok_or_else(|| TurnError::InvalidRequest("no messages in request".into()))?;

    let command = HandleTurn {
        correlation_id: Uuid::new_v4(),
        chat_id: request.chat_id,
        message: message.into_incoming(),
    };
    info!(correlation_id = %command.correlation_id, "handling chat turn");

    let events = state.orchestrator.handle_turn(command, caller.0).await?;
    let frames = events.map(|event| Ok::<_, Infallible>(data_stream_frame(&event)));

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
            (
                HeaderName::from_static(DATA_STREAM_HEADER),
                HeaderValue::from_static(DATA_STREAM_VERSION),
            ),
        ],
        Body::from_stream(frames),
    )
        .into_response())
}

/// Returns the router for the chat endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use storyteller_core::chat::Chat;
    use storyteller_core::ids::IdGenerator;
    use storyteller_core::model::{FinishReason, ModelEvent, ToolCall};
    use storyteller_core::quota::QuotaPolicy;
    use storyteller_core::repository::{ChatRepository, UserDirectory};
    use storyteller_core::story::STORY_TOOL_NAME;
    use storyteller_core::user::User;
    use storyteller_narration::application::turn_handler::TurnOrchestrator;
    use storyteller_narration::domain::story_tool::StoryTool;
    use storyteller_test_support::{
        FailingChatStore, FixedClock, InMemoryChatStore, ScriptedLanguageModel, SequenceIds,
        StubSynthesizer,
    };
    use tower::ServiceExt;

    use crate::identity::{USER_EMAIL_HEADER, USER_TYPE_HEADER};

    const READER_EMAIL: &str = "reader@example.com";
    const CHAT_ID: u128 = 0xC0;

    fn reader() -> User {
        User {
            id: Uuid::from_u128(0xA),
            email: READER_EMAIL.to_owned(),
        }
    }

    fn story_script() -> Vec<ModelEvent> {
        vec![
            ModelEvent::TextDelta("Once upon ".to_owned()),
            ModelEvent::TextDelta("a time.".to_owned()),
            ModelEvent::ToolCall(ToolCall {
                call_id: "call-1".to_owned(),
                tool_name: STORY_TOOL_NAME.to_owned(),
                args: json!({
                    "story": "A fox met a heron.",
                    "choices": ["Share dinner", "Walk away"],
                    "completed": false,
                    "storyId": "seg-1"
                }),
            }),
            ModelEvent::Finish(FinishReason::ToolCalls),
        ]
    }

    fn app<S>(store: Arc<S>) -> Router
    where
        S: ChatRepository + UserDirectory + 'static,
    {
        let ids: Arc<dyn IdGenerator> = Arc::new(SequenceIds::starting_after(0x1000));
        let synthesizer = Arc::new(StubSynthesizer::new("/audio"));
        let orchestrator = TurnOrchestrator::new(
            store.clone(),
            store,
            Arc::new(ScriptedLanguageModel::new(story_script())),
            Arc::new(StoryTool::new(synthesizer.clone(), ids.clone())),
            Arc::new(FixedClock::mid_january()),
            ids,
            QuotaPolicy::default(),
        );
        router().with_state(AppState::new(Arc::new(orchestrator), synthesizer))
    }

    fn chat_request(body: &Value, email: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(CONTENT_TYPE, "application/json");
        if let Some(email) = email {
            builder = builder
                .header(USER_EMAIL_HEADER, email)
                .header(USER_TYPE_HEADER, "regular");
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn turn_body(text: &str) -> Value {
        json!({
            "id": Uuid::from_u128(CHAT_ID),
            "messages": [
                { "id": "m-0", "role": "user", "content": "earlier" },
                {
                    "id": Uuid::from_u128(0x77),
                    "role": "user",
                    "content": text,
                    "parts": [{ "type": "step-start" }, { "type": "text", "text": text }]
                }
            ]
        })
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_frames_use_data_stream_codes() {
        // Arrange
        let events = [
            TurnEvent::StepStarted {
                message_id: Uuid::from_u128(1),
            },
            TurnEvent::TextDelta("Once ".to_owned()),
            TurnEvent::Error("boom".to_owned()),
            TurnEvent::Finished {
                reason: FinishReason::Stop,
            },
        ];

        // Act
        let frames: Vec<String> = events.iter().map(data_stream_frame).collect();

        // Assert
        assert_eq!(
            frames[0],
            format!("f:{{\"messageId\":\"{}\"}}\n", Uuid::from_u128(1))
        );
        assert_eq!(frames[1], "0:\"Once \"\n");
        assert_eq!(frames[2], "3:\"boom\"\n");
        assert_eq!(frames[3], "d:{\"finishReason\":\"stop\"}\n");
    }

    #[test]
    fn test_tool_frames_carry_call_id() {
        // Arrange
        let call = TurnEvent::ToolCall {
            tool_call_id: "call-1".to_owned(),
            tool_name: STORY_TOOL_NAME.to_owned(),
            args: json!({ "storyId": "seg-1" }),
        };
        let result = TurnEvent::ToolResult {
            tool_call_id: "call-1".to_owned(),
            result: json!({ "audioUrl": "/audio/seg-1.mp3" }),
        };

        // Act
        let call_frame = data_stream_frame(&call);
        let result_frame = data_stream_frame(&result);

        // Assert
        assert!(call_frame.starts_with("9:"));
        let call_json: Value = serde_json::from_str(call_frame[2..].trim_end()).unwrap();
        assert_eq!(call_json["toolCallId"], "call-1");
        assert_eq!(call_json["toolName"], STORY_TOOL_NAME);
        assert!(result_frame.starts_with("a:"));
        let result_json: Value = serde_json::from_str(result_frame[2..].trim_end()).unwrap();
        assert_eq!(result_json["result"]["audioUrl"], "/audio/seg-1.mp3");
    }

    #[test]
    fn test_unknown_client_parts_are_dropped() {
        // Arrange
        let message: ClientMessage = serde_json::from_value(json!({
            "id": "not-a-uuid",
            "parts": [{ "type": "step-start" }, { "type": "text", "text": "Go left" }]
        }))
        .unwrap();

        // Act
        let incoming = message.into_incoming();

        // Assert
        assert_eq!(incoming.id, None);
        assert_eq!(incoming.parts, vec![Part::text("Go left")]);
    }

    #[test]
    fn test_content_is_used_when_no_parts_survive() {
        // Arrange
        let id = Uuid::from_u128(0x77);
        let message: ClientMessage = serde_json::from_value(json!({
            "id": id.to_string(),
            "content": "Tell me a story"
        }))
        .unwrap();

        // Act
        let incoming = message.into_incoming();

        // Assert
        assert_eq!(incoming.id, Some(id));
        assert_eq!(incoming.parts, vec![Part::text("Tell me a story")]);
    }

    #[tokio::test]
    async fn test_chat_streams_turn_frames() {
        // Arrange
        let store = Arc::new(InMemoryChatStore::new().with_user(reader()));
        let app = app(store.clone());

        // Act
        let response = app
            .oneshot(chat_request(&turn_body("Tell me a story"), Some(READER_EMAIL)))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[DATA_STREAM_HEADER],
            HeaderValue::from_static(DATA_STREAM_VERSION)
        );
        let body = body_text(response).await;
        let codes: Vec<&str> = body.lines().map(|line| &line[..2]).collect();
        assert_eq!(codes.first(), Some(&"f:"));
        assert!(codes.contains(&"0:"));
        assert!(codes.contains(&"9:"));
        assert!(codes.contains(&"a:"));
        assert_eq!(codes.last(), Some(&"d:"));
        assert!(body.contains("/audio/seg-1.mp3"));
    }

    #[tokio::test]
    async fn test_chat_persists_last_client_message_only() {
        // Arrange
        let store = Arc::new(InMemoryChatStore::new().with_user(reader()));
        let app = app(store.clone());

        // Act
        let response = app
            .oneshot(chat_request(&turn_body("Tell me a story"), Some(READER_EMAIL)))
            .await
            .unwrap();
        body_text(response).await;

        // Assert
        let user_message = store
            .messages()
            .into_iter()
            .find(|message| message.id == Uuid::from_u128(0x77))
            .unwrap();
        assert_eq!(user_message.parts, vec![Part::text("Tell me a story")]);
        assert!(!store.messages().iter().any(|m| m.text() == "earlier"));
    }

    #[tokio::test]
    async fn test_chat_without_identity_is_unauthorized() {
        // Arrange
        let store = Arc::new(InMemoryChatStore::new().with_user(reader()));
        let app = app(store);

        // Act
        let response = app
            .oneshot(chat_request(&turn_body("Hello"), None))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "Unauthorized");
    }

    #[tokio::test]
    async fn test_chat_in_foreign_chat_is_forbidden() {
        // Arrange
        let owner = Uuid::from_u128(0xB);
        let store = Arc::new(
            InMemoryChatStore::new()
                .with_user(reader())
                .with_chat(Chat::new_story(Uuid::from_u128(CHAT_ID), owner)),
        );
        let app = app(store);

        // Act
        let response = app
            .oneshot(chat_request(&turn_body("Hello"), Some(READER_EMAIL)))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_chat_without_messages_is_bad_request() {
        // Arrange
        let store = Arc::new(InMemoryChatStore::new().with_user(reader()));
        let app = app(store);
        let body = json!({ "id": Uuid::from_u128(CHAT_ID), "messages": [] });

        // Act
        let response = app
            .oneshot(chat_request(&body, Some(READER_EMAIL)))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        // Arrange
        let app = app(Arc::new(FailingChatStore));

        // Act
        let response = app
            .oneshot(chat_request(&turn_body("Hello"), Some(READER_EMAIL)))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            crate::error::INTERNAL_ERROR_MESSAGE
        );
    }
}
