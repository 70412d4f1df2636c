//! Integration tests for the text-to-speech endpoint.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
async fn test_text_to_speech_returns_audio_url(pool: PgPool) {
    let app = common::build_test_app(pool);

    let (status, json) = common::post_json(
        app,
        "/api/text-to-speech",
        &json!({ "text": "The moon rose.", "storyId": "seg-42" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["audioUrl"], "/audio/seg-42.mp3");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_text_to_speech_without_text_returns_400(pool: PgPool) {
    let app = common::build_test_app(pool);

    let (status, json) =
        common::post_json(app, "/api/text-to-speech", &json!({ "storyId": "seg-42" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Text parameter is required");
}
