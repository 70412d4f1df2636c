//! Standalone synthesis endpoint: narrates arbitrary text for a segment id.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::SynthesisApiError;
use crate::state::AppState;

/// Request body for POST /api/text-to-speech.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub story_id: Option<String>,
}

/// Response body for a successful synthesis.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisResponse {
    pub audio_url: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// POST /api/text-to-speech
#[instrument(skip_all)]
async fn text_to_speech(
    State(state): State<AppState>,
    Json(request): Json<SynthesisRequest>,
) -> Result<Json<SynthesisResponse>, SynthesisApiError> {
    let text = non_empty(request.text).ok_or(SynthesisApiError::MissingText)?;
    let story_id = non_empty(request.story_id).ok_or(SynthesisApiError::MissingStoryId)?;

    match state.synthesizer.synthesize(&text, &story_id).await {
        Ok(audio_url) => {
            info!(%story_id, "audio generated");
            Ok(Json(SynthesisResponse { audio_url }))
        }
        Err(e) => {
            error!(%story_id, error = %e, "text-to-speech failed");
            Err(SynthesisApiError::Failed)
        }
    }
}

/// Returns the router for the synthesis endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/text-to-speech", post(text_to_speech))
}
