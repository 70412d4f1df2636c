//! Deepgram text-to-speech client.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use storyteller_core::speech::{AudioStream, SpeechProvider, SynthesisError, VoiceProfile};
use tracing::{instrument, warn};

pub const DEFAULT_DEEPGRAM_BASE_URL: &str = "https://api.deepgram.com";

#[derive(Debug, Clone)]
pub struct DeepgramConfig {
    pub api_key: String,
    pub base_url: String,
}

/// `SpeechProvider` backed by Deepgram's `/v1/speak` endpoint.
#[derive(Debug, Clone)]
pub struct DeepgramSpeechClient {
    client: Client,
    config: DeepgramConfig,
}

impl DeepgramSpeechClient {
    #[must_use]
    pub fn new(client: Client, config: DeepgramConfig) -> Self {
        Self { client, config }
    }
}

#[derive(Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
}

fn speak_url(base_url: &str, voice: &VoiceProfile) -> String {
    format!(
        "{}/v1/speak?model={}&encoding={}",
        base_url.trim_end_matches('/'),
        voice.model,
        voice.encoding.as_str()
    )
}

#[async_trait]
impl SpeechProvider for DeepgramSpeechClient {
    #[instrument(skip(self, text), fields(model = %voice.model, chars = text.len()))]
    async fn speak(
        &self,
        text: &str,
        voice: &VoiceProfile,
    ) -> Result<Option<AudioStream>, SynthesisError> {
        let response = self
            .client
            .post(speak_url(&self.config.base_url, voice))
            .header(AUTHORIZATION, format!("Token {}", self.config.api_key))
            .json(&SpeakRequest { text })
            .send()
            .await
            .map_err(|error| SynthesisError::Unavailable(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "speech provider rejected request");
            return Err(SynthesisError::Unavailable(format!(
                "provider returned {status}: {body}"
            )));
        }
        if response.content_length() == Some(0) {
            return Ok(None);
        }

        let audio = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|error| SynthesisError::Unavailable(error.to_string()))
        });
        Ok(Some(Box::pin(audio)))
    }
}
