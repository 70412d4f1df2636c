//! Speech synthesis adapter: provider stream in, stored audio URL out.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use storyteller_core::clock::Clock;
use storyteller_core::speech::{
    BlobStore, SpeechProvider, SpeechSynthesizer, SynthesisError, VoiceProfile,
};
use tracing::{info, instrument, warn};

/// Key prefix audio files are stored under.
pub const AUDIO_KEY_PREFIX: &str = "audio";

/// Synthesizes speech with one provider and stores it in one blob store.
pub struct SpeechSynthesisAdapter {
    provider: Arc<dyn SpeechProvider>,
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    voice: VoiceProfile,
}

impl SpeechSynthesisAdapter {
    /// Creates an adapter that requests `voice` from `provider`.
    #[must_use]
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        store: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        voice: VoiceProfile,
    ) -> Self {
        Self {
            provider,
            store,
            clock,
            voice,
        }
    }

    /// File name for a segment: the id plus a millisecond timestamp, so a
    /// re-synthesized segment never overwrites an earlier file.
    fn file_name(&self, id: &str) -> String {
        format!(
            "{id}-{}.{}",
            self.clock.timestamp_millis(),
            self.voice.encoding.extension()
        )
    }
}

impl std::fmt::Debug for SpeechSynthesisAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechSynthesisAdapter")
            .field("voice", &self.voice)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechSynthesisAdapter {
    #[instrument(skip(self, text), fields(story_id = %id, chars = text.len()))]
    async fn synthesize(&self, text: &str, id: &str) -> Result<String, SynthesisError> {
        if text.is_empty() {
            return Err(SynthesisError::EmptyInput);
        }
        if id.is_empty() {
            return Err(SynthesisError::MissingId);
        }

        let Some(mut stream) = self.provider.speak(text, &self.voice).await? else {
            warn!("speech provider returned no audio stream");
            return Err(SynthesisError::Unavailable(
                "provider returned no audio stream".into(),
            ));
        };

        // Chunks are appended strictly in arrival order.
        let mut audio = Vec::new();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk?);
        }

        let key = format!("{AUDIO_KEY_PREFIX}/{}", self.file_name(id));
        let url = self
            .store
            .put(&key, audio, self.voice.encoding.content_type())
            .await?;

        info!(%url, "stored narration audio");
        Ok(url)
    }
}
