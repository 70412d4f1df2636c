//! Speech synthesis collaborators: the provider, the blob store, and the
//! synthesizer the story tool calls.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Compressed audio encodings the provider can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// MPEG-1 layer III.
    Mp3,
}

impl AudioEncoding {
    /// Provider-side name of the encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
        }
    }

    /// File extension for stored audio.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
        }
    }

    /// MIME type for stored audio.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
        }
    }
}

/// Voice model and encoding requested from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceProfile {
    /// Provider voice/model name.
    pub model: String,
    /// Output encoding.
    pub encoding: AudioEncoding,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            model: "aura-2-cora-en".to_owned(),
            encoding: AudioEncoding::Mp3,
        }
    }
}

/// Failure anywhere in the synthesis path.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Nothing to synthesize.
    #[error("text to synthesize is empty")]
    EmptyInput,

    /// No segment id to name the audio after.
    #[error("story id is empty")]
    MissingId,

    /// The provider returned no stream, a non-success status, or broke off.
    #[error("speech synthesis unavailable: {0}")]
    Unavailable(String),

    /// The audio could not be stored.
    #[error("audio storage failed: {0}")]
    Storage(String),
}

/// Audio bytes in arrival order.
pub type AudioStream = BoxStream<'static, Result<Vec<u8>, SynthesisError>>;

/// External text-to-speech provider.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Requests speech for `text`. `Ok(None)` means the provider answered
    /// without an audio stream.
    async fn speak(
        &self,
        text: &str,
        voice: &VoiceProfile,
    ) -> Result<Option<AudioStream>, SynthesisError>;
}

/// URL-returning blob/file store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key` and returns a publicly fetchable URL.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SynthesisError>;
}

/// Text to stored, playable audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` for segment `id` and returns the audio URL.
    async fn synthesize(&self, text: &str, id: &str) -> Result<String, SynthesisError>;
}
