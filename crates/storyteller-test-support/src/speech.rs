//! Test speech collaborators — providers, blob stores and synthesizers.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::stream;
use storyteller_core::speech::{
    AudioStream, BlobStore, SpeechProvider, SpeechSynthesizer, SynthesisError, VoiceProfile,
};

/// A provider that streams a fixed list of chunks and records each request.
#[derive(Debug)]
pub struct StubSpeechProvider {
    chunks: Vec<Vec<u8>>,
    requests: Mutex<Vec<(String, VoiceProfile)>>,
}

impl StubSpeechProvider {
    /// Creates a provider that answers every request with `chunks`.
    #[must_use]
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of `(text, voice)` pairs requested so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<(String, VoiceProfile)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechProvider for StubSpeechProvider {
    async fn speak(
        &self,
        text: &str,
        voice: &VoiceProfile,
    ) -> Result<Option<AudioStream>, SynthesisError> {
        self.requests
            .lock()
            .unwrap()
            .push((text.to_owned(), voice.clone()));
        let chunks: Vec<Result<Vec<u8>, SynthesisError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        Ok(Some(Box::pin(stream::iter(chunks))))
    }
}

/// A provider that answers without an audio stream.
#[derive(Debug)]
pub struct SilentSpeechProvider;

#[async_trait]
impl SpeechProvider for SilentSpeechProvider {
    async fn speak(
        &self,
        _text: &str,
        _voice: &VoiceProfile,
    ) -> Result<Option<AudioStream>, SynthesisError> {
        Ok(None)
    }
}

/// A provider that always fails with a non-success status.
#[derive(Debug)]
pub struct FailingSpeechProvider;

#[async_trait]
impl SpeechProvider for FailingSpeechProvider {
    async fn speak(
        &self,
        _text: &str,
        _voice: &VoiceProfile,
    ) -> Result<Option<AudioStream>, SynthesisError> {
        Err(SynthesisError::Unavailable("provider returned 500".into()))
    }
}

/// A blob store that keeps objects in memory and returns `memory://` URLs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<Vec<(String, Vec<u8>, String)>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of stored `(key, bytes, content_type)` triples.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn objects(&self) -> Vec<(String, Vec<u8>, String)> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SynthesisError> {
        self.objects
            .lock()
            .unwrap()
            .push((key.to_owned(), bytes, content_type.to_owned()));
        Ok(format!("memory://{key}"))
    }
}

/// A synthesizer that returns `{base_url}/{id}.mp3` and records each call.
#[derive(Debug)]
pub struct StubSynthesizer {
    base_url: String,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubSynthesizer {
    /// Creates a synthesizer whose URLs start with `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of `(text, id)` pairs synthesized so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, text: &str, id: &str) -> Result<String, SynthesisError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_owned(), id.to_owned()));
        Ok(format!("{}/{id}.mp3", self.base_url))
    }
}

/// A synthesizer that always fails.
#[derive(Debug)]
pub struct FailingSynthesizer;

#[async_trait]
impl SpeechSynthesizer for FailingSynthesizer {
    async fn synthesize(&self, _text: &str, _id: &str) -> Result<String, SynthesisError> {
        Err(SynthesisError::Unavailable("provider returned 502".into()))
    }
}

/// A synthesizer that never finishes. Records that a call started so tests
/// can observe cancellation.
#[derive(Debug, Default)]
pub struct PendingSynthesizer {
    started: AtomicBool,
}

impl PendingSynthesizer {
    /// Creates a synthesizer with no call started.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a synthesis call has begun.
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for PendingSynthesizer {
    async fn synthesize(&self, _text: &str, _id: &str) -> Result<String, SynthesisError> {
        self.started.store(true, Ordering::SeqCst);
        futures::future::pending::<()>().await;
        Err(SynthesisError::Unavailable("unreachable".into()))
    }
}
