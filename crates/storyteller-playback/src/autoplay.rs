//! Decides which narrated segment may start playing on its own.

use thiserror::Error;

/// Errors an audio element reports when asked to play.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The platform refused to start playback without a user gesture.
    #[error("playback blocked: {0}")]
    Blocked(String),
    /// The element has no playable source.
    #[error("no audio source")]
    NoSource,
}

/// The playback controls of an audio element.
pub trait MediaElement {
    /// Starts or resumes playback.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` if playback could not start.
    fn play(&mut self) -> Result<(), PlaybackError>;

    /// Pauses playback.
    fn pause(&mut self);

    /// Whether playback is paused.
    fn is_paused(&self) -> bool;
}

/// Remembers the last assistant message that finished streaming.
///
/// Only that message's player is allowed to start playback on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoplayGate {
    last_ready: Option<String>,
}

impl AutoplayGate {
    /// Creates a gate with no ready message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `message_id` finished streaming.
    pub fn mark_ready(&mut self, message_id: impl Into<String>) {
        self.last_ready = Some(message_id.into());
    }

    /// The last message that finished streaming.
    #[must_use]
    pub fn last_ready(&self) -> Option<&str> {
        self.last_ready.as_deref()
    }

    /// Whether `message_id` is the last message that finished streaming.
    #[must_use]
    pub fn is_ready(&self, message_id: &str) -> bool {
        self.last_ready() == Some(message_id)
    }
}
