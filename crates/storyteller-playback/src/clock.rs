//! Playback position tracking fed by media element events.

use tracing::debug;

use crate::highlight::{HighlightSplit, highlight_split};

/// Events raised by an audio element that affect highlighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    /// Metadata loaded; the duration is known.
    LoadedMetadata {
        /// Duration in seconds.
        duration: f64,
    },
    /// The playback position moved.
    TimeUpdate {
        /// Position in seconds.
        current_time: f64,
    },
    /// The element was pointed at a different source.
    SourceChanged,
}

/// Current position and duration of one audio element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackClock {
    current_time: f64,
    duration: f64,
}

impl PlaybackClock {
    /// Creates a clock for an element that has not loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one media event.
    pub fn apply(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::LoadedMetadata { duration } => {
                debug!(duration, "audio metadata loaded");
                self.duration = duration;
            }
            PlaybackEvent::TimeUpdate { current_time } => self.current_time = current_time,
            PlaybackEvent::SourceChanged => *self = Self::default(),
        }
    }

    /// Last reported position in seconds.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Last reported duration in seconds; zero until metadata loads.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Splits `text` at the current position.
    #[must_use]
    pub fn split<'a>(&self, text: &'a str) -> HighlightSplit<'a> {
        highlight_split(text, self.current_time, self.duration)
    }
}
