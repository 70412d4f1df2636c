//! View state of the audio player rendered under each story segment.

use std::fmt;

use storyteller_core::message::Part;
use storyteller_core::story::StoryResult;
use tracing::debug;

use crate::autoplay::{AutoplayGate, MediaElement};
use crate::clock::{PlaybackClock, PlaybackEvent};
use crate::highlight::{HighlightSplit, word_count};

/// Whether the story has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryStatus {
    Completed,
    InProgress,
}

impl StoryStatus {
    /// Badge label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::InProgress => "In Progress",
        }
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A choice the reader picked, ready to be sent as the next user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSelection {
    pub index: usize,
    pub text: String,
}

impl ChoiceSelection {
    /// Message parts for the user turn carrying this choice.
    #[must_use]
    pub fn into_parts(self) -> Vec<Part> {
        vec![Part::text(self.text)]
    }
}

/// Player state for one assistant message's story result.
#[derive(Debug, Clone)]
pub struct PlayerView {
    message_id: String,
    story: StoryResult,
    clock: PlaybackClock,
    selected_choice: Option<usize>,
    autoplay_attempted: bool,
}

impl PlayerView {
    #[must_use]
    pub fn new(message_id: impl Into<String>, story: StoryResult) -> Self {
        Self {
            message_id: message_id.into(),
            story,
            clock: PlaybackClock::new(),
            selected_choice: None,
            autoplay_attempted: false,
        }
    }

    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    #[must_use]
    pub fn story(&self) -> &StoryResult {
        &self.story
    }

    #[must_use]
    pub fn status(&self) -> StoryStatus {
        if self.story.completed {
            StoryStatus::Completed
        } else {
            StoryStatus::InProgress
        }
    }

    /// Words in the segment, for the word-count badge.
    #[must_use]
    pub fn word_count(&self) -> usize {
        word_count(&self.story.story)
    }

    /// Whether there is audio to play, save, or visualize.
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.story.has_audio()
    }

    /// Choices the reader can still act on.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        self.story.actionable_choices()
    }

    #[must_use]
    pub fn selected_choice(&self) -> Option<usize> {
        self.selected_choice
    }

    /// Marks choice `index` as selected and returns it for sending.
    /// Returns `None` for an index out of range or a completed story.
    pub fn select_choice(&mut self, index: usize) -> Option<ChoiceSelection> {
        let text = self.choices().get(index)?.clone();
        self.selected_choice = Some(index);
        Some(ChoiceSelection { index, text })
    }

    /// Replaces the story result; a new audio URL resets playback.
    pub fn update_story(&mut self, story: StoryResult) {
        if story.audio_url != self.story.audio_url {
            self.clock.apply(PlaybackEvent::SourceChanged);
            self.autoplay_attempted = false;
        }
        self.story = story;
    }

    /// Feeds a media event into the highlight clock.
    pub fn on_media_event(&mut self, event: PlaybackEvent) {
        self.clock.apply(event);
    }

    /// Current highlighted and remaining text.
    #[must_use]
    pub fn highlight(&self) -> HighlightSplit<'_> {
        self.clock.split(&self.story.story)
    }

    /// Starts playback once if this message is the last one ready and has
    /// audio. Play failures are ignored. Returns whether playback was
    /// attempted.
    pub fn maybe_autoplay<M: MediaElement>(&mut self, gate: &AutoplayGate, media: &mut M) -> bool {
        if self.autoplay_attempted || !self.has_audio() || !gate.is_ready(&self.message_id) {
            return false;
        }
        self.autoplay_attempted = true;
        if let Err(error) = media.play() {
            debug!(message_id = %self.message_id, %error, "autoplay refused");
        }
        true
    }

    /// Plays when paused and pauses when playing. Does nothing without audio.
    pub fn toggle<M: MediaElement>(&self, media: &mut M) {
        if !self.has_audio() {
            return;
        }
        if media.is_paused() {
            if let Err(error) = media.play() {
                debug!(message_id = %self.message_id, %error, "play refused");
            }
        } else {
            media.pause();
        }
    }
}
