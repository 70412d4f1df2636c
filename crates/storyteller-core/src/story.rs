//! Story segments produced by the story tool.

use serde::{Deserialize, Serialize};

/// Name under which the story tool is exposed to the language model.
pub const STORY_TOOL_NAME: &str = "storyTelling";

/// Arguments the language model supplies when it calls the story tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryToolArgs {
    /// Narrative text the speech model will read.
    pub story: String,
    /// Choices offered to the user after this segment.
    pub choices: Vec<String>,
    /// Whether this segment ends the story.
    pub completed: bool,
    /// Segment id, reused when the same segment is synthesized again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,
}

/// One narrated story segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResult {
    /// Narrative text.
    pub story: String,
    /// Choices offered after the segment.
    #[serde(default)]
    pub choices: Vec<String>,
    /// Whether the story has ended.
    #[serde(default)]
    pub completed: bool,
    /// Public URL of the narration, `None` when synthesis failed.
    #[serde(default)]
    pub audio_url: Option<String>,
    /// Stable segment id.
    #[serde(default)]
    pub story_id: String,
}

impl StoryResult {
    /// Choices the user may still act on. A completed story offers none,
    /// whatever the model put in `choices`.
    #[must_use]
    pub fn actionable_choices(&self) -> &[String] {
        if self.completed {
            &[]
        } else {
            &self.choices
        }
    }

    /// Returns `true` when narration audio exists for the segment.
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.audio_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(completed: bool) -> StoryResult {
        StoryResult {
            story: "Alee found a door in the old oak.".to_owned(),
            choices: vec!["Open it".to_owned(), "Walk away".to_owned()],
            completed,
            audio_url: None,
            story_id: "seg-1".to_owned(),
        }
    }

    #[test]
    fn test_completed_story_has_no_actionable_choices() {
        assert!(segment(true).actionable_choices().is_empty());
        assert_eq!(segment(false).actionable_choices().len(), 2);
    }

    #[test]
    fn test_story_result_serializes_null_audio_url() {
        let json = serde_json::to_value(segment(false)).unwrap();

        assert!(json["audioUrl"].is_null());
        assert_eq!(json["storyId"], "seg-1");
    }

    #[test]
    fn test_tool_args_accept_missing_story_id() {
        let args: StoryToolArgs = serde_json::from_value(serde_json::json!({
            "story": "Once upon a time.",
            "choices": [],
            "completed": true
        }))
        .unwrap();

        assert_eq!(args.story_id, None);
        assert!(args.completed);
    }
}
