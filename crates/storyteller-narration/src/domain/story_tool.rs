//! The story tool: the one function the storyteller model may call.

use std::sync::Arc;

use serde_json::json;
use storyteller_core::ids::IdGenerator;
use storyteller_core::model::ToolDefinition;
use storyteller_core::speech::SpeechSynthesizer;
use storyteller_core::story::{STORY_TOOL_NAME, StoryResult, StoryToolArgs};
use tracing::{info, instrument, warn};

/// Stable identifier of the tool, independent of the name the model sees.
pub const STORY_TOOL_ID: &str = "storyteller.generate";

/// Narrates a story segment and packages it with its choices.
pub struct StoryTool {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    ids: Arc<dyn IdGenerator>,
}

impl StoryTool {
    /// Creates a tool that narrates through `synthesizer`.
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { synthesizer, ids }
    }

    /// Describes the tool to the language model.
    #[must_use]
    pub fn definition() -> ToolDefinition {
        ToolDefinition {
            name: STORY_TOOL_NAME.to_owned(),
            description: "Generate a story with choices and story content. The story content \
                          will be used to generate audio."
                .to_owned(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "story": {
                        "type": "string",
                        "description": "The story that speech model will use"
                    },
                    "choices": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "The choices that the user will have"
                    },
                    "completed": {
                        "type": "boolean",
                        "description": "Whether the story is completed"
                    },
                    "storyId": {
                        "type": "string",
                        "description": "ID for the story segment for storage"
                    }
                },
                "required": ["story", "choices", "completed"],
                "additionalProperties": false
            }),
        }
    }

    /// Parses raw model arguments and runs the tool.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error if the arguments do not match the
    /// tool's schema. Synthesis failures never surface here.
    pub async fn execute(&self, args: &serde_json::Value) -> Result<StoryResult, serde_json::Error> {
        let args: StoryToolArgs = serde_json::from_value(args.clone())?;
        Ok(self.generate(args).await)
    }

    /// Narrates the segment. Always returns a result: if synthesis fails the
    /// segment is kept and `audio_url` is `None`.
    #[instrument(
        skip(self, args),
        fields(tool = STORY_TOOL_ID, completed = args.completed, choices = args.choices.len())
    )]
    pub async fn generate(&self, args: StoryToolArgs) -> StoryResult {
        let StoryToolArgs {
            story,
            choices,
            completed,
            story_id,
        } = args;

        let story_id = story_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.ids.next_id().to_string());

        let audio_url = match self.synthesizer.synthesize(&story, &story_id).await {
            Ok(url) => {
                info!(%story_id, "story segment narrated");
                Some(url)
            }
            Err(e) => {
                warn!(%story_id, error = %e, "narration unavailable; returning story without audio");
                None
            }
        };

        StoryResult {
            story,
            choices,
            completed,
            audio_url,
            story_id,
        }
    }
}

impl std::fmt::Debug for StoryTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryTool").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyteller_test_support::{FailingSynthesizer, SequenceIds, StubSynthesizer};
    use uuid::Uuid;

    fn args(story_id: Option<&str>) -> StoryToolArgs {
        StoryToolArgs {
            story: "Alee found a glowing map under his bed.".to_owned(),
            choices: vec!["Follow the map".to_owned(), "Show his sister".to_owned()],
            completed: false,
            story_id: story_id.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn test_generate_returns_audio_url_from_synthesizer() {
        // Arrange
        let synthesizer = Arc::new(StubSynthesizer::new("https://cdn.test/audio"));
        let tool = StoryTool::new(synthesizer.clone(), Arc::new(SequenceIds::default()));

        // Act
        let result = tool.generate(args(Some("seg-7"))).await;

        // Assert
        assert_eq!(result.story_id, "seg-7");
        assert_eq!(
            result.audio_url.as_deref(),
            Some("https://cdn.test/audio/seg-7.mp3")
        );
        assert_eq!(result.choices.len(), 2);
        assert_eq!(
            synthesizer.calls(),
            vec![(result.story.clone(), "seg-7".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_generate_mints_story_id_when_absent() {
        let synthesizer = Arc::new(StubSynthesizer::new("https://cdn.test/audio"));
        let tool = StoryTool::new(synthesizer.clone(), Arc::new(SequenceIds::default()));

        let result = tool.generate(args(None)).await;

        let expected = Uuid::from_u128(1).to_string();
        assert_eq!(result.story_id, expected);
        assert_eq!(synthesizer.calls()[0].1, expected);
    }

    #[tokio::test]
    async fn test_generate_degrades_to_null_audio_when_synthesis_fails() {
        let tool = StoryTool::new(Arc::new(FailingSynthesizer), Arc::new(SequenceIds::default()));

        let result = tool.generate(args(Some("seg-1"))).await;

        assert_eq!(result.audio_url, None);
        assert_eq!(result.story, "Alee found a glowing map under his bed.");
        assert_eq!(result.story_id, "seg-1");
    }

    #[tokio::test]
    async fn test_execute_rejects_arguments_missing_story() {
        let tool = StoryTool::new(
            Arc::new(StubSynthesizer::new("https://cdn.test")),
            Arc::new(SequenceIds::default()),
        );

        let result = tool
            .execute(&json!({ "choices": [], "completed": true }))
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_definition_requires_story_fields() {
        let definition = StoryTool::definition();

        assert_eq!(definition.name, "storyTelling");
        assert_eq!(
            definition.parameters["required"],
            json!(["story", "choices", "completed"])
        );
    }
}
