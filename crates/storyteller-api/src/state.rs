//! Shared application state.

use std::sync::Arc;

use storyteller_core::speech::SpeechSynthesizer;
use storyteller_narration::application::turn_handler::TurnOrchestrator;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runs chat turns.
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Backs the standalone synthesis endpoint.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        orchestrator: Arc<TurnOrchestrator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            orchestrator,
            synthesizer,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}
