//! Test models — scripted `LanguageModel` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use storyteller_core::model::{LanguageModel, ModelError, ModelEvent, ModelRequest, ModelStream};

/// A model that replays a fixed script of events and records every request.
/// A `None` entry in the script yields a transport error at that point.
#[derive(Debug)]
pub struct ScriptedLanguageModel {
    script: Vec<Option<ModelEvent>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedLanguageModel {
    /// Creates a model that emits `events` and ends.
    #[must_use]
    pub fn new(events: Vec<ModelEvent>) -> Self {
        Self {
            script: events.into_iter().map(Some).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a model that emits `events` and then fails mid-stream.
    #[must_use]
    pub fn failing_after(events: Vec<ModelEvent>) -> Self {
        let mut script: Vec<Option<ModelEvent>> = events.into_iter().map(Some).collect();
        script.push(None);
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all requests received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, ModelError> {
        self.requests.lock().unwrap().push(request);
        let items: Vec<Result<ModelEvent, ModelError>> = self
            .script
            .iter()
            .cloned()
            .map(|entry| entry.ok_or_else(|| ModelError::Transport("connection reset".into())))
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}

/// A model whose generations never start.
#[derive(Debug)]
pub struct FailingLanguageModel;

#[async_trait]
impl LanguageModel for FailingLanguageModel {
    async fn stream(&self, _request: ModelRequest) -> Result<ModelStream, ModelError> {
        Err(ModelError::Provider {
            status: 503,
            message: "model overloaded".into(),
        })
    }
}
