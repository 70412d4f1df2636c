//! Shared test mocks and utilities for the Storyteller service.

mod clock;
mod ids;
mod model;
mod speech;
mod store;

pub use clock::FixedClock;
pub use ids::SequenceIds;
pub use model::{FailingLanguageModel, ScriptedLanguageModel};
pub use speech::{
    FailingSpeechProvider, FailingSynthesizer, MemoryBlobStore, PendingSynthesizer,
    SilentSpeechProvider, StubSpeechProvider, StubSynthesizer,
};
pub use store::{FailingChatStore, InMemoryChatStore};
