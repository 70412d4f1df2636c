//! Storyteller — speech synthesis adapter.
//!
//! Turns a story segment into a stored, publicly fetchable audio file by
//! driving an external speech provider and a blob store.

pub mod adapter;

pub use adapter::SpeechSynthesisAdapter;
