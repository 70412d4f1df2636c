//! Storyteller — story tool and conversation orchestration.
//!
//! Responsible for running one chat turn: authorizing it, persisting the
//! user's message, streaming the model's narration, invoking the story tool
//! (and through it speech synthesis), and persisting the assistant's reply.

pub mod application;
pub mod domain;
