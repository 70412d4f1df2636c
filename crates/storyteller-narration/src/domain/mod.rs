//! Domain model of a storytelling turn.

pub mod commands;
pub mod errors;
pub mod events;
pub mod phase;
pub mod prompt;
pub mod story_tool;
pub mod transcript;
