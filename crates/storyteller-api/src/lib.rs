//! Storyteller API — HTTP surface for chat turns and speech synthesis.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;
pub mod telemetry;
