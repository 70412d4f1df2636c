//! Storyteller Core — shared domain types and collaborator traits.
//!
//! This crate defines the chat/message model, the story segment result, the
//! quota policy, and the traits every external collaborator (store, language
//! model, speech provider, blob store) is reached through. It contains no
//! infrastructure code.

pub mod chat;
pub mod clock;
pub mod error;
pub mod ids;
pub mod message;
pub mod model;
pub mod quota;
pub mod repository;
pub mod speech;
pub mod story;
pub mod user;
