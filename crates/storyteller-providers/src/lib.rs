//! Concrete implementations of the external collaborators: an
//! OpenAI-compatible chat-completions client for xAI, a Deepgram speech
//! client, and a local-filesystem blob store.

pub mod blob;
pub mod deepgram;
pub mod sse;
pub mod xai;
