//! Application services that drive a turn end to end.

pub mod chunking;
pub mod turn_handler;
