//! Turn failure taxonomy.

use storyteller_core::error::DomainError;
use storyteller_core::model::ModelError;
use thiserror::Error;

use super::phase::TurnPhase;

/// Why a turn could not run or did not finish.
#[derive(Debug, Error)]
pub enum TurnError {
    /// No identity accompanied the request.
    #[error("unauthorized")]
    Unauthorized,

    /// The identity does not resolve to a stored user.
    #[error("user not found")]
    UserNotFound,

    /// The user has used up the daily message ceiling.
    #[error("quota exceeded: {used} of {ceiling} messages used in the last 24 hours")]
    QuotaExceeded {
        /// Messages in the window.
        used: u64,
        /// Allowed messages in the window.
        ceiling: u64,
    },

    /// The chat belongs to another user.
    #[error("forbidden")]
    Forbidden,

    /// The request carried no usable user message.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The model's response batch held no assistant-authored message.
    #[error("no assistant message found")]
    NoAssistantMessage,

    /// The model or the tool failed during generation.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The model could not start generating.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] DomainError),

    /// The turn state machine was driven out of order.
    #[error("illegal turn transition from {from:?} to {to:?}")]
    IllegalTransition {
        /// Phase the turn was in.
        from: TurnPhase,
        /// Phase that was requested.
        to: TurnPhase,
    },
}
