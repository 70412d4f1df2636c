//! Turn state machine.

use tracing::debug;
use uuid::Uuid;

use super::errors::TurnError;

/// Where a turn is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Accepted, model output not yet read.
    Idle,
    /// Reading model output.
    Streaming,
    /// Waiting on the story tool (and speech synthesis).
    AwaitingTool,
    /// Resolving and persisting the assistant message.
    Finalizing,
    /// Finished normally.
    Done,
    /// Aborted by a generation failure.
    Failed,
}

impl TurnPhase {
    /// Returns `true` once the turn can no longer change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns `true` if `next` may follow `self`.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Idle, Self::Streaming)
            | (Self::Streaming, Self::AwaitingTool | Self::Finalizing)
            | (Self::AwaitingTool, Self::Streaming)
            | (Self::Finalizing, Self::Done) => true,
            (from, Self::Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Tracks the phase of one turn and logs every transition.
#[derive(Debug)]
pub struct TurnMachine {
    turn_id: Uuid,
    phase: TurnPhase,
}

impl TurnMachine {
    /// Starts a machine in `Idle`.
    #[must_use]
    pub fn new(turn_id: Uuid) -> Self {
        Self {
            turn_id,
            phase: TurnPhase::Idle,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns `TurnError::IllegalTransition` if `next` may not follow the
    /// current phase; the phase is left unchanged.
    pub fn advance(&mut self, next: TurnPhase) -> Result<(), TurnError> {
        if !self.phase.can_advance_to(next) {
            return Err(TurnError::IllegalTransition {
                from: self.phase,
                to: next,
            });
        }
        debug!(turn_id = %self.turn_id, from = ?self.phase, to = ?next, "turn phase changed");
        self.phase = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_follows_tool_round_trip() {
        let mut machine = TurnMachine::new(Uuid::new_v4());

        for next in [
            TurnPhase::Streaming,
            TurnPhase::AwaitingTool,
            TurnPhase::Streaming,
            TurnPhase::Finalizing,
            TurnPhase::Done,
        ] {
            machine.advance(next).unwrap();
        }

        assert_eq!(machine.phase(), TurnPhase::Done);
    }

    #[test]
    fn test_machine_rejects_skipping_streaming() {
        let mut machine = TurnMachine::new(Uuid::new_v4());

        let result = machine.advance(TurnPhase::Finalizing);

        assert!(matches!(
            result,
            Err(TurnError::IllegalTransition {
                from: TurnPhase::Idle,
                to: TurnPhase::Finalizing
            })
        ));
        assert_eq!(machine.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_terminal_phases_cannot_fail_again() {
        assert!(TurnPhase::AwaitingTool.can_advance_to(TurnPhase::Failed));
        assert!(!TurnPhase::Done.can_advance_to(TurnPhase::Failed));
        assert!(!TurnPhase::Failed.can_advance_to(TurnPhase::Failed));
    }
}
