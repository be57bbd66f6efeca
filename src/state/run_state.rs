/// Run state definitions for the batch orchestrator
///
/// This module defines all states a batch run moves through and which
/// transitions between them are legal.
use std::fmt;

/// Represents the current state of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    /// No run has started yet
    #[default]
    Idle,

    /// Stages are executing
    Running,

    /// Cancellation was requested; the current fetch is allowed to finish
    Stopping,

    // ===== Terminal States =====
    /// The run returned early after a cancellation request
    Stopped,

    /// Every stage was attempted
    Done,
}

impl RunState {
    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// ```text
    /// Idle -> Running -> (Stopping -> Stopped) | Done
    /// ```
    ///
    /// Terminal states may restart a fresh run.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Stopping)
                | (Self::Running, Self::Done)
                | (Self::Stopping, Self::Stopped)
                | (Self::Stopped, Self::Running)
                | (Self::Done, Self::Running)
        )
    }

    /// Lower-case name used in log lines and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(RunState::default(), RunState::Idle);
    }

    #[test]
    fn test_legal_transitions() {
        assert!(RunState::Idle.can_transition_to(RunState::Running));
        assert!(RunState::Running.can_transition_to(RunState::Done));
        assert!(RunState::Running.can_transition_to(RunState::Stopping));
        assert!(RunState::Stopping.can_transition_to(RunState::Stopped));
        assert!(RunState::Done.can_transition_to(RunState::Running));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!RunState::Idle.can_transition_to(RunState::Done));
        assert!(!RunState::Idle.can_transition_to(RunState::Stopping));
        assert!(!RunState::Stopping.can_transition_to(RunState::Done));
        assert!(!RunState::Done.can_transition_to(RunState::Stopped));
        assert!(!RunState::Running.can_transition_to(RunState::Stopped));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", RunState::Idle), "idle");
        assert_eq!(format!("{}", RunState::Stopping), "stopping");
        assert_eq!(format!("{}", RunState::Done), "done");
    }
}
