//! Bootstrap state machine
//!
//! Valid transitions:
//! 1. Unchecked  → Gated              (on: ProbeSucceeded)
//! 2. Unchecked  → Failed             (on: ProbeFailed)
//! 3. Gated      → VersionRejected    (on: GateRejected)
//! 4. Gated      → AlreadyInitialized (on: FlagPresent)
//! 5. Gated      → Installing         (on: FlagAbsent)
//! 6. Installing → Done               (on: InstallsComplete)
//! 7. Installing → Failed             (on: InstallFailed)
//! 8. Gated      → Failed             (on: Aborted)
//! 9. Installing → Failed             (on: Aborted)
//!
//! Terminal states absorb every event.

use crate::errors::{BootstrapError, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BootstrapState {
    /// Nothing checked yet
    Unchecked,

    /// Service reachable, versions and flag not yet settled
    Gated,

    /// A required module is too old (terminal)
    VersionRejected,

    /// Flag already present (terminal)
    AlreadyInitialized,

    /// Artifacts being installed
    Installing,

    /// Both artifacts installed and flag written (terminal)
    Done,

    /// Unrecoverable failure (terminal)
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    ProbeSucceeded,
    ProbeFailed,
    GateRejected,
    FlagPresent,
    FlagAbsent,
    InstallsComplete,
    InstallFailed,

    /// Unexpected collaborator error outside the install steps
    Aborted,
}

impl BootstrapState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BootstrapState::VersionRejected
                | BootstrapState::AlreadyInitialized
                | BootstrapState::Done
                | BootstrapState::Failed
        )
    }

    /// Next state for `event`, or an error if the edge does not exist
    pub fn transition(&self, event: StateEvent) -> Result<BootstrapState> {
        use BootstrapState::*;
        use StateEvent::*;

        if self.is_terminal() {
            return Ok(*self);
        }

        let next = match (self, event) {
            (Unchecked, ProbeSucceeded) => Gated,
            (Unchecked, ProbeFailed) => Failed,

            (Gated, GateRejected) => VersionRejected,
            (Gated, FlagPresent) => AlreadyInitialized,
            (Gated, FlagAbsent) => Installing,
            (Gated, Aborted) => Failed,

            (Installing, InstallsComplete) => Done,
            (Installing, InstallFailed) => Failed,
            (Installing, Aborted) => Failed,

            (from, event) => {
                return Err(BootstrapError::InvalidTransition {
                    from: format!("{:?}", from),
                    event: format!("{:?}", event),
                });
            }
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = BootstrapState::Unchecked;
        let state = state.transition(StateEvent::ProbeSucceeded).unwrap();
        assert_eq!(state, BootstrapState::Gated);
        let state = state.transition(StateEvent::FlagAbsent).unwrap();
        assert_eq!(state, BootstrapState::Installing);
        let state = state.transition(StateEvent::InstallsComplete).unwrap();
        assert_eq!(state, BootstrapState::Done);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_soft_stops_are_terminal() {
        let gated = BootstrapState::Gated;
        assert_eq!(
            gated.transition(StateEvent::GateRejected).unwrap(),
            BootstrapState::VersionRejected
        );
        assert_eq!(
            gated.transition(StateEvent::FlagPresent).unwrap(),
            BootstrapState::AlreadyInitialized
        );
        assert!(BootstrapState::VersionRejected.is_terminal());
        assert!(BootstrapState::AlreadyInitialized.is_terminal());
    }

    #[test]
    fn test_probe_failure() {
        assert_eq!(
            BootstrapState::Unchecked
                .transition(StateEvent::ProbeFailed)
                .unwrap(),
            BootstrapState::Failed
        );
    }

    #[test]
    fn test_terminal_absorbs_events() {
        assert_eq!(
            BootstrapState::Done
                .transition(StateEvent::FlagAbsent)
                .unwrap(),
            BootstrapState::Done
        );
        assert_eq!(
            BootstrapState::Failed
                .transition(StateEvent::InstallsComplete)
                .unwrap(),
            BootstrapState::Failed
        );
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(BootstrapState::Unchecked
            .transition(StateEvent::FlagAbsent)
            .is_err());
        assert!(BootstrapState::Gated
            .transition(StateEvent::InstallsComplete)
            .is_err());
        assert!(BootstrapState::Installing
            .transition(StateEvent::FlagPresent)
            .is_err());
    }
}
