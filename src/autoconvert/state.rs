//! Build state of an element.

use std::fmt;

/// Where an element is in its build cycle.
///
/// The only legal path is `Idle -> Draining -> Rebuilding -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildState {
    /// Data flows through the current graph (or no graph exists yet).
    #[default]
    Idle,
    /// End-of-stream was injected and the old graph is emptying.
    Draining,
    /// The old graph is gone and a new one is being planned.
    Rebuilding,
}

impl BuildState {
    /// Check if `next` may follow this state.
    pub fn can_transition_to(self, next: BuildState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Draining)
                | (Self::Draining, Self::Rebuilding)
                | (Self::Rebuilding, Self::Idle)
        )
    }

    /// Move to `next` if legal.
    ///
    /// An illegal transition is a logic error: it asserts in debug builds and
    /// is logged and refused otherwise.
    pub fn transition(&mut self, next: BuildState) -> bool {
        if !self.can_transition_to(next) {
            debug_assert!(false, "illegal build state transition {self} -> {next}");
            tracing::error!(from = %self, to = %next, "illegal build state transition refused");
            return false;
        }
        *self = next;
        true
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Draining => "Draining",
            Self::Rebuilding => "Rebuilding",
        };
        f.write_str(name)
    }
}
