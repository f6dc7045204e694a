//! Closed state machines for workflow statuses.

use crate::error::DomainResult;

/// A workflow status expressed as a closed set of variants.
///
/// Transitions are pure: `(current, action) -> Result<next, DomainError>`.
/// Authorization is not part of the machine; callers check it before asking
/// for a transition.
pub trait StateMachine: Copy + Eq + core::fmt::Debug + core::fmt::Display {
    type Action: Copy + core::fmt::Debug + core::fmt::Display;

    /// Compute the status reached by applying `action` to `self`.
    fn transition(self, action: Self::Action) -> DomainResult<Self>;

    /// Whether no further action is accepted.
    fn is_terminal(self) -> bool;

    /// Whether `action` is accepted from `self`.
    fn allows(self, action: Self::Action) -> bool {
        self.transition(action).is_ok()
    }
}
