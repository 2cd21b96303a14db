//! State machine trait for status enums.
//!
//! Provides a consistent interface for validating and performing state transitions
//! across lifecycle statuses (chatbot sessions, agent transfers).

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for TransferStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Active, Resumed) | (Active, Expired))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Active => vec![Resumed, Expired],
///             Resumed | Expired => vec![],
///         }
///     }
/// }
///
/// // Usage:
/// let new_status = current_status.transition_to(TransferStatus::Expired)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    ///
    /// This is the preferred way to change state, as it ensures
    /// the transition is valid according to the state machine rules.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Delivery {
        Queued,
        Sending,
        Delivered,
        Failed,
    }

    impl StateMachine for Delivery {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Delivery::*;
            match self {
                Queued => vec![Sending],
                Sending => vec![Delivered, Failed],
                Delivered | Failed => vec![],
            }
        }
    }

    #[test]
    fn valid_transition_returns_target() {
        assert_eq!(
            Delivery::Sending.transition_to(Delivery::Failed),
            Ok(Delivery::Failed)
        );
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let err = Delivery::Queued.transition_to(Delivery::Delivered).unwrap_err();
        assert!(err.to_string().contains("Queued"));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(Delivery::Delivered.is_terminal());
        assert!(Delivery::Failed.is_terminal());
        assert!(!Delivery::Queued.is_terminal());
    }
}
