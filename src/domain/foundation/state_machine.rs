//! State machine trait for status enums.
//!
//! Ledger and subscription statuses implement this so every status change
//! goes through one validated path.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define the transition table; validated transitions and
/// terminal detection come for free.
///
/// ```ignore
/// let next = TransactionStatus::Pending.transition_to(TransactionStatus::Completed)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
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
    enum Checkout {
        Open,
        Paid,
        Abandoned,
    }

    impl StateMachine for Checkout {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Checkout::Open => vec![Checkout::Paid, Checkout::Abandoned],
                Checkout::Paid | Checkout::Abandoned => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(Checkout::Open.transition_to(Checkout::Paid), Ok(Checkout::Paid));
    }

    #[test]
    fn transition_to_fails_out_of_terminal_state() {
        let err = Checkout::Paid.transition_to(Checkout::Open).unwrap_err();
        assert_eq!(err.field(), "state_transition");
    }

    #[test]
    fn terminal_states_have_no_targets() {
        assert!(Checkout::Paid.is_terminal());
        assert!(Checkout::Abandoned.is_terminal());
        assert!(!Checkout::Open.is_terminal());
    }
}
