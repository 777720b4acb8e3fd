//! Transition tables for entity status enums.
//!
//! Each status enum lists its allowed moves as data. Lifecycle services ask
//! the table before writing anything; the table never touches storage.

use std::fmt;

use crate::core::error::{AppError, Result};

pub trait StatusTransitions: Copy + Eq + fmt::Display + Sized + 'static {
    /// `(from, allowed targets)` for every status. Terminal statuses map to an empty slice.
    const TRANSITIONS: &'static [(Self, &'static [Self])];

    /// Statuses reachable from `self` in one step
    fn allowed_targets(self) -> &'static [Self] {
        Self::TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    fn can_transition_to(self, next: Self) -> bool {
        self.allowed_targets().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Validate a move, returning the new status or `InvalidTransition`
    fn transition_to(self, next: Self) -> Result<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition(format!(
                "cannot change status from '{}' to '{}'",
                self, next
            )))
        }
    }
}
