//! Registration errors.

use super::event::Event;
use super::state::State;
use super::transition::Transition;
use thiserror::Error;

/// A transition was rejected because its `(event, from)` pair is already
/// taken.
///
/// Carries both sides of the conflict so the caller can report which rule
/// won and which one was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("duplicate transition: cannot add {attempted}, {existing} is already registered")]
pub struct DuplicateTransition<E: Event, S: State> {
    /// The transition that owns the slot
    pub existing: Transition<E, S>,
    /// The transition that was refused
    pub attempted: Transition<E, S>,
}

impl<E: Event, S: State> DuplicateTransition<E, S> {
    pub fn new(existing: Transition<E, S>, attempted: Transition<E, S>) -> Self {
        Self {
            existing,
            attempted,
        }
    }
}
