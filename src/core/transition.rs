//! The transition value type.

use super::event::Event;
use super::state::State;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable rule: when `event` occurs while the machine is in `from`,
/// the machine moves to `to`.
///
/// Transitions are plain values. The table keeps its own copies, so a
/// registered transition can never be changed afterwards.
///
/// # Example
///
/// ```rust
/// use switchyard::core::Transition;
/// use switchyard::{event_enum, state_enum};
///
/// state_enum! {
///     enum Door { Closed, Open, Locked }
/// }
///
/// event_enum! {
///     enum Action { Push, Pull, Lock }
/// }
///
/// let open = Transition::new(Action::Push, Door::Closed, Door::Open);
/// assert_eq!(open.to_string(), "Closed -> Open with event Push");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Transition<E, S> {
    /// The event that triggers this transition
    pub event: E,
    /// The state the machine must be in
    pub from: S,
    /// The state the machine moves to
    pub to: S,
}

impl<E: Event, S: State> Transition<E, S> {
    pub fn new(event: E, from: S, to: S) -> Self {
        Self { event, from, to }
    }

    /// Build one transition per source state, all triggered by the same
    /// event and leading to the same destination.
    ///
    /// ```rust
    /// use switchyard::core::Transition;
    /// use switchyard::{event_enum, state_enum};
    ///
    /// state_enum! {
    ///     enum Job { Queued, Running, Cancelled }
    /// }
    ///
    /// event_enum! {
    ///     enum Cmd { Cancel }
    /// }
    ///
    /// let cancels = Transition::fan_in(Cmd::Cancel, [Job::Queued, Job::Running], Job::Cancelled);
    /// assert_eq!(cancels.len(), 2);
    /// assert!(cancels.iter().all(|t| t.to == Job::Cancelled));
    /// ```
    pub fn fan_in<I>(event: E, from: I, to: S) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
    {
        from.into_iter()
            .map(|from| Self::new(event.clone(), from, to.clone()))
            .collect()
    }

    /// Whether this transition occupies the same `(event, from)` slot.
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.event == other.event && self.from == other.from
    }
}

impl<E: Event, S: State> fmt::Display for Transition<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} with event {}",
            self.from.name(),
            self.to.name(),
            self.event.name()
        )
    }
}
