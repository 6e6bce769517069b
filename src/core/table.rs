//! The transition table: registration, duplicate detection and lookup.

use super::error::DuplicateTransition;
use super::event::Event;
use super::state::State;
use super::transition::Transition;
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Validated collection of transitions, bucketed by event.
///
/// Invariant: no two transitions share the same `(event, from)` pair, so for
/// any state and event there is at most one applicable transition.
#[derive(Clone, Debug)]
pub struct TransitionTable<E: Event, S: State> {
    buckets: HashMap<E, Vec<Transition<E, S>>>,
    len: usize,
}

impl<E: Event, S: State> Default for TransitionTable<E, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event, S: State> TransitionTable<E, S> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            len: 0,
        }
    }

    /// Number of registered transitions.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The already registered transition occupying `transition`'s slot, if any.
    fn conflict(&self, transition: &Transition<E, S>) -> Option<&Transition<E, S>> {
        self.buckets
            .get(&transition.event)?
            .iter()
            .find(|existing| existing.from == transition.from)
    }

    fn insert(&mut self, transition: Transition<E, S>) {
        self.buckets
            .entry(transition.event.clone())
            .or_default()
            .push(transition);
        self.len += 1;
    }

    /// Register a single transition.
    ///
    /// Fails with [`DuplicateTransition`] when the `(event, from)` pair is
    /// already registered; the table is left unchanged in that case.
    pub fn register(
        &mut self,
        transition: Transition<E, S>,
    ) -> Result<(), DuplicateTransition<E, S>> {
        if let Some(existing) = self.conflict(&transition) {
            return Err(DuplicateTransition::new(existing.clone(), transition));
        }
        self.insert(transition);
        Ok(())
    }

    /// Register a batch of transitions, all or nothing.
    ///
    /// The batch is checked against the table and against itself before
    /// anything is inserted. On the first conflict the error is returned and
    /// none of the batch is applied.
    pub fn register_all<I>(&mut self, transitions: I) -> Result<(), DuplicateTransition<E, S>>
    where
        I: IntoIterator<Item = Transition<E, S>>,
    {
        let batch: Vec<_> = transitions.into_iter().collect();

        for (index, transition) in batch.iter().enumerate() {
            if let Some(existing) = self.conflict(transition) {
                return Err(DuplicateTransition::new(
                    existing.clone(),
                    transition.clone(),
                ));
            }
            if let Some(earlier) = batch[..index]
                .iter()
                .find(|earlier| earlier.conflicts_with(transition))
            {
                return Err(DuplicateTransition::new(
                    earlier.clone(),
                    transition.clone(),
                ));
            }
        }

        for transition in batch {
            self.insert(transition);
        }
        Ok(())
    }

    /// Check a batch without registering it, accumulating ALL conflicts.
    ///
    /// Each transition is checked against the table and against the
    /// transitions before it in the batch.
    pub fn validate(
        &self,
        transitions: &[Transition<E, S>],
    ) -> Validation<(), NonEmptyVec<DuplicateTransition<E, S>>> {
        let checks: Vec<Validation<(), NonEmptyVec<DuplicateTransition<E, S>>>> = transitions
            .iter()
            .enumerate()
            .map(|(index, transition)| {
                let existing = self.conflict(transition).or_else(|| {
                    transitions[..index]
                        .iter()
                        .find(|earlier| earlier.conflicts_with(transition))
                });
                match existing {
                    Some(existing) => Validation::fail(DuplicateTransition::new(
                        existing.clone(),
                        transition.clone(),
                    )),
                    None => Validation::success(()),
                }
            })
            .collect();

        Validation::all_vec(checks).map(|_| ())
    }

    /// Find the unique transition for `event` out of `current`.
    ///
    /// Returns `None` when nothing matches. More than one candidate means the
    /// uniqueness invariant was broken; that is also treated as no match
    /// rather than picking one arbitrarily.
    pub fn resolve(&self, event: &E, current: &S) -> Option<&Transition<E, S>> {
        let mut candidates = self
            .buckets
            .get(event)?
            .iter()
            .filter(|transition| &transition.from == current);

        let found = candidates.next()?;
        if candidates.next().is_some() {
            return None;
        }
        Some(found)
    }

    /// All transitions triggered by `event`, in registration order.
    pub fn transitions_for(&self, event: &E) -> &[Transition<E, S>] {
        self.buckets.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Events that have a transition out of `state`.
    pub fn events_from(&self, state: &S) -> Vec<&E> {
        self.iter()
            .filter(|transition| &transition.from == state)
            .map(|transition| &transition.event)
            .collect()
    }

    /// Iterate over every registered transition.
    ///
    /// Order is stable within an event's bucket; buckets themselves come in
    /// no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Transition<E, S>> {
        self.buckets.values().flatten()
    }

    /// Insert without the uniqueness check, to build a broken table.
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, transition: Transition<E, S>) {
        self.insert(transition);
    }
}
