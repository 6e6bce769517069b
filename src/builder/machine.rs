//! Builder for constructing machines.

use crate::builder::error::BuildError;
use crate::core::{Event, State, Transition, TransitionTable};
use crate::diagnostics::{DiagnosticSink, NoopSink, TracingSink};
use crate::machine::{Machine, MachineConfig};
use std::sync::Arc;
use stillwater::validation::Validation;

/// Builder for constructing machines with a fluent API.
///
/// Unlike [`Machine::new`], `build` reports every conflicting transition at
/// once and returns an error instead of panicking outside a Tokio runtime.
///
/// Diagnostics default to [`NoopSink`], as with [`Machine::new`]. Setting a
/// [`label`](Self::label) switches to a [`TracingSink`] under that label, and
/// [`sink`](Self::sink) overrides both.
///
/// A machine with no transitions is valid: more can be registered on the
/// built machine at any time.
pub struct MachineBuilder<E: Event, S: State> {
    initial: Option<S>,
    transitions: Vec<Transition<E, S>>,
    config: MachineConfig,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl<E: Event, S: State> MachineBuilder<E, S> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            initial: None,
            transitions: Vec::new(),
            config: MachineConfig::default(),
            sink: None,
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Add a transition.
    pub fn transition(mut self, event: E, from: S, to: S) -> Self {
        self.transitions.push(Transition::new(event, from, to));
        self
    }

    /// Add multiple transitions at once.
    pub fn transitions(mut self, transitions: Vec<Transition<E, S>>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    /// Add one transition per source state, see [`Transition::fan_in`].
    pub fn fan_in<I>(mut self, event: E, from: I, to: S) -> Self
    where
        I: IntoIterator<Item = S>,
    {
        self.transitions.extend(Transition::fan_in(event, from, to));
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    pub fn logging(mut self, enabled: bool) -> Self {
        self.config.logging_enabled = enabled;
        self
    }

    /// Log through `tracing`, tagged with `label`.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = Some(label.into());
        self
    }

    /// Report diagnostics to `sink`, whether or not a label is set.
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the machine.
    /// Returns an error if the initial state is missing or transitions conflict.
    pub fn build(self) -> Result<Machine<E, S>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        if let Validation::Failure(errors) = TransitionTable::new().validate(&self.transitions) {
            return Err(BuildError::ConflictingTransitions {
                conflicts: errors.iter().map(|e| e.to_string()).collect(),
            });
        }

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(BuildError::NoRuntime);
        }

        let sink: Arc<dyn DiagnosticSink> = match (self.sink, &self.config.label) {
            (Some(sink), _) => sink,
            (None, Some(label)) => Arc::new(TracingSink::new(label.clone())),
            (None, None) => Arc::new(NoopSink),
        };
        let mut machine = Machine::with_sink(initial, self.config, sink);
        if let Err(err) = machine.register_all(self.transitions) {
            return Err(BuildError::ConflictingTransitions {
                conflicts: vec![err.to_string()],
            });
        }

        Ok(machine)
    }
}

impl<E: Event, S: State> Default for MachineBuilder<E, S> {
    fn default() -> Self {
        Self::new()
    }
}
