//! The machine controller: event resolution, reset and observation.

use super::config::MachineConfig;
use super::subscription::Subscription;
use super::worker::{self, Command, Shared};
use crate::core::{DuplicateTransition, Event, State, Transition, TransitionTable};
use crate::diagnostics::{DiagnosticSink, Level, NoopSink, TracingSink};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Event-driven state machine with a serialized execution queue.
///
/// Events are resolved against the current state on the caller's side and
/// the resulting state change is queued to a single worker task, which
/// applies changes one at a time in submission order.
///
/// Resolution reads the current state *before* enqueueing. Two events
/// emitted back to back both resolve against the same state, even if the
/// first one will have moved the machine by the time the second is applied.
///
/// Dropping the machine stops the worker: no queued command is applied once
/// `drop` returns, and every subscription then closes.
pub struct Machine<E: Event, S: State> {
    id: Uuid,
    table: TransitionTable<E, S>,
    shared: Arc<Shared<E, S>>,
    queue: mpsc::UnboundedSender<Command<E, S>>,
    worker: JoinHandle<()>,
}

impl<E: Event, S: State> Machine<E, S> {
    /// Create a machine in `initial` with the default configuration and no
    /// diagnostics.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime. Use
    /// [`MachineBuilder`](crate::builder::MachineBuilder) to get an error
    /// instead.
    pub fn new(initial: S) -> Self {
        Self::with_sink(initial, MachineConfig::default(), Arc::new(NoopSink))
    }

    /// Create a machine that logs through `tracing`, labelled from `config`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn with_config(initial: S, config: MachineConfig) -> Self {
        let sink = match &config.label {
            Some(label) => TracingSink::new(label.clone()),
            None => TracingSink::default(),
        };
        Self::with_sink(initial, config, Arc::new(sink))
    }

    /// Create a machine reporting to a caller supplied sink.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn with_sink(initial: S, config: MachineConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        let shared = Arc::new(Shared::new(
            initial,
            config.effective_capacity(),
            sink,
            config.logging_enabled,
        ));
        let (queue, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(worker::run(shared.clone(), receiver));

        Self {
            id: Uuid::new_v4(),
            table: TransitionTable::new(),
            shared,
            queue,
            worker,
        }
    }

    /// Unique identifier of this machine.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn initial_state(&self) -> &S {
        &self.shared.initial
    }

    /// The most recently applied state.
    ///
    /// Queued but unapplied commands are not reflected.
    pub fn current_state(&self) -> S {
        self.shared.state.current()
    }

    /// Check if machine is in a final state
    pub fn is_final(&self) -> bool {
        self.current_state().is_final()
    }

    pub fn table(&self) -> &TransitionTable<E, S> {
        &self.table
    }

    /// Register a transition.
    ///
    /// A duplicate `(event, from)` pair is refused, reported to the sink as
    /// a fault and returned to the caller; the table is left as it was.
    pub fn register(
        &mut self,
        transition: Transition<E, S>,
    ) -> Result<(), DuplicateTransition<E, S>> {
        self.table
            .register(transition)
            .map_err(|err| self.refused(err))
    }

    /// Register a batch of transitions, all or nothing.
    ///
    /// See [`TransitionTable::register_all`].
    pub fn register_all<I>(&mut self, transitions: I) -> Result<(), DuplicateTransition<E, S>>
    where
        I: IntoIterator<Item = Transition<E, S>>,
    {
        self.table
            .register_all(transitions)
            .map_err(|err| self.refused(err))
    }

    fn refused(&self, err: DuplicateTransition<E, S>) -> DuplicateTransition<E, S> {
        self.shared.log(
            Level::Fault,
            &format!(
                "Failed to register {}: {} is already registered",
                err.attempted, err.existing
            ),
        );
        err
    }

    /// Submit an event.
    ///
    /// Returns immediately. When a transition matches the current state it is
    /// queued; otherwise the event is dropped. Use [`wait_idle`](Self::wait_idle)
    /// or a subscription to observe completion.
    pub fn emit(&self, event: E) {
        let current = self.shared.state.current();
        match self.table.resolve(&event, &current) {
            Some(transition) => self.enqueue(Command::Apply(transition.clone())),
            None => self.shared.log(
                Level::Debug,
                &format!("Dropping event {} in state {}", event.name(), current.name()),
            ),
        }
    }

    /// Force the machine back to its initial state.
    ///
    /// Goes through the same queue as transitions, so it lands in submission
    /// order, but bypasses the table and fires no transition notifications.
    pub fn reset(&self) {
        self.enqueue(Command::Reset);
    }

    fn enqueue(&self, command: Command<E, S>) {
        self.shared.pending.send_modify(|n| *n += 1);
        if self.queue.send(command).is_err() {
            self.shared.pending.send_modify(|n| *n = n.saturating_sub(1));
            self.shared
                .log(Level::Fault, "Execution queue is closed, command discarded");
        }
    }

    /// Observe the current state: the latest value first, then every change.
    pub fn subscribe_state(&self) -> Subscription<S> {
        self.shared.state.subscribe()
    }

    /// Observe transitions right before they are applied.
    pub fn subscribe_will_change(&self) -> Subscription<Transition<E, S>> {
        Subscription::new(self.shared.will_change.subscribe())
    }

    /// Observe transitions right after they are applied.
    pub fn subscribe_did_change(&self) -> Subscription<Transition<E, S>> {
        Subscription::new(self.shared.did_change.subscribe())
    }

    /// Number of queued commands not yet applied.
    pub fn pending(&self) -> usize {
        *self.shared.pending.borrow()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Wait until the execution queue has drained.
    pub async fn wait_idle(&self) {
        let mut pending = self.shared.pending.subscribe();
        // The sender lives in `shared`, which outlives this borrow
        let _ = pending.wait_for(|n| *n == 0).await;
    }

    pub fn set_logging_enabled(&self, enabled: bool) {
        self.shared.set_logging(enabled);
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.shared.logging()
    }
}

impl<E: Event, S: State> Drop for Machine<E, S> {
    fn drop(&mut self) {
        // Abort only lands at the worker's next yield
        self.shared.close();
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::capture::CapturedOutput;
    use crate::diagnostics::MemorySink;
    use crate::machine::RecvError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use crate::{event_enum, state_enum};

    state_enum! {
        enum TestState {
            Initial,
            Step1,
            Step2,
            Step2Alt,
            Finish,
        }
        final: [Finish]
    }

    event_enum! {
        enum TestEvent {
            Event1,
            Event2,
            EventA,
        }
    }

    fn t(event: TestEvent, from: TestState, to: TestState) -> Transition<TestEvent, TestState> {
        Transition::new(event, from, to)
    }

    fn linear() -> Machine<TestEvent, TestState> {
        let mut machine = Machine::new(TestState::Initial);
        machine
            .register_all(vec![
                t(TestEvent::Event1, TestState::Initial, TestState::Step1),
                t(TestEvent::Event2, TestState::Step1, TestState::Finish),
            ])
            .unwrap();
        machine
    }

    #[tokio::test]
    async fn starts_in_initial_state() {
        let machine = linear();
        assert_eq!(machine.current_state(), TestState::Initial);
        assert_eq!(machine.initial_state(), &TestState::Initial);
        assert!(machine.is_idle());
    }

    #[tokio::test]
    async fn emit_applies_after_drain() {
        let machine = linear();
        let mut will = machine.subscribe_will_change();
        let mut did = machine.subscribe_did_change();

        machine.emit(TestEvent::Event1);
        machine.wait_idle().await;

        let expected = t(TestEvent::Event1, TestState::Initial, TestState::Step1);
        assert_eq!(machine.current_state(), TestState::Step1);
        assert_eq!(will.drain(), vec![expected.clone()]);
        assert_eq!(did.drain(), vec![expected]);

        machine.emit(TestEvent::Event2);
        machine.wait_idle().await;
        assert_eq!(machine.current_state(), TestState::Finish);
        assert!(machine.is_final());
    }

    #[tokio::test]
    async fn emit_does_not_apply_synchronously() {
        let machine = linear();

        machine.emit(TestEvent::Event1);

        assert_eq!(machine.pending(), 1);
        assert_eq!(machine.current_state(), TestState::Initial);
        machine.wait_idle().await;
        assert_eq!(machine.current_state(), TestState::Step1);
    }

    #[tokio::test]
    async fn unmatched_event_is_a_silent_no_op() {
        let machine = linear();
        let mut will = machine.subscribe_will_change();
        let mut did = machine.subscribe_did_change();

        machine.emit(TestEvent::Event2);
        machine.wait_idle().await;

        assert_eq!(machine.current_state(), TestState::Initial);
        assert_eq!(machine.pending(), 0);
        assert_eq!(will.try_recv(), Err(RecvError::Empty));
        assert_eq!(did.try_recv(), Err(RecvError::Empty));
    }

    #[tokio::test]
    async fn reset_returns_to_initial_without_transition_notifications() {
        let machine = linear();
        machine.emit(TestEvent::Event1);
        machine.wait_idle().await;
        let mut did = machine.subscribe_did_change();

        machine.reset();
        machine.wait_idle().await;

        assert_eq!(machine.current_state(), TestState::Initial);
        assert_eq!(did.try_recv(), Err(RecvError::Empty));
    }

    #[tokio::test]
    async fn reset_at_initial_republishes_initial() {
        let machine = linear();
        let mut states = machine.subscribe_state();
        let mut will = machine.subscribe_will_change();

        machine.reset();
        machine.wait_idle().await;

        assert_eq!(states.drain(), vec![TestState::Initial, TestState::Initial]);
        assert_eq!(will.try_recv(), Err(RecvError::Empty));
    }

    #[tokio::test]
    async fn state_subscription_replays_latest() {
        let machine = linear();
        machine.emit(TestEvent::Event1);
        machine.wait_idle().await;

        let mut states = machine.subscribe_state();
        assert_eq!(states.recv().await, Ok(TestState::Step1));
    }

    #[tokio::test]
    async fn back_to_back_events_resolve_against_stale_state() {
        let machine = linear();
        let mut did = machine.subscribe_did_change();

        // Event2 resolves against Initial, where it has no transition
        machine.emit(TestEvent::Event1);
        machine.emit(TestEvent::Event2);
        machine.wait_idle().await;

        assert_eq!(machine.current_state(), TestState::Step1);
        assert_eq!(did.drain().len(), 1);
    }

    #[tokio::test]
    async fn stale_resolution_still_applies_once_queued() {
        let machine = linear();
        let mut states = machine.subscribe_state();
        let mut did = machine.subscribe_did_change();

        machine.emit(TestEvent::Event1);
        machine.emit(TestEvent::Event1);
        machine.wait_idle().await;

        assert_eq!(
            states.drain(),
            vec![TestState::Initial, TestState::Step1, TestState::Step1]
        );
        assert_eq!(did.drain().len(), 2);
    }

    #[tokio::test]
    async fn reset_is_ordered_with_queued_transitions() {
        let machine = linear();
        let mut states = machine.subscribe_state();

        machine.emit(TestEvent::Event1);
        machine.reset();
        machine.wait_idle().await;

        assert_eq!(
            states.drain(),
            vec![TestState::Initial, TestState::Step1, TestState::Initial]
        );
    }

    #[tokio::test]
    async fn fan_out_paths_are_independent() {
        let mut machine = Machine::new(TestState::Initial);
        machine
            .register_all(vec![
                t(TestEvent::Event1, TestState::Initial, TestState::Step1),
                t(TestEvent::EventA, TestState::Step1, TestState::Step2Alt),
                t(TestEvent::Event2, TestState::Step1, TestState::Step2),
            ])
            .unwrap();

        machine.emit(TestEvent::Event1);
        machine.wait_idle().await;
        machine.emit(TestEvent::Event2);
        machine.wait_idle().await;
        assert_eq!(machine.current_state(), TestState::Step2);

        machine.reset();
        machine.wait_idle().await;
        machine.emit(TestEvent::Event1);
        machine.wait_idle().await;
        machine.emit(TestEvent::EventA);
        machine.wait_idle().await;
        assert_eq!(machine.current_state(), TestState::Step2Alt);
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_original() {
        let sink = Arc::new(MemorySink::new());
        let mut machine =
            Machine::with_sink(TestState::Initial, MachineConfig::default(), sink.clone());
        machine
            .register(t(TestEvent::Event1, TestState::Initial, TestState::Step1))
            .unwrap();

        let err = machine
            .register(t(TestEvent::Event1, TestState::Initial, TestState::Finish))
            .unwrap_err();
        assert_eq!(err.existing.to, TestState::Step1);
        assert_eq!(sink.messages(Level::Fault).len(), 1);
        assert!(sink.messages(Level::Fault)[0]
            .starts_with("Failed to register Initial -> Finish with event Event1"));

        machine.emit(TestEvent::Event1);
        machine.wait_idle().await;
        assert_eq!(machine.current_state(), TestState::Step1);
    }

    #[tokio::test]
    async fn diagnostics_report_transitions_and_resets() {
        let sink = Arc::new(MemorySink::new());
        let mut machine =
            Machine::with_sink(TestState::Initial, MachineConfig::default(), sink.clone());
        machine
            .register(t(TestEvent::Event1, TestState::Initial, TestState::Step1))
            .unwrap();

        machine.emit(TestEvent::Event2);
        machine.emit(TestEvent::Event1);
        machine.reset();
        machine.wait_idle().await;

        assert_eq!(
            sink.messages(Level::Info),
            vec![
                "Performing transition Initial -> Step1 with event Event1",
                "Performing reset to Initial",
            ]
        );
        assert_eq!(
            sink.messages(Level::Debug),
            vec!["Dropping event Event2 in state Initial"]
        );
    }

    #[tokio::test]
    async fn logging_can_be_switched_off() {
        let sink = Arc::new(MemorySink::new());
        let machine: Machine<TestEvent, TestState> =
            Machine::with_sink(TestState::Initial, MachineConfig::default(), sink.clone());
        assert!(machine.is_logging_enabled());

        machine.set_logging_enabled(false);
        machine.reset();
        machine.wait_idle().await;

        assert!(!machine.is_logging_enabled());
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn late_registration_is_honoured() {
        let mut machine = linear();
        machine.emit(TestEvent::EventA);
        machine.wait_idle().await;
        assert_eq!(machine.current_state(), TestState::Initial);

        machine
            .register(t(TestEvent::EventA, TestState::Initial, TestState::Step2Alt))
            .unwrap();
        machine.emit(TestEvent::EventA);
        machine.wait_idle().await;
        assert_eq!(machine.current_state(), TestState::Step2Alt);
    }

    #[tokio::test]
    async fn dropping_the_machine_discards_queued_work() {
        let machine = linear();
        let mut states = machine.subscribe_state();
        let mut did = machine.subscribe_did_change();

        machine.emit(TestEvent::Event1);
        drop(machine);

        assert_eq!(states.recv().await, Ok(TestState::Initial));
        assert_eq!(states.recv().await, Err(RecvError::Closed));
        assert_eq!(did.recv().await, Err(RecvError::Closed));
    }

    #[tokio::test]
    async fn lagging_state_observer_still_drains_the_tail() {
        let config = MachineConfig {
            channel_capacity: 2,
            ..MachineConfig::default()
        };
        let machine: Machine<TestEvent, TestState> =
            Machine::with_sink(TestState::Initial, config, Arc::new(NoopSink));
        let mut states = machine.subscribe_state();
        assert_eq!(states.try_recv(), Ok(TestState::Initial));

        for _ in 0..4 {
            machine.reset();
        }
        machine.wait_idle().await;

        assert_eq!(states.drain(), vec![TestState::Initial, TestState::Initial]);
    }

    #[tokio::test]
    async fn with_config_logs_through_tracing_under_its_label() {
        let output = CapturedOutput::default();
        let _guard = output.install();
        let config = MachineConfig {
            label: Some("turnstile".to_string()),
            ..MachineConfig::default()
        };
        let machine: Machine<TestEvent, TestState> =
            Machine::with_config(TestState::Initial, config);

        machine.reset();
        machine.wait_idle().await;

        let line = output.line_with("Performing reset to Initial");
        assert!(line.contains("machine=turnstile"), "{line}");
    }

    /// Counts `Info` records that arrive after the machine is gone.
    struct LateSink {
        dropped: AtomicBool,
        late: AtomicUsize,
    }

    impl DiagnosticSink for LateSink {
        fn log(&self, level: Level, _message: &str) {
            if level == Level::Info && self.dropped.load(Ordering::SeqCst) {
                self.late.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn no_command_applies_after_drop_returns() {
        let sink = Arc::new(LateSink {
            dropped: AtomicBool::new(false),
            late: AtomicUsize::new(0),
        });
        let machine: Machine<TestEvent, TestState> =
            Machine::with_sink(TestState::Initial, MachineConfig::default(), sink.clone());

        for _ in 0..20_000 {
            machine.reset();
        }
        tokio::time::sleep(Duration::from_micros(50)).await;
        drop(machine);
        sink.dropped.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(sink.late.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn machines_have_distinct_ids() {
        let a = linear();
        let b = linear();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.table().len(), 2);
    }
}
