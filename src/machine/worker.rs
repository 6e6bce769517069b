//! The serialized execution queue.
//!
//! A single task owns the receiving end of an unbounded FIFO and applies one
//! command at a time. It is the only writer of the current state and the
//! only sender on the will/did change channels.

use super::subscription::ReplayChannel;
use crate::core::{Event, State, Transition};
use crate::diagnostics::{DiagnosticSink, Level};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// A unit of work on the queue.
#[derive(Debug)]
pub(crate) enum Command<E, S> {
    /// Apply an already resolved transition
    Apply(Transition<E, S>),
    /// Force the machine back to its initial state
    Reset,
}

/// State shared between the machine handle and its worker.
pub(crate) struct Shared<E: Event, S: State> {
    pub(crate) initial: S,
    pub(crate) state: ReplayChannel<S>,
    pub(crate) will_change: broadcast::Sender<Transition<E, S>>,
    pub(crate) did_change: broadcast::Sender<Transition<E, S>>,
    /// Commands submitted but not yet applied
    pub(crate) pending: watch::Sender<usize>,
    sink: Arc<dyn DiagnosticSink>,
    logging: AtomicBool,
    /// Set once the owning machine is dropped; held for the whole of `apply`
    closed: Mutex<bool>,
}

impl<E: Event, S: State> Shared<E, S> {
    pub(crate) fn new(
        initial: S,
        capacity: usize,
        sink: Arc<dyn DiagnosticSink>,
        logging: bool,
    ) -> Self {
        let (will_change, _) = broadcast::channel(capacity);
        let (did_change, _) = broadcast::channel(capacity);
        let (pending, _) = watch::channel(0);
        Self {
            state: ReplayChannel::new(initial.clone(), capacity),
            initial,
            will_change,
            did_change,
            pending,
            sink,
            logging: AtomicBool::new(logging),
            closed: Mutex::new(false),
        }
    }

    pub(crate) fn log(&self, level: Level, message: &str) {
        if self.logging.load(Ordering::Relaxed) {
            self.sink.log(level, message);
        }
    }

    pub(crate) fn set_logging(&self, enabled: bool) {
        self.logging.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn logging(&self) -> bool {
        self.logging.load(Ordering::Relaxed)
    }

    /// Stop applying commands.
    ///
    /// Waits for an in-flight `apply` to finish; no command runs once this
    /// returns.
    pub(crate) fn close(&self) {
        *self.closed.lock() = true;
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.lock()
    }

    /// Apply one command. Returns `false` without doing anything once closed.
    pub(crate) fn apply(&self, command: Command<E, S>) -> bool {
        let closed = self.closed.lock();
        if *closed {
            return false;
        }
        match command {
            Command::Apply(transition) => {
                let _ = self.will_change.send(transition.clone());
                self.log(Level::Info, &format!("Performing transition {}", transition));
                self.state.publish(transition.to.clone());
                let _ = self.did_change.send(transition);
            }
            Command::Reset => {
                self.log(
                    Level::Info,
                    &format!("Performing reset to {}", self.initial.name()),
                );
                self.state.publish(self.initial.clone());
            }
        }
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
        drop(closed);
        true
    }
}

/// Worker loop: runs until every sender is gone, the machine is closed or
/// the task is aborted.
pub(crate) async fn run<E: Event, S: State>(
    shared: Arc<Shared<E, S>>,
    mut queue: mpsc::UnboundedReceiver<Command<E, S>>,
) {
    while let Some(command) = queue.recv().await {
        if !shared.apply(command) {
            break;
        }
    }
}
