//! Event trait for the stimuli that drive a machine.

use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state machine events.
///
/// Like [`State`](super::State), events are opaque: the engine only needs
/// equality, a stable hash and a name for diagnostics.
pub trait Event: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Get the event's name for display/logging.
    fn name(&self) -> &str;
}
