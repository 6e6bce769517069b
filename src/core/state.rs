//! Core State trait for state machine states.
//!
//! The engine never looks inside a state. It only compares states for
//! equality, hashes them, and asks for a name when writing diagnostics.

use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state machine states.
///
/// States are opaque identities supplied by the caller, usually as a closed
/// enumeration.
///
/// # Required Traits
///
/// - `Clone`: states are copied into transitions and observer channels
/// - `Eq` + `Hash`: states take part in transition lookup
/// - `Debug`: states must be debuggable for diagnostics
/// - `Send` + `Sync` + `'static`: states cross into the worker task
///
/// # Example
///
/// ```rust
/// use switchyard::core::State;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum TaskState {
///     Pending,
///     Running,
///     Complete,
/// }
///
/// impl State for TaskState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Pending => "Pending",
///             Self::Running => "Running",
///             Self::Complete => "Complete",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Complete)
///     }
/// }
/// ```
pub trait State: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) state.
    ///
    /// Purely informational: the engine does not refuse transitions out of
    /// a final state.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }
}
