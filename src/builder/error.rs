//! Build errors for the machine builder.

use thiserror::Error;

/// Errors that can occur when building a machine.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("{} conflicting transitions: {}", .conflicts.len(), .conflicts.join("; "))]
    ConflictingTransitions { conflicts: Vec<String> },

    #[error("No Tokio runtime available. Build the machine from within a runtime")]
    NoRuntime,
}
