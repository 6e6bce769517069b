//! Core state machine types and logic.
//!
//! This module contains the synchronous core of the engine:
//! - State and event definitions via the `State` and `Event` traits
//! - The immutable `Transition` value
//! - The `TransitionTable`, which rejects duplicate `(event, from)` pairs
//!   and resolves an event against a state
//!
//! Nothing in this module spawns tasks or emits diagnostics.

mod error;
mod event;
mod state;
mod table;
mod transition;

pub use error::DuplicateTransition;
pub use event::Event;
pub use state::State;
pub use table::TransitionTable;
pub use transition::Transition;
