//! Switchyard: an embeddable event-driven state machine
//!
//! The caller declares a transition table over its own state and event types,
//! then feeds events to a [`Machine`]. Each event resolves to at most one
//! transition out of the current state, and state changes are applied one at
//! a time on a dedicated Tokio task.
//!
//! # Core Concepts
//!
//! - **State / Event**: caller supplied opaque values via the `State` and
//!   `Event` traits
//! - **Transition**: immutable `(event, from, to)` rule
//! - **TransitionTable**: rejects two rules sharing an `(event, from)` pair
//! - **Machine**: resolves events, queues state changes, broadcasts
//!   `will change` / `did change` notifications and the current state
//!
//! # Example
//!
//! ```rust
//! use switchyard::{event_enum, state_enum, Machine, Transition};
//!
//! state_enum! {
//!     enum Light { Off, On }
//! }
//!
//! event_enum! {
//!     enum Switch { Flip }
//! }
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .build()
//!     .unwrap();
//!
//! runtime.block_on(async {
//!     let mut machine = Machine::new(Light::Off);
//!     machine
//!         .register_all(vec![
//!             Transition::new(Switch::Flip, Light::Off, Light::On),
//!             Transition::new(Switch::Flip, Light::On, Light::Off),
//!         ])
//!         .unwrap();
//!
//!     machine.emit(Switch::Flip);
//!     machine.wait_idle().await;
//!     assert_eq!(machine.current_state(), Light::On);
//!
//!     machine.reset();
//!     machine.wait_idle().await;
//!     assert_eq!(machine.current_state(), Light::Off);
//! });
//! ```

pub mod builder;
pub mod core;
pub mod diagnostics;
pub mod machine;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use self::core::{DuplicateTransition, Event, State, Transition, TransitionTable};
pub use diagnostics::{DiagnosticSink, Level, MemorySink, NoopSink, TracingSink};
pub use machine::{Machine, MachineConfig, RecvError, Subscription};
