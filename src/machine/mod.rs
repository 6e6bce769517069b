//! The asynchronous shell around the core table.
//!
//! # Key Concepts
//!
//! - **Machine**: owns the table and the current state, accepts events and
//!   resets
//! - **Execution queue**: a single Tokio task applying state changes one at a
//!   time, in submission order
//! - **Subscriptions**: broadcast streams of the current state (with replay of
//!   the latest value) and of transitions before and after they apply
//!
//! A machine must be created inside a Tokio runtime.

mod config;
mod controller;
mod subscription;
mod worker;

pub use config::{MachineConfig, DEFAULT_CHANNEL_CAPACITY};
pub use controller::Machine;
pub use subscription::{RecvError, Subscription};
