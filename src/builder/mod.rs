//! Builder API for ergonomic machine construction.
//!
//! This module provides a fluent builder and declaration macros for creating
//! machines with minimal boilerplate while maintaining type safety.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::MachineBuilder;
