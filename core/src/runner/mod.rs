// go_flow/src/runner/mod.rs

//! Defines the `Go` runner, its construction, step queue and execution logic.

pub mod config;
pub mod continuation;
pub mod definition;
pub mod execution;

pub use config::GoConfig;
pub use continuation::Next;
pub use definition::{Go, ERROR, NEXT, RUNNER};
