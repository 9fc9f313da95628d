// go_flow/src/lib.rs

//! go-flow: a name-keyed dependency injection container with a sequential,
//! cooperatively scheduled step runner.
//!
//! go-flow lets you:
//!  - Register named services as values, constants, factories, constructor-style
//!    services, or configurable providers, and decorate them.
//!  - Resolve them lazily, once per injector, into any injectable function by
//!    declaring the dependency names it needs.
//!  - Bundle registrations into named modules that require other modules and
//!    load on demand into any number of independent runners.
//!  - Queue steps on a `Go` runner that executes them one at a time, each after
//!    its own delay, with explicit `next` continuations, pause/resume/stop, and
//!    success/failure/finally callbacks.

pub mod core;
pub mod error;
pub mod injector;
pub mod module;
pub mod runner;

// --- Re-exports for the Public API ---

pub use crate::core::control::{RunnerStatus, StepSignal};
pub use crate::core::injectable::{unit, Annotation, Injectable};
pub use crate::core::step::StepDef;
pub use crate::core::value::{downcast_value, value, Instance, Invocation, Locals, Value};

pub use crate::injector::{
  Injector, ProviderDef, ProviderDescriptor, ProviderRegistry, DELEGATE, INJECTOR, PROVIDE, PROVIDER_SUFFIX,
};

pub use crate::module::{Module, ModuleRegistry};

pub use crate::runner::{Go, GoConfig, Next, ERROR, NEXT, RUNNER};

pub use crate::error::{GoError, GoResult};

/// Declares a module in the process-wide registry.
///
/// Runners created with `Go::new` resolve their `requires` list against this
/// registry. Use `ModuleRegistry::module` on a registry of your own to keep
/// namespaces isolated.
pub fn module<I, S>(name: &str, requires: I) -> Module
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  ModuleRegistry::global().module(name, requires)
}

/*
    Typical flow:
    1. Declare modules with `go_flow::module("name", ["required", ...])` and chain
       `.value()`, `.constant()`, `.factory()`, `.service()`, `.provider()`, `.config()`.
    2. Create a runner with `Go::new(["name"])?`; required modules load transitively.
    3. Queue steps with `.run(Injectable::action(["svc", "next"], |inv| { ... }))`.
       A step that declares `next` must call `next.proceed()` or `next.fail(..)`.
    4. Register `.then(success, failure)` and `.finally(..)`, then `.start()`.
    5. Await `go.settled()` to observe the terminal state.
*/
