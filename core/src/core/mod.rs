pub mod control;
pub mod injectable;
pub mod step;
pub mod value;

// Re-export key types for easier access from other go-flow modules (and lib.rs)
pub use control::{RunnerStatus, StepSignal};
pub use injectable::{unit, Annotation, Injectable};
pub use step::StepDef;
pub use value::{downcast_value, value, Instance, Invocation, Locals, Value};
