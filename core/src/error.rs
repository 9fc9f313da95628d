// go_flow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GoError {
  /// Neither `name` nor `name + "Provider"` is registered.
  #[error("Unable to find variable or service with the name: {name}")]
  UnknownService { name: String },

  /// Every declared dependency that was found neither in the locals nor in the registry.
  #[error("Unable to find required services: {}", names.join(", "))]
  MissingDependency { names: Vec<String> },

  #[error("Unable to find module: {name}")]
  UnknownModule { name: String },

  /// A step called `next.fail(..)`.
  #[error("Step failed: {reason}")]
  StepFailure { reason: String },

  /// An injectable returned an error of its own.
  #[error("Error in user-provided injectable. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Step {step_index} did not call its continuation within {timeout_ms}ms")]
  StepTimeout { step_index: usize, timeout_ms: u128 },

  #[error("Circular dependency while resolving: {}", path.join(" <- "))]
  CircularDependency { path: Vec<String> },

  #[error("Provider for '{name}' did not produce a provider descriptor")]
  InvalidProvider { name: String },

  #[error("Type mismatch for '{name}' (expected {expected})")]
  TypeMismatch { name: String, expected: String },

  #[error("Internal go-flow error: {0}")]
  Internal(String),
}

impl GoError {
  /// The reason text of an explicit step failure, if this is one.
  pub fn failure_reason(&self) -> Option<&str> {
    match self {
      GoError::StepFailure { reason } => Some(reason.as_str()),
      _ => None,
    }
  }
}

// Errors travel through user injectables as `anyhow::Error`. When one of ours
// comes back we unwrap it so its kind survives the round trip.
impl From<AnyhowError> for GoError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<GoError>() {
      Ok(go_err) => go_err,
      Err(other) => GoError::HandlerError { source: other },
    }
  }
}

pub type GoResult<T, E = GoError> = std::result::Result<T, E>;
