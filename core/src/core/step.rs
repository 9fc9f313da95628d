// go_flow/src/core/step.rs

//! Defines the unit of work queued on a runner.

use crate::core::injectable::Injectable;
use std::time::Duration;

/// A queued step: the injectable to run and how long to wait before running it.
#[derive(Clone)]
pub struct StepDef {
  pub run: Injectable,
  pub delay: Duration,
}

impl StepDef {
  pub fn new(run: Injectable) -> Self {
    Self {
      run,
      delay: Duration::ZERO,
    }
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }
}

impl From<Injectable> for StepDef {
  fn from(run: Injectable) -> Self {
    StepDef::new(run)
  }
}

// Injectable's Debug only shows the annotation, which is all we want here.
impl std::fmt::Debug for StepDef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("annotation", self.run.annotation())
      .field("delay", &self.delay)
      .finish()
  }
}
