// go_flow/src/runner/continuation.rs

//! Defines `Next`, the continuation handed to steps that declare `next`.

use crate::core::control::StepSignal;
use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{event, Level};

/// Lets a step that declared `next` tell the runner it is done.
///
/// The runner does not move past the step until `proceed` or `fail` is
/// called. Only the first call counts; clones share that single use. The
/// handle is `Send + Sync`, so it can be moved into a spawned task and
/// called after the step body has returned.
#[derive(Clone)]
pub struct Next {
  step_index: usize,
  sender: Arc<Mutex<Option<oneshot::Sender<StepSignal>>>>,
}

impl Next {
  pub(crate) fn channel(step_index: usize) -> (Self, oneshot::Receiver<StepSignal>) {
    let (tx, rx) = oneshot::channel();
    let next = Self {
      step_index,
      sender: Arc::new(Mutex::new(Some(tx))),
    };
    (next, rx)
  }

  /// Continue with the following step.
  pub fn proceed(&self) {
    self.signal(StepSignal::Proceed);
  }

  /// Abandon the queue; the failure callback receives a `StepFailure` carrying `reason`.
  pub fn fail(&self, reason: impl Display) {
    self.signal(StepSignal::Fail(reason.to_string()));
  }

  /// Whether `proceed` or `fail` has already been called.
  pub fn is_used(&self) -> bool {
    self.sender.lock().is_none()
  }

  pub fn step_index(&self) -> usize {
    self.step_index
  }

  fn signal(&self, signal: StepSignal) {
    let Some(tx) = self.sender.lock().take() else {
      event!(Level::WARN, step_index = self.step_index, ?signal, "Continuation already used, ignoring.");
      return;
    };
    if tx.send(signal).is_err() {
      // The runner gave up on this step (timeout) before we got here.
      event!(Level::DEBUG, step_index = self.step_index, "Runner no longer waiting on this step.");
    }
  }
}

impl std::fmt::Debug for Next {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Next")
      .field("step_index", &self.step_index)
      .field("used", &self.is_used())
      .finish()
  }
}
