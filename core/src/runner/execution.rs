// go_flow/src/runner/execution.rs

//! Contains the runner's execution state machine: `start`, `pause`, `stop`
//! and the driver task that advances through the step queue.

use crate::core::control::{RunnerStatus, StepSignal};
use crate::core::injectable::Injectable;
use crate::core::step::StepDef;
use crate::core::value::{Locals, Value};
use crate::error::GoError;
use crate::runner::continuation::Next;
use crate::runner::definition::{Go, ERROR, NEXT, RUNNER};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{event, instrument, Level};

/// How a single step ended from the driver's point of view.
enum StepOutcome {
  Advance,
  Failed(GoError),
  /// The step dropped its continuation without calling it.
  Abandoned,
}

/// What the driver should do after deciding to advance.
enum Advance {
  Halt,
  Execute(usize, StepDef),
  Exhausted,
}

impl Go {
  /// Clears the stop flag and begins (or resumes) execution on the current
  /// Tokio runtime. The first step runs on a spawned task, never inside this call.
  pub fn start(&self) -> &Self {
    let runtime = Handle::try_current();
    let mut state = self.inner.state.lock();
    state.stopped = false;
    if state.driving {
      if state.finishing {
        state.restart = true;
      }
      event!(Level::DEBUG, "Runner already driving, resume flag cleared.");
      return self;
    }

    match runtime {
      Ok(handle) => {
        state.driving = true;
        // Published under the lock so a finishing driver cannot overwrite it.
        self.set_status(RunnerStatus::Running);
        drop(state);
        handle.spawn(self.clone().drive());
      }
      Err(err) => {
        event!(Level::ERROR, error = %err, "start() called outside a Tokio runtime.");
        self.set_status(RunnerStatus::Failed);
      }
    }
    self
  }

  /// Halts before the next step; `start()` resumes after the last executed one.
  pub fn pause(&self) -> &Self {
    self.halt(RunnerStatus::Paused, false)
  }

  /// Halts before the next step and rewinds; `start()` runs from the first step.
  pub fn stop(&self) -> &Self {
    self.halt(RunnerStatus::Stopped, true)
  }

  fn halt(&self, status: RunnerStatus, rewind: bool) -> &Self {
    let mut state = self.inner.state.lock();
    state.stopped = true;
    state.halt_status = status;
    if rewind {
      state.cursor = -1;
    }
    // A live driver reports the halt itself once the in-flight step hands over.
    // Idle, Completed and Failed are kept so `settled()` still sees the outcome.
    let current = self.status();
    let terminal = matches!(current, RunnerStatus::Idle | RunnerStatus::Completed | RunnerStatus::Failed);
    if !state.driving && !terminal {
      self.set_status(status);
    }
    drop(state);
    self
  }

  fn advance(&self) -> Advance {
    let mut state = self.inner.state.lock();
    if state.stopped {
      return Advance::Halt;
    }
    state.cursor += 1;
    let idx = state.cursor as usize;
    match state.steps.get(idx) {
      Some(step) => Advance::Execute(idx, step.clone()),
      None => Advance::Exhausted,
    }
  }

  async fn drive(self) {
    loop {
      let outcome = match self.advance() {
        Advance::Halt => {
          let mut state = self.inner.state.lock();
          state.driving = false;
          let status = state.halt_status;
          self.set_status(status);
          drop(state);
          event!(Level::INFO, ?status, "Runner halted.");
          return;
        }
        Advance::Exhausted => self.complete(),
        Advance::Execute(idx, step) => match self.execute_step(idx, step).await {
          StepOutcome::Advance => continue,
          StepOutcome::Failed(err) => self.fail(err),
          StepOutcome::Abandoned => {
            self.inner.state.lock().driving = false;
            return;
          }
        },
      };

      let restart = {
        let mut state = self.inner.state.lock();
        state.finishing = false;
        if state.restart {
          state.restart = false;
          true
        } else {
          // Published under the lock so a concurrent `start()` cannot be overwritten.
          state.driving = false;
          self.set_status(outcome);
          false
        }
      };
      if !restart {
        return;
      }
      event!(Level::DEBUG, "Restart requested from a terminal callback.");
    }
  }

  #[instrument(name = "Go::execute_step", skip_all, fields(step_index = idx))]
  async fn execute_step(&self, idx: usize, step: StepDef) -> StepOutcome {
    if step.delay.is_zero() {
      tokio::task::yield_now().await;
    } else {
      tokio::time::sleep(step.delay).await;
    }

    let started = Instant::now();
    let injector = &self.inner.injector;
    let waits_for_next = injector.annotate(&step.run).iter().any(|n| n == NEXT);
    let (next, rx) = Next::channel(idx);
    let locals = Locals::new().with(NEXT, next).with(RUNNER, self.clone());
    let this: Value = Arc::new(self.clone());

    event!(Level::DEBUG, waits_for_next, "Executing step.");
    if let Err(err) = injector.invoke(&step.run, Some(this), Some(&locals)) {
      event!(Level::ERROR, error = %err, "Step failed during invocation.");
      return StepOutcome::Failed(err);
    }
    drop(locals);

    if !waits_for_next {
      return StepOutcome::Advance;
    }

    let timeout = self.inner.config.step_timeout;
    let signal = match timeout {
      Some(limit) => match tokio::time::timeout(limit, rx).await {
        Ok(received) => received,
        Err(_) => return Self::timed_out(idx, limit),
      },
      None => rx.await,
    };

    match signal {
      Ok(StepSignal::Proceed) => StepOutcome::Advance,
      Ok(StepSignal::Fail(reason)) => {
        event!(Level::ERROR, %reason, "Step signalled failure.");
        StepOutcome::Failed(GoError::StepFailure { reason })
      }
      Err(_) => match timeout {
        // The continuation can no longer be called, so the step cannot beat the deadline.
        Some(limit) => {
          event!(Level::WARN, "Step dropped its continuation without calling it.");
          tokio::time::sleep(limit.saturating_sub(started.elapsed())).await;
          Self::timed_out(idx, limit)
        }
        None => {
          event!(Level::WARN, "Step dropped its continuation without calling it; runner stays suspended.");
          StepOutcome::Abandoned
        }
      },
    }
  }

  fn timed_out(idx: usize, limit: Duration) -> StepOutcome {
    event!(Level::ERROR, timeout = ?limit, "Step did not call its continuation in time.");
    StepOutcome::Failed(GoError::StepTimeout {
      step_index: idx,
      timeout_ms: limit.as_millis(),
    })
  }

  fn callbacks(&self) -> (Option<Injectable>, Option<Injectable>, Option<Injectable>) {
    let mut state = self.inner.state.lock();
    state.finishing = true;
    (
      state.on_success.clone(),
      state.on_failure.clone(),
      state.on_finally.clone(),
    )
  }

  fn invoke_callback(&self, f: &Injectable, locals: Locals) -> Result<(), GoError> {
    let locals = locals.with(RUNNER, self.clone());
    let this: Value = Arc::new(self.clone());
    self.inner.injector.invoke(f, Some(this), Some(&locals)).map(|_| ())
  }

  /// Queue exhausted: success, then finally. A failing success callback is
  /// routed to the failure callback instead.
  fn complete(&self) -> RunnerStatus {
    event!(Level::INFO, "All steps completed.");
    let (on_success, on_failure, on_finally) = self.callbacks();

    let mut status = RunnerStatus::Completed;
    if let Some(f) = on_success {
      if let Err(err) = self.invoke_callback(&f, Locals::new()) {
        event!(Level::ERROR, error = %err, "Success callback failed.");
        status = RunnerStatus::Failed;
        self.report_failure(on_failure.as_ref(), err);
      }
    }
    self.run_finally(on_finally.as_ref());
    status
  }

  fn fail(&self, err: GoError) -> RunnerStatus {
    let (_, on_failure, on_finally) = self.callbacks();
    self.report_failure(on_failure.as_ref(), err);
    self.run_finally(on_finally.as_ref());
    RunnerStatus::Failed
  }

  fn report_failure(&self, on_failure: Option<&Injectable>, err: GoError) {
    let Some(f) = on_failure else {
      event!(Level::DEBUG, error = %err, "No failure callback registered, discarding error.");
      return;
    };
    let err: Value = Arc::new(err);
    if let Err(cb_err) = self.invoke_callback(f, Locals::new().with_value(ERROR, err)) {
      event!(Level::ERROR, error = %cb_err, "Failure callback failed.");
    }
  }

  fn run_finally(&self, on_finally: Option<&Injectable>) {
    if let Some(f) = on_finally {
      if let Err(err) = self.invoke_callback(f, Locals::new()) {
        event!(Level::ERROR, error = %err, "Finally callback failed.");
      }
    }
  }
}
