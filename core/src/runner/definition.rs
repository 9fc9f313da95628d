// go_flow/src/runner/definition.rs

//! Contains the `Go` runner definition: construction, registration
//! passthroughs, step queueing and terminal callbacks.

use crate::core::control::RunnerStatus;
use crate::core::injectable::Injectable;
use crate::core::step::StepDef;
use crate::core::value::Value;
use crate::error::GoResult;
use crate::injector::provider::ProviderDef;
use crate::injector::{Injector, ProviderRegistry};
use crate::module::ModuleRegistry;
use crate::runner::config::GoConfig;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{event, Level};

/// Local carrying the step's `Next` continuation.
pub const NEXT: &str = "next";
/// Local carrying the `Go` runner itself into steps and callbacks.
pub const RUNNER: &str = "$runner";
/// Local carrying the `GoError` into the failure callback.
pub const ERROR: &str = "$error";

pub(crate) struct RunState {
  pub(crate) steps: Vec<StepDef>,
  /// Index of the last step handed to execution; -1 before the first.
  pub(crate) cursor: isize,
  pub(crate) stopped: bool,
  /// What to report once the driver notices `stopped`.
  pub(crate) halt_status: RunnerStatus,
  /// A driver task is alive.
  pub(crate) driving: bool,
  /// The driver is running terminal callbacks.
  pub(crate) finishing: bool,
  /// `start()` was called while terminal callbacks were running.
  pub(crate) restart: bool,
  pub(crate) on_success: Option<Injectable>,
  pub(crate) on_failure: Option<Injectable>,
  pub(crate) on_finally: Option<Injectable>,
}

pub(crate) struct GoInner {
  pub(crate) injector: Injector,
  pub(crate) config: GoConfig,
  pub(crate) state: Mutex<RunState>,
  pub(crate) status: watch::Sender<RunnerStatus>,
}

/// A sequential step runner with its own injector.
///
/// Steps run one at a time in the order they were queued, each after its
/// delay and never on the caller's stack. A step that declares `next` holds
/// the runner until it calls `Next::proceed` or `Next::fail`; any other step
/// advances as soon as it returns. Cloning yields another handle on the same
/// runner.
#[derive(Clone)]
pub struct Go {
  pub(crate) inner: Arc<GoInner>,
}

impl Go {
  /// A runner loading `requires` from the process-wide module registry.
  pub fn new<I, S>(requires: I) -> GoResult<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self::with_modules(ModuleRegistry::global(), requires)
  }

  /// A runner loading `requires` from `modules`.
  pub fn with_modules<I, S>(modules: &ModuleRegistry, requires: I) -> GoResult<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self::with_config(GoConfig::default(), modules, requires)
  }

  pub fn with_config<I, S>(config: GoConfig, modules: &ModuleRegistry, requires: I) -> GoResult<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let injector = Injector::with_registry(ProviderRegistry::new(), config.strict_di);
    let (status, _) = watch::channel(RunnerStatus::Idle);
    let go = Self {
      inner: Arc::new(GoInner {
        injector,
        config,
        state: Mutex::new(RunState {
          steps: Vec::new(),
          cursor: -1,
          stopped: false,
          halt_status: RunnerStatus::Paused,
          driving: false,
          finishing: false,
          restart: false,
          on_success: None,
          on_failure: None,
          on_finally: None,
        }),
        status,
      }),
    };
    modules.load_all(requires, &go.inner.injector)?;
    event!(Level::DEBUG, modules = ?go.inner.injector.loaded_modules(), "Runner created.");
    Ok(go)
  }

  pub fn injector(&self) -> &Injector {
    &self.inner.injector
  }

  pub fn config(&self) -> &GoConfig {
    &self.inner.config
  }

  fn provide(&self) -> &ProviderRegistry {
    self.inner.injector.registry()
  }

  // --- Registration passthroughs ---

  pub fn provider(&self, name: &str, def: impl Into<ProviderDef>) -> &Self {
    self.provide().provider(name, def);
    self
  }

  pub fn factory(&self, name: &str, f: Injectable) -> &Self {
    self.provide().factory(name, f);
    self
  }

  pub fn service(&self, name: &str, ctor: Injectable) -> &Self {
    self.provide().service(name, ctor);
    self
  }

  pub fn value<T: Any + Send + Sync>(&self, name: &str, v: T) -> &Self {
    self.provide().value(name, v);
    self
  }

  pub fn value_shared(&self, name: &str, v: Value) -> &Self {
    self.provide().value_shared(name, v);
    self
  }

  pub fn constant<T: Any + Send + Sync>(&self, name: &str, v: T) -> &Self {
    self.provide().constant(name, v);
    self
  }

  pub fn constant_shared(&self, name: &str, v: Value) -> &Self {
    self.provide().constant_shared(name, v);
    self
  }

  pub fn decorator(&self, name: &str, f: Injectable) -> &Self {
    self.provide().decorator(name, f);
    self
  }

  // --- Step queue ---

  /// Queues a step record.
  pub fn add(&self, step: impl Into<StepDef>) -> &Self {
    self.inner.state.lock().steps.push(step.into());
    self
  }

  /// Queues `step` with the configured default delay.
  pub fn run(&self, step: Injectable) -> &Self {
    self.add(StepDef::new(step).with_delay(self.inner.config.default_delay))
  }

  /// Queues `step` to run `delay` after the previous one hands over.
  pub fn run_delayed(&self, step: Injectable, delay: Duration) -> &Self {
    self.add(StepDef::new(step).with_delay(delay))
  }

  // --- Terminal callbacks ---

  /// Sets both the success and the failure callback.
  pub fn then(&self, on_success: Injectable, on_failure: Injectable) -> &Self {
    let mut state = self.inner.state.lock();
    state.on_success = Some(on_success);
    state.on_failure = Some(on_failure);
    drop(state);
    self
  }

  pub fn on_success(&self, f: Injectable) -> &Self {
    self.inner.state.lock().on_success = Some(f);
    self
  }

  /// The callback may declare `$error` to receive the `GoError`.
  pub fn on_failure(&self, f: Injectable) -> &Self {
    self.inner.state.lock().on_failure = Some(f);
    self
  }

  /// Runs after the success or failure callback, whichever fired.
  pub fn finally(&self, f: Injectable) -> &Self {
    self.inner.state.lock().on_finally = Some(f);
    self
  }

  // --- Introspection ---

  pub fn status(&self) -> RunnerStatus {
    *self.inner.status.borrow()
  }

  /// Index of the last step handed to execution, -1 if none since construction or `stop()`.
  pub fn cursor(&self) -> isize {
    self.inner.state.lock().cursor
  }

  pub fn is_stopped(&self) -> bool {
    self.inner.state.lock().stopped
  }

  pub fn len(&self) -> usize {
    self.inner.state.lock().steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Waits until the runner is not `Running` and returns that status.
  pub async fn settled(&self) -> RunnerStatus {
    let mut rx = self.inner.status.subscribe();
    let settled = rx.wait_for(|s| s.is_settled()).await.map(|s| *s).ok();
    settled.unwrap_or_else(|| *rx.borrow())
  }

  pub(crate) fn set_status(&self, status: RunnerStatus) {
    let previous = self.inner.status.send_replace(status);
    if previous != status {
      event!(Level::DEBUG, ?previous, current = ?status, "Runner status changed.");
    }
  }
}

impl std::fmt::Debug for Go {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.inner.state.lock();
    f.debug_struct("Go")
      .field("steps", &state.steps.len())
      .field("cursor", &state.cursor)
      .field("stopped", &state.stopped)
      .field("status", &*self.inner.status.borrow())
      .finish()
  }
}
