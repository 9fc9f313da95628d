// go_flow/src/runner/config.rs

//! Defines `GoConfig`, the knobs a runner is constructed with.

use std::time::Duration;

/// Runner configuration. `GoConfig::default()` reproduces the classic
/// behaviour: non-strict annotation, no step timeout, zero default delay.
#[derive(Debug, Clone, Default)]
pub struct GoConfig {
  /// Never read textual signatures; only explicit annotations declare dependencies.
  pub strict_di: bool,
  /// Fail a step that declared `next` but did not call it in time.
  ///
  /// Off by default, in which case such a step suspends the runner indefinitely.
  pub step_timeout: Option<Duration>,
  /// Delay given to steps queued with `Go::run`.
  pub default_delay: Duration,
}

impl GoConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_strict_di(mut self, strict_di: bool) -> Self {
    self.strict_di = strict_di;
    self
  }

  pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
    self.step_timeout = Some(timeout);
    self
  }

  pub fn with_default_delay(mut self, delay: Duration) -> Self {
    self.default_delay = delay;
    self
  }
}
