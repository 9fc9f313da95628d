// go_flow/src/core/control.rs

//! Defines the runner's lifecycle states and the signal a step sends through
//! its continuation.

/// Where a runner is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerStatus {
  /// Constructed, never started.
  Idle,
  /// Between `start()` and the point where the runner waits, pauses or finishes.
  Running,
  /// `pause()` took effect; `start()` resumes after the last executed step.
  Paused,
  /// `stop()` took effect; `start()` re-executes from the first step.
  Stopped,
  /// Every step ran; success and finally callbacks have fired.
  Completed,
  /// A step failed; failure and finally callbacks have fired.
  Failed,
}

impl RunnerStatus {
  /// True for every state other than `Running`.
  pub fn is_settled(self) -> bool {
    self != RunnerStatus::Running
  }
}

/// What a step reported through its continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSignal {
  /// `next.proceed()`: advance to the following step.
  Proceed,
  /// `next.fail(reason)`: abandon the queue.
  Fail(String),
}
