// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use go_flow::{Go, Injectable, RunnerStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

// --- Shared execution log ---
#[derive(Clone, Debug, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, entry: impl Into<String>) {
    self.0.lock().push(entry.into());
  }

  pub fn entries(&self) -> Vec<String> {
    self.0.lock().clone()
  }

  pub fn contains(&self, entry: &str) -> bool {
    self.0.lock().iter().any(|e| e == entry)
  }

  pub fn count(&self, entry: &str) -> usize {
    self.0.lock().iter().filter(|e| e.as_str() == entry).count()
  }
}

// --- A small stateful service used across tests ---
#[derive(Debug, Default)]
pub struct Counter {
  value: Mutex<i64>,
}

impl Counter {
  pub fn add(&self, n: i64) -> i64 {
    let mut v = self.value.lock();
    *v += n;
    *v
  }

  pub fn get(&self) -> i64 {
    *self.value.lock()
  }
}

// --- Common step creators ---

/// A fire-and-forget step that appends `label` to `log`.
pub fn record_step(log: &Log, label: &'static str) -> Injectable {
  let log = log.clone();
  Injectable::action(Vec::<String>::new(), move |_| {
    log.push(label);
    Ok(())
  })
}

/// Waits for the runner to settle, failing the test instead of hanging.
pub async fn settle(go: &Go) -> RunnerStatus {
  tokio::time::timeout(Duration::from_secs(5), go.settled())
    .await
    .expect("runner did not settle within 5s")
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
