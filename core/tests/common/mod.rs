// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use parking_lot::Mutex;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use stepflow::{ExecutionContext, Pipeline, Step, StepflowError};
use tracing::Level;

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Stepflow framework error: {0}")]
  Stepflow(String), // Stored as String for Eq comparison

  #[error("Test hook failed: {0}")]
  Hook(String),
}

impl From<StepflowError> for TestError {
  fn from(err: StepflowError) -> Self {
    TestError::Stepflow(err.to_string())
  }
}

pub type Ctx = ExecutionContext<i64, TestError>;
pub type TestStep = Step<i64, TestError>;
pub type HookResult = Result<(), TestError>;

// --- Shared record of what ran, in order ---
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
  pub fn record<S: Into<String>>(&self, entry: S) {
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

// --- Common Hook Creators ---

/// Records `"<label>:<index>"` and succeeds.
pub fn tracked(journal: &Journal, label: &'static str) -> impl Fn(&mut Ctx) -> HookResult + Send + Sync + 'static {
  let journal = journal.clone();
  move |ctx: &mut Ctx| {
    journal.record(format!("{}:{}", label, ctx.index()));
    tracing::debug!(target: "test_hooks", label, index = ctx.index(), "hook executed");
    Ok(())
  }
}

/// Records `"<label>:<index>"` and fails with `TestError::Hook(message)`.
pub fn failing(
  journal: &Journal,
  label: &'static str,
  message: &'static str,
) -> impl Fn(&mut Ctx) -> HookResult + Send + Sync + 'static {
  let journal = journal.clone();
  move |ctx: &mut Ctx| {
    journal.record(format!("{}:{}", label, ctx.index()));
    tracing::warn!(target: "test_hooks", label, index = ctx.index(), "failing with: '{}'", message);
    Err(TestError::Hook(message.to_string()))
  }
}

/// Builds a pipeline of `count` steps whose actions, success and complete hooks
/// are all tracked, and returns its first step.
pub fn tracked_pipeline(journal: &Journal, count: usize) -> TestStep {
  assert!(count >= 1);
  let first = Pipeline::<i64, TestError>::new(tracked(journal, "action"))
    .success(tracked(journal, "success"))
    .complete(tracked(journal, "complete"));
  let mut last = first.clone();
  for _ in 1..count {
    last = last
      .then(tracked(journal, "action"))
      .success(tracked(journal, "success"))
      .complete(tracked(journal, "complete"));
  }
  first
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::TRACE)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Atomic counters for checking execution counts ---
pub static LOG_SINK_CALLS: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static OBSERVER_CALLS: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  LOG_SINK_CALLS.store(0, Ordering::SeqCst);
  OBSERVER_CALLS.store(0, Ordering::SeqCst);
}
