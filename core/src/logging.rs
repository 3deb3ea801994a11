// stepflow/src/logging.rs

//! The pipeline's logger registry: user-supplied sinks that receive every
//! message logged by a step, in registration order.

use crate::core::phase::ExecutionPhase;
use crate::core::step::StepInfo;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{event, Level};

/// A single message emitted through `ExecutionContext::log` or `Step::log`.
#[derive(Debug, Clone)]
pub struct LogRecord {
  /// The step that logged the message.
  pub step: StepInfo,
  pub pipeline_id: Option<String>,
  pub pipeline_name: Option<String>,
  /// Phase the step was in, `None` when logged outside of a run.
  pub phase: Option<ExecutionPhase>,
  pub timestamp: DateTime<Utc>,
  pub message: String,
}

/// A log sink. A returned error is traced and otherwise ignored.
pub type LogSink = Arc<dyn Fn(&LogRecord) -> anyhow::Result<()> + Send + Sync + 'static>;

/// Append-only, shared list of sinks.
#[derive(Clone, Default)]
pub struct LoggerRegistry {
  sinks: Arc<RwLock<Vec<LogSink>>>,
}

impl LoggerRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&self, sink: LogSink) {
    self.sinks.write().push(sink);
  }

  pub fn len(&self) -> usize {
    self.sinks.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.sinks.read().is_empty()
  }

  /// Delivers `record` to every sink exactly once, in registration order.
  ///
  /// The sink list is copied before dispatch, so a sink may register further
  /// sinks without deadlocking; those only see later records.
  pub fn dispatch(&self, record: &LogRecord) {
    let sinks: Vec<LogSink> = self.sinks.read().clone();
    for (sink_index, sink) in sinks.iter().enumerate() {
      if let Err(e) = sink(record) {
        event!(Level::WARN, sink_index, error = %e, "Log sink failed; ignoring.");
      }
    }
  }
}

impl std::fmt::Debug for LoggerRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LoggerRegistry").field("sinks", &self.len()).finish()
  }
}

/// A sink that forwards every record to `tracing` as an INFO event.
pub fn tracing_sink() -> impl Fn(&LogRecord) -> anyhow::Result<()> + Send + Sync + 'static {
  |record: &LogRecord| {
    event!(
      target: "stepflow::log",
      Level::INFO,
      pipeline_id = record.pipeline_id.as_deref().unwrap_or(""),
      pipeline_name = record.pipeline_name.as_deref().unwrap_or(""),
      step_index = record.step.index,
      step_id = record.step.id.as_deref().unwrap_or(""),
      step_name = record.step.name.as_deref().unwrap_or(""),
      phase = record.phase.map(|p| p.as_str()).unwrap_or(""),
      timestamp = %record.timestamp.to_rfc3339(),
      "{}",
      record.message
    );
    Ok(())
  }
}
