// stepflow/src/pipeline/hooks.rs

//! Contains the `Step<V, Err>` handle: the fluent builder surface for
//! appending steps and registering their hooks. Pipeline-wide settings
//! reachable from a step (`before`, `after`, `add_logger`, batch id/name)
//! are forwarded to the owning pipeline.

use crate::core::context::ExecutionContext;
use crate::core::shared::{SharedCollection, SharedObject};
use crate::core::step::StepInfo;
use crate::error::StepflowError;
use crate::logging::LogRecord;
use crate::pipeline::definition::Pipeline;
use std::sync::Arc;
use tracing::{event, Level};

/// Handle to one step of a pipeline.
///
/// Builder methods consume and return the handle so calls can be chained;
/// `then` borrows it so an earlier step handle can still be used afterwards.
/// Handles are cheap to clone.
pub struct Step<V = serde_json::Value, Err = StepflowError>
where
  V: Clone + Send + Sync + 'static,
  Err: std::error::Error + From<StepflowError> + Send + Sync + 'static,
{
  pipeline: Pipeline<V, Err>,
  index: usize,
}

impl<V, Err> Step<V, Err>
where
  V: Clone + Send + Sync + 'static,
  Err: std::error::Error + From<StepflowError> + Send + Sync + 'static,
{
  pub(crate) fn attach(pipeline: Pipeline<V, Err>, index: usize) -> Self {
    Step { pipeline, index }
  }

  /// Appends a new step running `action` to the same pipeline and returns it.
  pub fn then<F>(&self, action: F) -> Step<V, Err>
  where
    F: Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static,
  {
    let next = self.pipeline.push_step(Arc::new(action));
    event!(Level::TRACE, step_index = next.index, "Step appended.");
    next
  }

  // --- Step identity ---

  pub fn set_id<S: Into<String>>(self, id: S) -> Self {
    let id = id.into();
    self.pipeline.with_step(self.index, |s| s.info.id = Some(id));
    self
  }

  pub fn set_name<S: Into<String>>(self, name: S) -> Self {
    let name = name.into();
    self.pipeline.with_step(self.index, |s| s.info.name = Some(name));
    self
  }

  pub fn id(&self) -> Option<String> {
    self.pipeline.with_step(self.index, |s| s.info.id.clone())
  }

  pub fn name(&self) -> Option<String> {
    self.pipeline.with_step(self.index, |s| s.info.name.clone())
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn info(&self) -> StepInfo {
    self.pipeline.with_step(self.index, |s| s.info.clone())
  }

  // --- Pipeline identity ---

  pub fn set_batch_id<S: Into<String>>(self, id: S) -> Self {
    let pipeline = self.pipeline.clone().set_id(id);
    Step { pipeline, ..self }
  }

  pub fn set_batch_name<S: Into<String>>(self, name: S) -> Self {
    let pipeline = self.pipeline.clone().set_name(name);
    Step { pipeline, ..self }
  }

  pub fn batch_id(&self) -> Option<String> {
    self.pipeline.id()
  }

  pub fn batch_name(&self) -> Option<String> {
    self.pipeline.name()
  }

  // --- Step-local hooks ---

  /// Runs after before/action/after have all succeeded.
  pub fn success<F>(self, hook: F) -> Self
  where
    F: Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static,
  {
    self.pipeline.with_step(self.index, |s| s.on_success = Some(Arc::new(hook)));
    self
  }

  /// Receives failures of the before, action and after phases, with
  /// `ctx.error()` set. A failure of the success hook is never routed here.
  pub fn error<F>(self, hook: F) -> Self
  where
    F: Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static,
  {
    self.pipeline.with_step(self.index, |s| s.on_error = Some(Arc::new(hook)));
    self
  }

  /// Runs last, whether the step succeeded or its failure was contained.
  pub fn complete<F>(self, hook: F) -> Self
  where
    F: Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static,
  {
    self.pipeline.with_step(self.index, |s| s.on_complete = Some(Arc::new(hook)));
    self
  }

  // --- Step flags ---

  /// Do not run the pipeline-wide "before" hook for this step.
  pub fn skip_before(self) -> Self {
    self.set_skip_before(true)
  }

  pub fn set_skip_before(self, flag: bool) -> Self {
    self.pipeline.with_step(self.index, |s| s.skip_before = flag);
    self
  }

  /// Keep the pipeline running when this step fails and no error hook handles
  /// the failure. Behaves like installing an error hook that does nothing.
  pub fn ignore_errors(self) -> Self {
    self.set_ignore_errors(true)
  }

  pub fn set_ignore_errors(self, flag: bool) -> Self {
    self.pipeline.with_step(self.index, |s| s.ignore_errors = flag);
    self
  }

  // --- Pipeline-wide settings ---

  pub fn before<F>(self, hook: F) -> Self
  where
    F: Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static,
  {
    let pipeline = self.pipeline.clone().before(hook);
    Step { pipeline, ..self }
  }

  pub fn after<F>(self, hook: F) -> Self
  where
    F: Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static,
  {
    let pipeline = self.pipeline.clone().after(hook);
    Step { pipeline, ..self }
  }

  pub fn add_logger<F>(self, sink: F) -> Self
  where
    F: Fn(&LogRecord) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    let pipeline = self.pipeline.clone().add_logger(sink);
    Step { pipeline, ..self }
  }

  /// Sends `message` to the pipeline's loggers outside of any run.
  pub fn log<M: Into<String>>(&self, message: M) -> &Self {
    let record = LogRecord {
      step: self.info(),
      pipeline_id: self.pipeline.id(),
      pipeline_name: self.pipeline.name(),
      phase: None,
      timestamp: chrono::Utc::now(),
      message: message.into(),
    };
    self.pipeline.loggers.dispatch(&record);
    self
  }

  // --- Access ---

  pub fn pipeline(&self) -> Pipeline<V, Err> {
    self.pipeline.clone()
  }

  pub fn object(&self) -> &SharedObject<V> {
    self.pipeline.object()
  }

  pub fn items(&self) -> &SharedCollection<V> {
    self.pipeline.items()
  }

  /// Runs the whole pipeline this step belongs to. See [`Pipeline::start`].
  pub fn start(&self) -> Result<Option<V>, Err> {
    self.pipeline.start()
  }
}

impl<V, Err> Clone for Step<V, Err>
where
  V: Clone + Send + Sync + 'static,
  Err: std::error::Error + From<StepflowError> + Send + Sync + 'static,
{
  fn clone(&self) -> Self {
    Step {
      pipeline: self.pipeline.clone(),
      index: self.index,
    }
  }
}

impl<V, Err> std::fmt::Debug for Step<V, Err>
where
  V: Clone + Send + Sync + 'static,
  Err: std::error::Error + From<StepflowError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Step").field("info", &self.info()).finish()
  }
}
