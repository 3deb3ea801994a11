// stepflow/src/pipeline/definition.rs

//! Contains the `Pipeline<V, Err>` handle: construction, step storage and the
//! pipeline-wide settings (id, name, global hooks, loggers, initial values).

use crate::core::context::{ExecutionContext, Hook};
use crate::core::shared::{SharedCollection, SharedObject};
use crate::core::step::{StepDef, StepInfo};
use crate::error::StepflowError;
use crate::logging::{LogRecord, LoggerRegistry};
use crate::pipeline::hooks::Step;
use parking_lot::Mutex;
use std::sync::Arc;

/// Mutable configuration of a pipeline, guarded by the handle's mutex.
pub(crate) struct PipelineState<V, Err> {
  pub(crate) id: Option<String>,
  pub(crate) name: Option<String>,
  /// Insertion order is execution order.
  pub(crate) steps: Vec<StepDef<V, Err>>,
  pub(crate) before: Option<Hook<V, Err>>,
  pub(crate) after: Option<Hook<V, Err>>,
  pub(crate) initial_result: Option<V>,
  pub(crate) initial_value: Option<V>,
  pub(crate) running: bool,
}

impl<V, Err> PipelineState<V, Err> {
  pub(crate) fn label(&self) -> String {
    self
      .name
      .clone()
      .or_else(|| self.id.clone())
      .unwrap_or_else(|| "<unnamed>".to_string())
  }
}

/// A sequential pipeline of steps.
///
/// `V` is the type of the threaded `value`/`result`/`prev_value`/`next_value`
/// scalars and of the shared sinks' contents; `Err` is the error type every hook
/// returns. `Err` must be `From<StepflowError>` so framework errors (such as a
/// re-entrant `start()`) can be reported through it.
///
/// `Pipeline` is a cheap-to-clone handle. Every clone, and every [`Step`]
/// handle, refers to the same pipeline, which owns its steps.
pub struct Pipeline<V = serde_json::Value, Err = StepflowError>
where
  V: Clone + Send + Sync + 'static,
  Err: std::error::Error + From<StepflowError> + Send + Sync + 'static,
{
  pub(crate) state: Arc<Mutex<PipelineState<V, Err>>>,
  pub(crate) loggers: LoggerRegistry,
  pub(crate) object: SharedObject<V>,
  pub(crate) items: SharedCollection<V>,
}

impl<V, Err> Pipeline<V, Err>
where
  V: Clone + Send + Sync + 'static,
  Err: std::error::Error + From<StepflowError> + Send + Sync + 'static,
{
  /// Creates a pipeline whose first step runs `first_action`, and returns that
  /// step as the entry point of the fluent builder.
  pub fn new<F>(first_action: F) -> Step<V, Err>
  where
    F: Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static,
  {
    let pipeline = Pipeline {
      state: Arc::new(Mutex::new(PipelineState {
        id: None,
        name: None,
        steps: vec![StepDef::new(0, Arc::new(first_action))],
        before: None,
        after: None,
        initial_result: None,
        initial_value: None,
        running: false,
      })),
      loggers: LoggerRegistry::new(),
      object: SharedObject::new(),
      items: SharedCollection::new(),
    };
    Step::attach(pipeline, 0)
  }

  /// Appends a new step and returns its handle.
  pub(crate) fn push_step(&self, action: Hook<V, Err>) -> Step<V, Err> {
    let index = {
      let mut state = self.state.lock();
      let index = state.steps.len();
      state.steps.push(StepDef::new(index, action));
      index
    };
    Step::attach(self.clone(), index)
  }

  /// Runs `f` against the stored definition of the step at `index`.
  pub(crate) fn with_step<R>(&self, index: usize, f: impl FnOnce(&mut StepDef<V, Err>) -> R) -> R {
    let mut state = self.state.lock();
    // Step handles are only created by push_step/new, so the index is always in range.
    f(&mut state.steps[index])
  }

  pub(crate) fn label(&self) -> String {
    self.state.lock().label()
  }

  // --- Identity ---

  pub fn id(&self) -> Option<String> {
    self.state.lock().id.clone()
  }

  pub fn set_id<S: Into<String>>(self, id: S) -> Self {
    self.state.lock().id = Some(id.into());
    self
  }

  pub fn name(&self) -> Option<String> {
    self.state.lock().name.clone()
  }

  pub fn set_name<S: Into<String>>(self, name: S) -> Self {
    self.state.lock().name = Some(name.into());
    self
  }

  // --- Global hooks ---

  /// Sets the pipeline-wide hook run before every step's action
  /// (except for steps built with `skip_before()`). Replaces any previous one.
  pub fn before<F>(self, hook: F) -> Self
  where
    F: Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static,
  {
    self.state.lock().before = Some(Arc::new(hook));
    self
  }

  /// Sets the pipeline-wide hook run after every step's action.
  pub fn after<F>(self, hook: F) -> Self
  where
    F: Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static,
  {
    self.state.lock().after = Some(Arc::new(hook));
    self
  }

  // --- Loggers ---

  pub fn add_logger<F>(self, sink: F) -> Self
  where
    F: Fn(&LogRecord) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    self.loggers.add(Arc::new(sink));
    self
  }

  pub fn loggers(&self) -> &LoggerRegistry {
    &self.loggers
  }

  // --- Initial values ---

  /// Initial `result` of every run.
  pub fn set_result(self, result: V) -> Self {
    self.state.lock().initial_result = Some(result);
    self
  }

  /// Initial `value` of every run.
  pub fn set_value(self, value: V) -> Self {
    self.state.lock().initial_value = Some(value);
    self
  }

  pub fn set_result_and_value(self, value: V) -> Self {
    {
      let mut state = self.state.lock();
      state.initial_result = Some(value.clone());
      state.initial_value = Some(value);
    }
    self
  }

  // --- Inspection ---

  /// Number of steps. Always at least one.
  pub fn step_count(&self) -> usize {
    self.state.lock().steps.len()
  }

  pub fn first_step(&self) -> Step<V, Err> {
    Step::attach(self.clone(), 0)
  }

  pub fn step(&self, index: usize) -> Option<Step<V, Err>> {
    if index < self.step_count() {
      Some(Step::attach(self.clone(), index))
    } else {
      None
    }
  }

  /// Identity of every step, in execution order.
  pub fn step_infos(&self) -> Vec<StepInfo> {
    self.state.lock().steps.iter().map(|s| s.info.clone()).collect()
  }

  pub fn is_running(&self) -> bool {
    self.state.lock().running
  }

  // --- Shared sinks ---

  pub fn object(&self) -> &SharedObject<V> {
    &self.object
  }

  pub fn items(&self) -> &SharedCollection<V> {
    &self.items
  }
}

impl<V, Err> Clone for Pipeline<V, Err>
where
  V: Clone + Send + Sync + 'static,
  Err: std::error::Error + From<StepflowError> + Send + Sync + 'static,
{
  fn clone(&self) -> Self {
    Pipeline {
      state: Arc::clone(&self.state),
      loggers: self.loggers.clone(),
      object: self.object.clone(),
      items: self.items.clone(),
    }
  }
}

impl<V, Err> std::fmt::Debug for Pipeline<V, Err>
where
  V: Clone + Send + Sync + 'static,
  Err: std::error::Error + From<StepflowError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.state.lock();
    f.debug_struct("Pipeline")
      .field("id", &state.id)
      .field("name", &state.name)
      .field("steps", &state.steps)
      .field("before_present", &state.before.is_some())
      .field("after_present", &state.after.is_some())
      .field("loggers", &self.loggers)
      .field("running", &state.running)
      .finish()
  }
}
