// stepflow/src/core/context.rs

//! Defines `ExecutionContext<V, Err>`, the per-step runtime record handed to
//! every hook, together with the `Hook` and `SkipPredicate` closure types.

use crate::core::phase::ExecutionPhase;
use crate::core::shared::{SharedCollection, SharedObject};
use crate::core::step::StepInfo;
use crate::logging::{LogRecord, LoggerRegistry};
use std::sync::Arc;

/// Type alias for every step callback: the action, the pipeline-wide
/// before/after hooks and the step-local success/error/complete hooks.
///
/// A hook receives the context of the step being executed and returns
/// `Ok(())` or the failure that the error-routing logic should act on.
pub type Hook<V, Err> = Arc<dyn Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static>;

/// Predicate installed by a step to decide whether upcoming steps are skipped.
/// It is evaluated once per upcoming step until it returns `false`.
pub type SkipPredicate<V, Err> = Box<dyn FnMut(&ExecutionContext<V, Err>) -> bool + Send + 'static>;

/// Pipeline-level data shared by all contexts of one run.
pub(crate) struct RunScope<V> {
  pub(crate) pipeline_id: Option<String>,
  pub(crate) pipeline_name: Option<String>,
  pub(crate) loggers: LoggerRegistry,
  pub(crate) object: SharedObject<V>,
  pub(crate) items: SharedCollection<V>,
}

/// Everything a finished context hands back to the driver.
pub(crate) struct ContextParts<V, Err> {
  pub(crate) prev_value: Option<V>,
  pub(crate) value: Option<V>,
  pub(crate) result: Option<V>,
  pub(crate) next_value: Option<V>,
  pub(crate) skip_while: Option<SkipPredicate<V, Err>>,
}

/// Runtime record for one step invocation.
///
/// A fresh context is built for every executed step: the `invoke_*` flags
/// start out `true`, `next_value` starts out `None`, and `prev_value`, `value`
/// and `result` are carried in from the previous step.
pub struct ExecutionContext<V, Err> {
  step: StepInfo,
  last_index: usize,
  scope: Arc<RunScope<V>>,
  phase: Option<ExecutionPhase>,

  prev_value: Option<V>,
  value: Option<V>,
  result: Option<V>,
  next_value: Option<V>,
  error: Option<Err>,

  invoke_before: bool,
  invoke_action: bool,
  invoke_after: bool,
  invoke_success: bool,
  invoke_complete: bool,

  skip_while: Option<SkipPredicate<V, Err>>,
}

impl<V, Err> ExecutionContext<V, Err>
where
  V: Send + Sync + 'static,
  Err: Send + 'static,
{
  pub(crate) fn new(
    step: StepInfo,
    last_index: usize,
    scope: Arc<RunScope<V>>,
    prev_value: Option<V>,
    value: Option<V>,
    result: Option<V>,
  ) -> Self {
    ExecutionContext {
      step,
      last_index,
      scope,
      phase: None,
      prev_value,
      value,
      result,
      next_value: None,
      error: None,
      invoke_before: true,
      invoke_action: true,
      invoke_after: true,
      invoke_success: true,
      invoke_complete: true,
      skip_while: None,
    }
  }

  pub(crate) fn enter(&mut self, phase: ExecutionPhase) {
    self.phase = Some(phase);
  }

  pub(crate) fn set_error(&mut self, error: Err) {
    self.error = Some(error);
  }

  pub(crate) fn take_error(&mut self) -> Option<Err> {
    self.error.take()
  }

  pub(crate) fn into_parts(self) -> ContextParts<V, Err> {
    ContextParts {
      prev_value: self.prev_value,
      value: self.value,
      result: self.result,
      next_value: self.next_value,
      skip_while: self.skip_while,
    }
  }

  // --- Position ---

  /// Zero-based position of the step.
  pub fn index(&self) -> usize {
    self.step.index
  }

  pub fn is_first(&self) -> bool {
    self.step.index == 0
  }

  pub fn is_last(&self) -> bool {
    self.step.index >= self.last_index
  }

  /// Neither the first nor the last step.
  pub fn is_between(&self) -> bool {
    !self.is_first() && !self.is_last()
  }

  // --- Identity ---

  pub fn step(&self) -> &StepInfo {
    &self.step
  }

  /// Id of the current step.
  pub fn id(&self) -> Option<&str> {
    self.step.id.as_deref()
  }

  /// Name of the current step.
  pub fn name(&self) -> Option<&str> {
    self.step.name.as_deref()
  }

  /// Id of the pipeline (batch) this step belongs to.
  pub fn batch_id(&self) -> Option<&str> {
    self.scope.pipeline_id.as_deref()
  }

  pub fn batch_name(&self) -> Option<&str> {
    self.scope.pipeline_name.as_deref()
  }

  /// Phase currently executing, `None` before the first phase is entered.
  pub fn phase(&self) -> Option<ExecutionPhase> {
    self.phase
  }

  pub fn phase_name(&self) -> Option<&'static str> {
    self.phase.map(|p| p.as_str())
  }

  /// The failure being handled. Only set once the error phase is entered.
  pub fn error(&self) -> Option<&Err> {
    self.error.as_ref()
  }

  // --- Threaded values ---

  /// `next_value` of the previously executed step.
  pub fn prev_value(&self) -> Option<&V> {
    self.prev_value.as_ref()
  }

  pub fn value(&self) -> Option<&V> {
    self.value.as_ref()
  }

  pub fn value_mut(&mut self) -> &mut Option<V> {
    &mut self.value
  }

  pub fn set_value(&mut self, value: V) -> &mut Self {
    self.value = Some(value);
    self
  }

  pub fn result(&self) -> Option<&V> {
    self.result.as_ref()
  }

  pub fn result_mut(&mut self) -> &mut Option<V> {
    &mut self.result
  }

  pub fn set_result(&mut self, result: V) -> &mut Self {
    self.result = Some(result);
    self
  }

  pub fn set_result_and_value(&mut self, value: V) -> &mut Self
  where
    V: Clone,
  {
    self.result = Some(value.clone());
    self.value = Some(value);
    self
  }

  /// Value handed to the next executed step as its `prev_value`.
  pub fn next_value(&self) -> Option<&V> {
    self.next_value.as_ref()
  }

  pub fn next_value_mut(&mut self) -> &mut Option<V> {
    &mut self.next_value
  }

  pub fn set_next_value(&mut self, value: V) -> &mut Self {
    self.next_value = Some(value);
    self
  }

  // --- Phase flags ---

  pub fn invoke_before(&self) -> bool {
    self.invoke_before
  }

  pub fn set_invoke_before(&mut self, flag: bool) -> &mut Self {
    self.invoke_before = flag;
    self
  }

  pub fn invoke_action(&self) -> bool {
    self.invoke_action
  }

  pub fn set_invoke_action(&mut self, flag: bool) -> &mut Self {
    self.invoke_action = flag;
    self
  }

  pub fn invoke_after(&self) -> bool {
    self.invoke_after
  }

  pub fn set_invoke_after(&mut self, flag: bool) -> &mut Self {
    self.invoke_after = flag;
    self
  }

  pub fn invoke_success(&self) -> bool {
    self.invoke_success
  }

  pub fn set_invoke_success(&mut self, flag: bool) -> &mut Self {
    self.invoke_success = flag;
    self
  }

  pub fn invoke_complete(&self) -> bool {
    self.invoke_complete
  }

  pub fn set_invoke_complete(&mut self, flag: bool) -> &mut Self {
    self.invoke_complete = flag;
    self
  }

  // --- Skip control ---

  /// Skips exactly the next `count` steps. `skip(0)` skips nothing.
  pub fn skip(&mut self, count: usize) -> &mut Self {
    let mut remaining = count;
    self.skip_while(move |_| {
      if remaining > 0 {
        remaining -= 1;
        true
      } else {
        false
      }
    })
  }

  pub fn skip_next(&mut self) -> &mut Self {
    self.skip(1)
  }

  /// `skip(1)` when `flag` is set, `skip(0)` otherwise.
  pub fn set_skip_next(&mut self, flag: bool) -> &mut Self {
    self.skip(usize::from(flag))
  }

  /// Skips every remaining step.
  pub fn skip_all(&mut self) -> &mut Self {
    self.set_skip_all(true)
  }

  pub fn set_skip_all(&mut self, flag: bool) -> &mut Self {
    self.skip_while(move |_| flag)
  }

  /// Skips upcoming steps for as long as `predicate` returns `true`.
  /// Replaces any directive installed earlier by this step.
  pub fn skip_while(&mut self, predicate: impl FnMut(&ExecutionContext<V, Err>) -> bool + Send + 'static) -> &mut Self {
    self.skip_while = Some(Box::new(predicate));
    self
  }

  /// Whether this step has installed a skip directive for upcoming steps.
  pub fn has_skip_directive(&self) -> bool {
    self.skip_while.is_some()
  }

  // --- Shared state ---

  pub fn object(&self) -> &SharedObject<V> {
    &self.scope.object
  }

  pub fn items(&self) -> &SharedCollection<V> {
    &self.scope.items
  }

  /// Sends `message` to every registered logger, in registration order.
  /// Failing loggers are ignored.
  pub fn log<M: Into<String>>(&mut self, message: M) -> &mut Self {
    let record = LogRecord {
      step: self.step.clone(),
      pipeline_id: self.scope.pipeline_id.clone(),
      pipeline_name: self.scope.pipeline_name.clone(),
      phase: self.phase,
      timestamp: chrono::Utc::now(),
      message: message.into(),
    };
    self.scope.loggers.dispatch(&record);
    self
  }
}

impl<V, Err> std::fmt::Debug for ExecutionContext<V, Err>
where
  V: std::fmt::Debug,
  Err: std::fmt::Debug,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExecutionContext")
      .field("step", &self.step)
      .field("last_index", &self.last_index)
      .field("phase", &self.phase)
      .field("prev_value", &self.prev_value)
      .field("value", &self.value)
      .field("result", &self.result)
      .field("next_value", &self.next_value)
      .field("error", &self.error)
      .field("skip_directive_present", &self.skip_while.is_some())
      .finish()
  }
}
