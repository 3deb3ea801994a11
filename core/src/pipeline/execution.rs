// stepflow/src/pipeline/execution.rs

//! Contains the `Pipeline::start()` method: a single forward pass over the
//! steps, the per-step phase protocol and the error-routing state machine.

use crate::core::context::{ExecutionContext, Hook, RunScope, SkipPredicate};
use crate::core::phase::ExecutionPhase;
use crate::core::step::StepDef;
use crate::error::StepflowError;
use crate::pipeline::definition::{Pipeline, PipelineState};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{event, instrument, span, Level};

/// Immutable copy of the pipeline taken when a run begins.
struct ExecutionPlan<V, Err> {
  steps: Vec<StepDef<V, Err>>,
  before: Option<Hook<V, Err>>,
  after: Option<Hook<V, Err>>,
  initial_result: Option<V>,
  initial_value: Option<V>,
  scope: Arc<RunScope<V>>,
}

/// State threaded from one iteration of the driver loop to the next.
struct Carry<V, Err> {
  prev_value: Option<V>,
  value: Option<V>,
  result: Option<V>,
  skip_while: Option<SkipPredicate<V, Err>>,
}

/// A failed phase, before routing decides what to do with it.
struct Failure<Err> {
  phase: ExecutionPhase,
  error: Err,
}

impl<Err> Failure<Err> {
  /// Only before/execution/after failures may be handed to the step's error hook.
  fn is_handleable(&self) -> bool {
    matches!(
      self.phase,
      ExecutionPhase::Before | ExecutionPhase::Execution | ExecutionPhase::After
    )
  }
}

/// Clears the running flag when the run ends, including on early return.
struct RunGuard<'a, V, Err> {
  state: &'a Mutex<PipelineState<V, Err>>,
}

impl<V, Err> Drop for RunGuard<'_, V, Err> {
  fn drop(&mut self) {
    self.state.lock().running = false;
  }
}

impl<V, Err> Pipeline<V, Err>
where
  V: Clone + Send + Sync + 'static,
  Err: std::error::Error + From<StepflowError> + Send + Sync + 'static,
{
  /// Executes every step once, in order, and returns the final `result`.
  ///
  /// A failure that no step contains (no error hook, `ignore_errors` not set)
  /// aborts the run: the failing step's complete hook still runs, no further
  /// step executes, and the failure is returned. Shared state mutated before
  /// the abort is left as is.
  ///
  /// Calling `start()` on a pipeline that is already running (from inside one
  /// of its own hooks) fails with `StepflowError::AlreadyRunning`.
  #[instrument(
        name = "Pipeline::start",
        skip_all,
        fields(
            pipeline = %self.label(),
            value_type = %std::any::type_name::<V>(),
            num_steps = self.step_count(),
        ),
        err(Display)
    )]
  pub fn start(&self) -> Result<Option<V>, Err> {
    let plan = self.begin_run().map_err(Err::from)?;
    let _running = RunGuard { state: &self.state };
    event!(Level::DEBUG, "Pipeline execution starting.");

    let last_index = plan.steps.len().saturating_sub(1);
    let mut carry = Carry {
      prev_value: None,
      value: plan.initial_value.clone(),
      result: plan.initial_result.clone(),
      skip_while: None,
    };

    for step in plan.steps.iter() {
      let step_span = span!(
        Level::INFO,
        "pipeline_step_execution",
        step_index = step.info.index,
        step_id = step.info.id.as_deref().unwrap_or(""),
        step_name = step.info.name.as_deref().unwrap_or(""),
      );
      let _step_span_guard = step_span.enter();

      let mut ctx = ExecutionContext::new(
        step.info.clone(),
        last_index,
        Arc::clone(&plan.scope),
        carry.prev_value.take(),
        carry.value.take(),
        carry.result.take(),
      );

      if let Some(skip_while) = carry.skip_while.as_mut() {
        if skip_while(&ctx) {
          event!(Level::INFO, "Step skipped by skip directive.");
          // A skipped step produces nothing: everything, prev_value included,
          // passes through to the next step untouched.
          let parts = ctx.into_parts();
          carry.prev_value = parts.prev_value;
          carry.value = parts.value;
          carry.result = parts.result;
          continue;
        }
        carry.skip_while = None;
      }

      Self::run_step(&plan, step, &mut ctx)?;

      let parts = ctx.into_parts();
      carry = Carry {
        prev_value: parts.next_value,
        value: parts.value,
        result: parts.result,
        skip_while: parts.skip_while,
      };
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(carry.result)
  }

  /// Marks the pipeline as running and snapshots everything a run needs.
  fn begin_run(&self) -> Result<ExecutionPlan<V, Err>, StepflowError> {
    let mut state = self.state.lock();
    if state.running {
      let pipeline = state.label();
      event!(Level::ERROR, %pipeline, "Re-entrant start rejected.");
      return Err(StepflowError::AlreadyRunning { pipeline });
    }
    state.running = true;

    Ok(ExecutionPlan {
      steps: state.steps.clone(),
      before: state.before.clone(),
      after: state.after.clone(),
      initial_result: state.initial_result.clone(),
      initial_value: state.initial_value.clone(),
      scope: Arc::new(RunScope {
        pipeline_id: state.id.clone(),
        pipeline_name: state.name.clone(),
        loggers: self.loggers.clone(),
        object: self.object.clone(),
        items: self.items.clone(),
      }),
    })
  }

  /// Runs one step to a terminal state: success then complete, contained
  /// failure then complete, or an uncaught failure returned as `Err`.
  fn run_step(
    plan: &ExecutionPlan<V, Err>,
    step: &StepDef<V, Err>,
    ctx: &mut ExecutionContext<V, Err>,
  ) -> Result<(), Err> {
    let failure = match Self::run_phases(plan, step, ctx) {
      Ok(()) => {
        event!(Level::DEBUG, "Step succeeded.");
        return Self::run_complete(step, ctx);
      }
      Err(failure) => failure,
    };

    let handleable = failure.is_handleable();
    event!(Level::DEBUG, phase = %failure.phase, error = %failure.error, handleable, "Step failed.");
    ctx.set_error(failure.error);
    ctx.enter(ExecutionPhase::Error);

    match &step.on_error {
      Some(on_error) if handleable => {
        event!(Level::TRACE, "Executing 'error' hook.");
        if let Err(e) = on_error(ctx) {
          event!(Level::ERROR, error = %e, "'error' hook failed; aborting pipeline.");
          return Err(e);
        }
        Self::run_complete(step, ctx)
      }
      _ if step.ignore_errors => {
        event!(Level::WARN, "Unhandled step failure ignored.");
        Self::run_complete(step, ctx)
      }
      _ => {
        event!(Level::ERROR, "Unhandled step failure; aborting pipeline.");
        if let Err(complete_err) = Self::run_complete(step, ctx) {
          event!(Level::ERROR, error = %complete_err, "'complete' hook failed while aborting.");
        }
        // The error was stored above and hooks cannot take it out.
        match ctx.take_error() {
          Some(error) => Err(error),
          None => Ok(()),
        }
      }
    }
  }

  /// before -> execution -> after -> success. Each phase runs only if its
  /// `invoke_*` flag is still set when it is reached and its hook exists.
  fn run_phases(
    plan: &ExecutionPlan<V, Err>,
    step: &StepDef<V, Err>,
    ctx: &mut ExecutionContext<V, Err>,
  ) -> Result<(), Failure<Err>> {
    if ctx.invoke_before() && !step.skip_before {
      if let Some(before) = &plan.before {
        Self::run_phase(ExecutionPhase::Before, before, ctx)?;
      }
    }

    if ctx.invoke_action() {
      Self::run_phase(ExecutionPhase::Execution, &step.action, ctx)?;
    }

    if ctx.invoke_after() {
      if let Some(after) = &plan.after {
        Self::run_phase(ExecutionPhase::After, after, ctx)?;
      }
    }

    if ctx.invoke_success() {
      if let Some(on_success) = &step.on_success {
        Self::run_phase(ExecutionPhase::Success, on_success, ctx)?;
      }
    }

    Ok(())
  }

  fn run_phase(
    phase: ExecutionPhase,
    hook: &Hook<V, Err>,
    ctx: &mut ExecutionContext<V, Err>,
  ) -> Result<(), Failure<Err>> {
    event!(Level::TRACE, %phase, "Entering phase.");
    ctx.enter(phase);
    hook(ctx).map_err(|error| Failure { phase, error })
  }

  /// The complete phase. Its failure is never routed to the error hook:
  /// it is swallowed under `ignore_errors`, otherwise returned.
  fn run_complete(step: &StepDef<V, Err>, ctx: &mut ExecutionContext<V, Err>) -> Result<(), Err> {
    if !ctx.invoke_complete() {
      return Ok(());
    }
    let Some(on_complete) = &step.on_complete else {
      return Ok(());
    };

    event!(Level::TRACE, "Executing 'complete' hook.");
    ctx.enter(ExecutionPhase::Complete);
    match on_complete(ctx) {
      Ok(()) => Ok(()),
      Err(e) if step.ignore_errors => {
        event!(Level::WARN, error = %e, "'complete' hook failed; ignored.");
        Ok(())
      }
      Err(e) => {
        event!(Level::ERROR, error = %e, "'complete' hook failed.");
        Err(e)
      }
    }
  }
}
