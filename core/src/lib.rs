// stepflow/src/lib.rs

//! Stepflow: a synchronous, sequential step-execution engine.
//!
//! A pipeline is an ordered list of steps built with a fluent API:
//!  - Every step has an action plus optional success/error/complete hooks.
//!  - Pipeline-wide before/after hooks wrap every step's action.
//!  - `value`, `result` and `prev_value`/`next_value` are threaded from step to step.
//!  - A step can skip upcoming steps (`skip`, `skip_next`, `skip_all`, `skip_while`).
//!  - Failures are contained per step (error hook or `ignore_errors`) or abort the run.
//!  - Steps log through a registry of user-supplied sinks.
//!  - A shared object and a shared append-only collection are visible to every step.

pub mod core;
pub mod error;
pub mod logging;
pub mod pipeline;

// --- Re-exports for the Public API ---

pub use crate::core::context::{ExecutionContext, Hook, SkipPredicate};
pub use crate::core::phase::ExecutionPhase;
pub use crate::core::shared::{SharedCollection, SharedObject};
pub use crate::core::step::StepInfo;

pub use crate::pipeline::definition::Pipeline;
pub use crate::pipeline::hooks::Step;

pub use crate::error::{StepflowError, StepflowResult};
pub use crate::logging::{tracing_sink, LogRecord, LogSink, LoggerRegistry};

/// Creates a new pipeline whose first step runs `first_action` and returns that step.
///
/// Equivalent to [`Pipeline::new`].
pub fn new_pipeline<V, Err, F>(first_action: F) -> Step<V, Err>
where
  V: Clone + Send + Sync + 'static,
  Err: std::error::Error + From<StepflowError> + Send + Sync + 'static,
  F: Fn(&mut ExecutionContext<V, Err>) -> Result<(), Err> + Send + Sync + 'static,
{
  Pipeline::new(first_action)
}

/*
    Core Workflow:
    1. Pick the threaded value type `V` (default `serde_json::Value`) and an error
       type `Err` that is `From<StepflowError>` (or use `StepflowError` itself).
    2. `new_pipeline(action)` creates the pipeline and returns its first step.
    3. Chain `.then(action)` to append steps; configure each with `.success()`,
       `.error()`, `.complete()`, `.skip_before()`, `.ignore_errors()`, ids and names.
    4. Configure the pipeline through any step: `.before()`, `.after()`,
       `.add_logger()`, `.set_batch_id()`, `.set_batch_name()`.
    5. Call `.start()` on any step (or on `step.pipeline()`); it returns the final `result`.
*/
