// stepflow/examples/error_handling.rs

use stepflow::{ExecutionContext, Pipeline, StepflowError};
use tracing::{error, info};

// 1. A custom application error type. It must be constructible from
//    StepflowError so framework errors can flow through it.
#[derive(Debug, thiserror::Error)]
enum ImportError {
  #[error("Row {row} is malformed")]
  Malformed { row: usize },

  #[error("Upstream service unavailable")]
  Unavailable,

  #[error("Stepflow framework error: {0}")]
  Framework(#[from] StepflowError),
}

type Ctx = ExecutionContext<i64, ImportError>;

fn main() {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Error Handling Example ---");

  info!("Scenario 1: an error hook contains the failure");
  contained_by_error_hook();

  info!("Scenario 2: ignore_errors swallows the failure");
  ignored_failure();

  info!("Scenario 3: an uncaught failure aborts the run");
  aborted_run();
}

fn contained_by_error_hook() {
  let first = Pipeline::<i64, ImportError>::new(|ctx: &mut Ctx| {
    ctx.set_result(0);
    Err(ImportError::Malformed { row: 17 })
  })
  .error(|ctx: &mut Ctx| {
    if let Some(e) = ctx.error() {
      error!("Step {} failed: {}", ctx.index(), e);
    }
    // Count the rejected row and carry on.
    ctx.object().set("rejected", 1);
    Ok(())
  })
  .complete(|ctx: &mut Ctx| {
    info!("Step {} completed", ctx.index());
    Ok(())
  });
  first.then(|ctx: &mut Ctx| {
    let rejected = ctx.object().get("rejected").unwrap_or_default();
    ctx.set_result(10 - rejected);
    Ok(())
  });

  match first.start() {
    Ok(result) => info!("Imported rows: {:?}", result),
    Err(e) => error!("Unexpected failure: {}", e),
  }
}

fn ignored_failure() {
  let first = Pipeline::<i64, ImportError>::new(|_ctx: &mut Ctx| Err(ImportError::Unavailable))
    .success(|_ctx: &mut Ctx| {
      info!("Never printed: success does not run for a failed step");
      Ok(())
    })
    .ignore_errors();
  first.then(|ctx: &mut Ctx| {
    info!("Step {} still runs", ctx.index());
    Ok(())
  });

  if let Err(e) = first.start() {
    error!("Unexpected failure: {}", e);
  }
}

fn aborted_run() {
  let first = Pipeline::<i64, ImportError>::new(|ctx: &mut Ctx| {
    ctx.items().push(1);
    Ok(())
  });
  first
    .then(|_ctx: &mut Ctx| Err(ImportError::Unavailable))
    .complete(|ctx: &mut Ctx| {
      info!("Complete hook of step {} runs before the abort", ctx.index());
      Ok(())
    });
  first.then(|_ctx: &mut Ctx| {
    info!("Never printed: the pipeline was aborted");
    Ok(())
  });

  match first.start() {
    Ok(_) => info!("Unexpected success"),
    Err(ImportError::Unavailable) => {
      info!("Run aborted as expected; items kept: {:?}", first.items().snapshot());
    }
    Err(other) => error!("Wrong error: {}", other),
  }
}
