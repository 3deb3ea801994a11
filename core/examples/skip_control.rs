// stepflow/examples/skip_control.rs

use stepflow::{ExecutionContext, Pipeline, StepflowError};
use tracing::info;

type Ctx = ExecutionContext<i64, StepflowError>;

fn main() -> Result<(), StepflowError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Skip Control Example ---");

  let first = Pipeline::<i64, StepflowError>::new(|ctx: &mut Ctx| {
    ctx.set_result(1).skip(2);
    Ok(())
  })
  .set_name("load");

  for name in ["validate", "enrich"] {
    first
      .then(|ctx: &mut Ctx| {
        info!("Never printed: skipped by step 0");
        ctx.set_result(-1);
        Ok(())
      })
      .set_name(name);
  }

  first
    .then(|ctx: &mut Ctx| {
      let total = ctx.result().copied().unwrap_or_default() + 10;
      ctx.set_result(total);
      // Skip every step whose name starts with "audit".
      ctx.skip_while(|upcoming: &Ctx| upcoming.name().is_some_and(|n| n.starts_with("audit")));
      Ok(())
    })
    .set_name("transform");

  for name in ["audit-a", "audit-b"] {
    first.then(|_ctx: &mut Ctx| Ok(())).set_name(name);
  }

  first
    .then(|ctx: &mut Ctx| {
      info!("Step '{}' runs with result {:?}", ctx.name().unwrap_or(""), ctx.result());
      ctx.skip_all();
      Ok(())
    })
    .set_name("store");

  first.then(|_ctx: &mut Ctx| Ok(())).set_name("notify");

  let result = first.start()?;
  info!("Final result: {:?}", result);
  assert_eq!(result, Some(11));
  Ok(())
}
