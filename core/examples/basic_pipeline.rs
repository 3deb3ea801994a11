// stepflow/examples/basic_pipeline.rs

use serde_json::{json, Value};
use stepflow::{new_pipeline, tracing_sink, ExecutionContext, StepflowError, StepflowResult};
use tracing::info;

type Ctx = ExecutionContext<Value, StepflowError>;

fn show(value: Option<&Value>) -> String {
  value.map(|v| v.to_string()).unwrap_or_else(|| "undefined".to_string())
}

fn tag(ctx: &Ctx) -> String {
  format!("[{}] {}", ctx.id().unwrap_or(""), ctx.name().unwrap_or(""))
}

fn success_action(ctx: &mut Ctx) -> StepflowResult<()> {
  let line = format!("[SUCCESS :: {}] {}", ctx.id().unwrap_or(""), ctx.name().unwrap_or(""));
  ctx.log(line);
  Ok(())
}

fn completed_action(ctx: &mut Ctx) -> StepflowResult<()> {
  let line = format!("[COMPLETE :: {}] {}", ctx.id().unwrap_or(""), ctx.name().unwrap_or(""));
  ctx.log(line);
  Ok(())
}

fn push_item(ctx: &Ctx) {
  let item = format!("{} :: {}", ctx.id().unwrap_or(""), show(ctx.value()));
  ctx.items().push(Value::String(item));
}

fn main() -> Result<(), StepflowError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Basic Pipeline Example ---");

  // 1
  let step1 = new_pipeline(|ctx: &mut Ctx| {
    ctx.set_value(json!(chrono::Utc::now().to_rfc3339()));

    let lines = [
      format!("{} >> value: {}", tag(ctx), show(ctx.value())),
      format!("{} >> prevValue: {}", tag(ctx), show(ctx.prev_value())),
    ];
    for line in lines {
      ctx.log(line);
    }

    ctx.set_next_value(json!(5979));
    push_item(ctx);
    Ok(())
  })
  .success(success_action)
  .complete(completed_action)
  .skip_before()
  .set_id("step-1")
  .set_name("Step 1");

  // 2
  let step2 = step1
    .then(|ctx: &mut Ctx| {
      ctx.set_next_value(json!(23979));
      push_item(ctx);
      ctx.skip_next();
      Ok(())
    })
    .success(success_action)
    .complete(completed_action)
    .set_id("step-2")
    .set_name("Step 2");

  // 3, skipped by step 2
  let step3 = step2
    .then(|ctx: &mut Ctx| {
      ctx.set_next_value(json!("PZ"));
      push_item(ctx);
      Ok(())
    })
    .success(success_action)
    .complete(completed_action)
    .set_id("step-3")
    .set_name("Step 3");

  // 4
  let step4 = step3
    .then(|ctx: &mut Ctx| {
      push_item(ctx);
      ctx.set_invoke_after(false);
      Ok(())
    })
    .success(success_action)
    .complete(completed_action)
    .set_id("step-4")
    .set_name("Step 4");

  // 5
  let step5 = step4
    .then(|ctx: &mut Ctx| {
      let line = format!("[BEFORE __ {}] {} >> value: {}", ctx.id().unwrap_or(""), ctx.name().unwrap_or(""), show(ctx.value()));
      ctx.log(line);
      Err(StepflowError::msg("Error in step 5"))
    })
    .error(|ctx: &mut Ctx| {
      let error = ctx.error().map(|e| e.to_string()).unwrap_or_default();
      let line = format!("!!!ERROR!!! {}: {}", tag(ctx), error);
      ctx.log(line);
      Ok(())
    })
    .success(success_action)
    .complete(completed_action)
    .set_id("step-5")
    .set_name("Step 5");

  // 6
  let batch = step5
    .then(|ctx: &mut Ctx| {
      let line = format!("[BEFORE __ {}] {} >> value: {}", ctx.id().unwrap_or(""), ctx.name().unwrap_or(""), show(ctx.value()));
      ctx.log(line);
      Err(StepflowError::msg("Error in step 6"))
    })
    .ignore_errors()
    .success(success_action)
    .complete(completed_action)
    .set_id("step-6")
    .set_name("Step 6");

  let batch = batch
    .add_logger(|record| {
      println!("batch: {}", record.message);
      Ok(())
    })
    .add_logger(tracing_sink())
    .set_batch_id("my-batch")
    .set_batch_name("My batch")
    .before(|ctx: &mut Ctx| {
      let header = format!(
        "---------- BEFORE [{}; {}] ----------",
        ctx.batch_id().unwrap_or(""),
        ctx.batch_name().unwrap_or("")
      );
      let tag = tag(ctx);
      let lines = [
        header,
        format!("{} >> isFirst: {}", tag, ctx.is_first()),
        format!("{} >> isBetween: {}", tag, ctx.is_between()),
        format!("{} >> isLast: {}", tag, ctx.is_last()),
        String::new(),
        format!("{} >> value: {}", tag, show(ctx.value())),
        format!("{} >> prevValue: {}", tag, show(ctx.prev_value())),
      ];
      for line in lines {
        ctx.log(line);
      }
      Ok(())
    })
    .after(|ctx: &mut Ctx| {
      ctx.log("---------- AFTER ----------").log("");
      Ok(())
    });

  info!("startBatch: starting ...");
  let result = batch.start()?;
  info!("startBatch: finished, result = {}", show(result.as_ref()));

  info!("Batch items:");
  for item in batch.items().snapshot() {
    info!("- {}", item);
  }

  // Step 3 was skipped by step 2, steps 5 and 6 failed before pushing.
  assert_eq!(batch.items().len(), 3);
  Ok(())
}
