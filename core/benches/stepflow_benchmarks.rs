use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stepflow::{ExecutionContext, Pipeline, SharedObject, Step, StepflowError};

type BenchCtx = ExecutionContext<u64, StepflowError>;
type BenchStep = Step<u64, StepflowError>;

// --- Helper: CPU-bound action that folds into the threaded result ---
fn increment_action(iterations: u64) -> impl Fn(&mut BenchCtx) -> Result<(), StepflowError> + Send + Sync + 'static {
  move |ctx: &mut BenchCtx| {
    let mut acc = ctx.result().copied().unwrap_or_default();
    for _ in 0..iterations {
      acc = acc.wrapping_add(1);
    }
    ctx.set_result(acc);
    Ok(())
  }
}

fn build_pipeline(num_steps: usize, iterations: u64) -> BenchStep {
  let first = Pipeline::<u64, StepflowError>::new(increment_action(iterations));
  for _ in 1..num_steps {
    first.then(increment_action(iterations));
  }
  first
}

// --- Benchmark Functions ---

fn bench_plain_pipeline(c: &mut Criterion) {
  let mut group = c.benchmark_group("PlainPipeline");

  for num_steps in [1usize, 5, 10, 50] {
    for iterations in [1u64, 100] {
      let first = build_pipeline(num_steps, iterations);
      group.throughput(Throughput::Elements(num_steps as u64));
      group.bench_with_input(
        BenchmarkId::new(format!("{}iter", iterations), num_steps),
        &num_steps,
        |b, _| b.iter(|| black_box(first.start().unwrap())),
      );
    }
  }
  group.finish();
}

fn bench_all_hooks(c: &mut Criterion) {
  let mut group = c.benchmark_group("AllHooks");

  for num_steps in [1usize, 10] {
    let first = build_pipeline(num_steps, 1);
    let mut step = Some(first.clone());
    while let Some(current) = step {
      let next = current.pipeline().step(current.index() + 1);
      current.success(|_ctx: &mut BenchCtx| Ok(())).complete(|_ctx: &mut BenchCtx| Ok(()));
      step = next;
    }
    first
      .pipeline()
      .before(|ctx: &mut BenchCtx| {
        black_box(ctx.is_first());
        Ok(())
      })
      .after(|_ctx: &mut BenchCtx| Ok(()));

    group.throughput(Throughput::Elements(num_steps as u64));
    group.bench_with_input(BenchmarkId::from_parameter(num_steps), &num_steps, |b, _| {
      b.iter(|| black_box(first.start().unwrap()))
    });
  }
  group.finish();
}

fn bench_skipping(c: &mut Criterion) {
  let mut group = c.benchmark_group("Skipping");

  for num_steps in [10usize, 50] {
    let first = Pipeline::<u64, StepflowError>::new(|ctx: &mut BenchCtx| {
      ctx.skip_all();
      Ok(())
    });
    for _ in 1..num_steps {
      first.then(increment_action(1));
    }
    group.bench_with_input(BenchmarkId::new("skip_all", num_steps), &num_steps, |b, _| {
      b.iter(|| black_box(first.start().unwrap()))
    });

    let first = Pipeline::<u64, StepflowError>::new(|ctx: &mut BenchCtx| {
      ctx.skip_while(|upcoming: &BenchCtx| upcoming.index() % 2 == 1);
      Ok(())
    });
    for _ in 1..num_steps {
      first.then(increment_action(1));
    }
    group.bench_with_input(BenchmarkId::new("skip_while", num_steps), &num_steps, |b, _| {
      b.iter(|| black_box(first.start().unwrap()))
    });
  }
  group.finish();
}

fn bench_error_containment(c: &mut Criterion) {
  let mut group = c.benchmark_group("ErrorContainment");

  let failing = || |_ctx: &mut BenchCtx| -> Result<(), StepflowError> { Err(StepflowError::msg("bench failure")) };

  for num_steps in [1usize, 10] {
    let first = Pipeline::<u64, StepflowError>::new(failing()).error(|_ctx: &mut BenchCtx| Ok(()));
    for _ in 1..num_steps {
      first.then(failing()).error(|_ctx: &mut BenchCtx| Ok(()));
    }
    group.bench_with_input(BenchmarkId::new("error_hook", num_steps), &num_steps, |b, _| {
      b.iter(|| black_box(first.start().unwrap()))
    });

    let first = Pipeline::<u64, StepflowError>::new(failing()).ignore_errors();
    for _ in 1..num_steps {
      first.then(failing()).ignore_errors();
    }
    group.bench_with_input(BenchmarkId::new("ignore_errors", num_steps), &num_steps, |b, _| {
      b.iter(|| black_box(first.start().unwrap()))
    });
  }
  group.finish();
}

fn bench_shared_object_access(c: &mut Criterion) {
  let mut group = c.benchmark_group("SharedObjectAccess");
  let object = SharedObject::<u64>::new();
  object.set("counter", 0);

  group.bench_function("get", |b| b.iter(|| black_box(object.get("counter"))));

  group.bench_function("set_without_observers", |b| {
    let mut n = 0u64;
    b.iter(|| {
      n += 1;
      black_box(object.set("counter", n))
    })
  });

  let observed = SharedObject::<u64>::new();
  observed.subscribe(|key, value| {
    black_box((key.len(), value.copied()));
  });
  group.bench_function("set_with_observer", |b| {
    let mut n = 0u64;
    b.iter(|| {
      n += 1;
      black_box(observed.set("counter", n))
    })
  });
  group.finish();
}

criterion_group!(
  benches,
  bench_plain_pipeline,
  bench_all_hooks,
  bench_skipping,
  bench_error_containment,
  bench_shared_object_access
);
criterion_main!(benches);
