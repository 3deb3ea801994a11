// tests/context_management_tests.rs
mod common;

use common::*;
use parking_lot::Mutex;
use serial_test::serial;
use std::collections::HashMap;
use std::sync::{atomic::Ordering, Arc};
use stepflow::{Pipeline, SharedCollection, SharedObject};

#[test]
fn test_shared_object_is_visible_to_every_step() {
  setup_tracing();
  let result = Pipeline::<i64, TestError>::new(|ctx: &mut Ctx| {
    ctx.object().set("counter", 10);
    Ok(())
  })
  .then(|ctx: &mut Ctx| {
    let counter = ctx.object().get("counter").unwrap_or_default();
    assert_eq!(counter, 10);
    ctx.object().set("counter", counter + 5);
    Ok(())
  })
  .then(|ctx: &mut Ctx| {
    let counter = ctx.object().get("counter");
    *ctx.result_mut() = counter;
    Ok(())
  })
  .start()
  .unwrap();

  assert_eq!(result, Some(15));
}

#[test]
fn test_shared_state_outlives_runs_and_is_reachable_from_handles() {
  setup_tracing();
  let first = Pipeline::<i64, TestError>::new(|ctx: &mut Ctx| {
    let index = ctx.items().push(ctx.index() as i64);
    ctx.set_result(index as i64);
    Ok(())
  });

  assert_eq!(first.start().unwrap(), Some(0));
  // The collection is not reset between runs.
  assert_eq!(first.start().unwrap(), Some(1));
  assert_eq!(first.items().snapshot(), vec![0, 0]);
  assert_eq!(first.pipeline().items().len(), 2);
}

#[test]
fn test_clones_share_the_same_storage() {
  setup_tracing();
  let object = SharedObject::<i64>::new();
  let alias = object.clone();
  assert!(alias.is_empty());

  assert_eq!(object.set("a", 1), None);
  assert_eq!(alias.set("a", 2), Some(1));
  assert_eq!(object.get("a"), Some(2));
  assert!(object.contains_key("a"));
  assert_eq!(alias.remove("a"), Some(2));
  assert_eq!(object.len(), 0);

  let items = SharedCollection::<i64>::default();
  let alias = items.clone();
  items.extend([1, 2, 3]);
  assert_eq!(alias.get(2), Some(3));
  assert_eq!(alias.get(3), None);
  assert_eq!(alias.len(), 3);
}

#[test]
fn test_read_guards_expose_the_whole_payload() {
  setup_tracing();
  let object = SharedObject::<i64>::new();
  object.set("x", 1);
  object.set("y", 2);
  {
    let map = object.read();
    let total: i64 = map.values().sum();
    assert_eq!(total, 3);
  } // guard dropped before the next mutation
  object.set("z", 3);

  let mut keys = object.keys();
  keys.sort();
  assert_eq!(keys, vec!["x", "y", "z"]);

  let items = SharedCollection::<i64>::new();
  items.extend([4, 5]);
  assert_eq!(&*items.read(), &[4, 5]);
}

#[test]
#[serial]
fn test_object_observers_mirror_every_change() {
  setup_tracing();
  reset_counters();
  let mirror: Arc<Mutex<HashMap<String, i64>>> = Arc::new(Mutex::new(HashMap::new()));

  let first = Pipeline::<i64, TestError>::new(|ctx: &mut Ctx| {
    ctx.object().set("rows", 10);
    ctx.object().set("errors", 1);
    Ok(())
  });
  first.then(|ctx: &mut Ctx| {
    ctx.object().remove("errors");
    // Removing a missing key notifies nobody.
    ctx.object().remove("missing");
    ctx.object().set("rows", 12);
    Ok(())
  });

  let sink = mirror.clone();
  let counter = OBSERVER_CALLS.clone();
  first.object().subscribe(move |key, value| {
    counter.fetch_add(1, Ordering::SeqCst);
    let mut sink = sink.lock();
    match value {
      Some(value) => sink.insert(key.to_string(), *value),
      None => sink.remove(key),
    };
  });

  first.start().unwrap();

  assert_eq!(OBSERVER_CALLS.load(Ordering::SeqCst), 4);
  let mirror = mirror.lock().clone();
  assert_eq!(mirror, first.object().read().clone());
  assert_eq!(mirror.get("rows"), Some(&12));
}

#[test]
#[serial]
fn test_collection_observers_see_appends_in_order() {
  setup_tracing();
  reset_counters();
  let appended = Arc::new(Mutex::new(Vec::new()));

  let first = Pipeline::<i64, TestError>::new(|ctx: &mut Ctx| {
    ctx.items().push(100);
    Ok(())
  });
  first.then(|ctx: &mut Ctx| {
    ctx.items().extend([200, 300]);
    Ok(())
  });

  let seen = appended.clone();
  let counter = OBSERVER_CALLS.clone();
  first.items().subscribe(move |index, item| {
    counter.fetch_add(1, Ordering::SeqCst);
    seen.lock().push((index, *item));
  });

  first.start().unwrap();
  assert_eq!(OBSERVER_CALLS.load(Ordering::SeqCst), 3);
  assert_eq!(*appended.lock(), vec![(0, 100), (1, 200), (2, 300)]);
}

#[test]
fn test_observer_may_read_the_object_it_watches() {
  setup_tracing();
  let object = SharedObject::<i64>::new();
  let watched = object.clone();
  let sizes = Arc::new(Mutex::new(Vec::new()));
  let seen = sizes.clone();
  // Observers run after the write lock is released.
  object.subscribe(move |_key, _value| {
    seen.lock().push(watched.len());
  });

  object.set("a", 1);
  object.set("b", 2);
  assert_eq!(*sizes.lock(), vec![1, 2]);
}

#[test]
fn test_json_values_in_shared_sinks() {
  setup_tracing();
  let first = stepflow::new_pipeline(|ctx: &mut stepflow::ExecutionContext<serde_json::Value, stepflow::StepflowError>| {
    ctx.object().set("user", serde_json::json!({ "name": "ada", "visits": 3 }));
    ctx.items().push(serde_json::json!("first"));
    Ok(())
  });
  first.start().unwrap();

  let user = first.object().get("user").unwrap_or_default();
  assert_eq!(user["name"], "ada");
  assert_eq!(first.items().get(0), Some(serde_json::json!("first")));
}
