// stepflow/src/core/shared.rs

//! Pipeline-wide payload slots shared by every step: an observable
//! string-keyed object and an observable append-only collection.
//!
//! Both are cheap-to-clone handles around `Arc<parking_lot::RwLock<_>>`.
//! Lock guards returned from `read()` must be dropped before mutating the same
//! sink again, otherwise the calling thread deadlocks.

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::collections::HashMap;
use std::sync::Arc;

/// Observer for `SharedObject` mutations. Receives the key and the new value
/// (`None` when the key was removed).
pub type PropertyObserver<T> = Arc<dyn Fn(&str, Option<&T>) + Send + Sync + 'static>;

/// Observer for `SharedCollection` appends. Receives the index and the item.
pub type ItemObserver<T> = Arc<dyn Fn(usize, &T) + Send + Sync + 'static>;

struct ObjectState<T> {
  properties: HashMap<String, T>,
  observers: Vec<PropertyObserver<T>>,
}

/// A mutable bag of named values owned by a pipeline.
pub struct SharedObject<T>(Arc<RwLock<ObjectState<T>>>);

impl<T: Send + Sync + 'static> SharedObject<T> {
  pub fn new() -> Self {
    SharedObject(Arc::new(RwLock::new(ObjectState {
      properties: HashMap::new(),
      observers: Vec::new(),
    })))
  }

  /// Sets `key` to `value`, returning the previous value. Observers are
  /// notified after the lock is released.
  pub fn set<K: Into<String>>(&self, key: K, value: T) -> Option<T>
  where
    T: Clone,
  {
    let key = key.into();
    let (previous, observers) = {
      let mut guard = self.0.write();
      let previous = guard.properties.insert(key.clone(), value.clone());
      (previous, guard.observers.clone())
    };
    for observer in &observers {
      observer(&key, Some(&value));
    }
    previous
  }

  pub fn get(&self, key: &str) -> Option<T>
  where
    T: Clone,
  {
    self.0.read().properties.get(key).cloned()
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.0.read().properties.contains_key(key)
  }

  pub fn remove(&self, key: &str) -> Option<T> {
    let (removed, observers) = {
      let mut guard = self.0.write();
      let removed = guard.properties.remove(key);
      (removed, guard.observers.clone())
    };
    if removed.is_some() {
      for observer in &observers {
        observer(key, None);
      }
    }
    removed
  }

  /// Keys currently set, in no particular order.
  pub fn keys(&self) -> Vec<String> {
    self.0.read().properties.keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.0.read().properties.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.read().properties.is_empty()
  }

  /// Registers an observer invoked after every `set` and every effective `remove`.
  pub fn subscribe(&self, observer: impl Fn(&str, Option<&T>) + Send + Sync + 'static) {
    self.0.write().observers.push(Arc::new(observer));
  }

  /// Read access to the whole map. The guard MUST be dropped before calling
  /// any mutating method on this object.
  pub fn read(&self) -> MappedRwLockReadGuard<'_, HashMap<String, T>> {
    RwLockReadGuard::map(self.0.read(), |state| &state.properties)
  }
}

impl<T> Clone for SharedObject<T> {
  fn clone(&self) -> Self {
    SharedObject(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static> Default for SharedObject<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for SharedObject<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let guard = self.0.read();
    f.debug_struct("SharedObject")
      .field("len", &guard.properties.len())
      .field("observers", &guard.observers.len())
      .finish()
  }
}

struct CollectionState<T> {
  items: Vec<T>,
  observers: Vec<ItemObserver<T>>,
}

/// An append-only sequence owned by a pipeline. Hosts can subscribe to appends
/// to mirror the collection elsewhere (e.g. a UI list).
pub struct SharedCollection<T>(Arc<RwLock<CollectionState<T>>>);

impl<T: Send + Sync + 'static> SharedCollection<T> {
  pub fn new() -> Self {
    SharedCollection(Arc::new(RwLock::new(CollectionState {
      items: Vec::new(),
      observers: Vec::new(),
    })))
  }

  /// Appends `item` and returns its index.
  pub fn push(&self, item: T) -> usize
  where
    T: Clone,
  {
    let (index, observers) = {
      let mut guard = self.0.write();
      guard.items.push(item.clone());
      (guard.items.len() - 1, guard.observers.clone())
    };
    for observer in &observers {
      observer(index, &item);
    }
    index
  }

  pub fn extend<I: IntoIterator<Item = T>>(&self, items: I)
  where
    T: Clone,
  {
    for item in items {
      self.push(item);
    }
  }

  pub fn get(&self, index: usize) -> Option<T>
  where
    T: Clone,
  {
    self.0.read().items.get(index).cloned()
  }

  pub fn len(&self) -> usize {
    self.0.read().items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.read().items.is_empty()
  }

  /// Copies the current items out.
  pub fn snapshot(&self) -> Vec<T>
  where
    T: Clone,
  {
    self.0.read().items.clone()
  }

  /// Registers an observer invoked after every append.
  pub fn subscribe(&self, observer: impl Fn(usize, &T) + Send + Sync + 'static) {
    self.0.write().observers.push(Arc::new(observer));
  }

  /// Read access to the items. The guard MUST be dropped before pushing.
  pub fn read(&self) -> MappedRwLockReadGuard<'_, [T]> {
    RwLockReadGuard::map(self.0.read(), |state| state.items.as_slice())
  }
}

impl<T> Clone for SharedCollection<T> {
  fn clone(&self) -> Self {
    SharedCollection(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static> Default for SharedCollection<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for SharedCollection<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let guard = self.0.read();
    f.debug_struct("SharedCollection")
      .field("len", &guard.items.len())
      .field("observers", &guard.observers.len())
      .finish()
  }
}
