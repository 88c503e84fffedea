//! Optimistic writes against cached entities.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::key::{CacheKey, QueryKey};
use super::store::QueryStore;
use crate::error::FetchError;

type ValueOf<M> = <<M as OptimisticUpdate>::Key as QueryKey>::Value;

/// A single write that is applied to the cache before the server confirms it.
pub trait OptimisticUpdate: Send + 'static {
  type Key: QueryKey + Send + Sync;

  /// Entry being written.
  fn key(&self) -> &Self::Key;

  /// Speculative value readers observe while the request is pending.
  fn apply(&self, current: &ValueOf<Self>) -> ValueOf<Self>;

  /// The real request. Resolves to the server's copy of the entity.
  fn send(&self) -> BoxFuture<'static, Result<ValueOf<Self>, FetchError>>;

  /// Entries derived from this entity that must refetch once the write commits.
  fn dependents(&self) -> Vec<CacheKey> {
    Vec::new()
  }

  /// Background refetch started after commit to pick up server-side effects.
  fn reconcile(&self) -> Option<BoxFuture<'static, Result<ValueOf<Self>, FetchError>>> {
    None
  }
}

/// Outcome of the latest mutation issued against a key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationState {
  #[default]
  Idle,
  Pending,
  Committed,
  RolledBack(FetchError),
}

impl MutationState {
  pub fn is_pending(&self) -> bool {
    matches!(self, MutationState::Pending)
  }
}

#[derive(Default)]
struct Registry {
  /// One guard per key with a mutation pending or queued behind one
  guards: HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>,
  states: HashMap<CacheKey, MutationState>,
}

/// Runs optimistic mutations against a [`QueryStore`].
///
/// Mutations on the same key are serialized: a second one waits until the
/// first has committed or rolled back, so rollbacks never interleave.
#[derive(Clone)]
pub struct MutationCoordinator {
  store: QueryStore,
  registry: Arc<Mutex<Registry>>,
}

impl MutationCoordinator {
  pub fn new(store: QueryStore) -> Self {
    Self {
      store,
      registry: Arc::new(Mutex::new(Registry::default())),
    }
  }

  /// State of the latest mutation against `key`.
  pub fn state(&self, key: &CacheKey) -> MutationState {
    self
      .registry
      .lock()
      .states
      .get(key)
      .cloned()
      .unwrap_or_default()
  }

  /// Forget a settled outcome, e.g. when the user dismisses an error.
  pub fn reset(&self, key: &CacheKey) {
    let mut registry = self.registry.lock();
    if !matches!(registry.states.get(key), Some(MutationState::Pending)) {
      registry.states.remove(key);
    }
  }

  /// Apply `mutation` optimistically, send it, then commit or roll back.
  ///
  /// On success the dependents are invalidated and the optimistic value keeps
  /// serving reads while a reconciling refetch runs in the background. On
  /// failure the pre-mutation value is restored (or the entry removed if there
  /// was none) and the error is returned. Nothing is retried.
  pub async fn mutate<M: OptimisticUpdate>(&self, mutation: M) -> Result<ValueOf<M>, FetchError> {
    let key = mutation.key().cache_key();
    let guard = self.guard_for(&key);
    let permit = guard.lock().await;
    self.set_state(&key, MutationState::Pending);

    self.store.cancel_in_flight(&key);
    let snapshot = self.store.value(mutation.key());
    match &snapshot {
      Some(current) => self.store.set(mutation.key(), mutation.apply(current)),
      None => debug!(key = %key, "nothing cached, skipping optimistic write"),
    }

    let request = mutation.send();
    let result = request.await;
    match &result {
      Ok(_) => {
        for dependent in mutation.dependents() {
          self.store.invalidate(&dependent);
        }
        if let Some(refetch) = mutation.reconcile() {
          drop(self.store.revalidate(mutation.key(), move || refetch));
        }
        info!(key = %key, "mutation committed");
        self.set_state(&key, MutationState::Committed);
      }
      Err(error) => {
        match snapshot {
          Some(previous) => self.store.set(mutation.key(), previous),
          None => {
            self.store.remove(&key);
          }
        }
        warn!(key = %key, error = %error, "mutation rolled back");
        self.set_state(&key, MutationState::RolledBack(error.clone()));
      }
    }

    drop(permit);
    self.release_guard(&key, guard);
    result
  }

  fn guard_for(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
    let mut registry = self.registry.lock();
    Arc::clone(registry.guards.entry(key.clone()).or_default())
  }

  fn release_guard(&self, key: &CacheKey, guard: Arc<tokio::sync::Mutex<()>>) {
    let mut registry = self.registry.lock();
    // Only the registry and this call still hold it: nobody is queued.
    if Arc::strong_count(&guard) <= 2 {
      registry.guards.remove(key);
    }
  }

  fn set_state(&self, key: &CacheKey, state: MutationState) {
    self.registry.lock().states.insert(key.clone(), state);
  }
}
