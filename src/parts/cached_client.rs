//! Parts client that reads and writes through the shared query store.

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::cache::{
  CacheKey, MutationCoordinator, MutationState, OptimisticUpdate, PrefetchHandle, PrefetchPlanner,
  QueryKey, QueryStore,
};
use crate::config::CacheConfig;
use crate::error::FetchError;

use super::client::{HttpPartsApi, PartsApi};
use super::keys::{AllowableStatusesKey, ChildrenKey, PartKey};
use super::types::{AllowableStatuses, ConfigWithPart, Configuration, Part, PartUpdate};

/// Configuration service client with transparent caching.
///
/// Exposes the same reads as [`PartsApi`], but every result goes through the
/// store: concurrent reads share one request, fresh entries are served from
/// memory, and child lists warm the parts they reference.
#[derive(Clone)]
pub struct CachedPartsClient<A: PartsApi = HttpPartsApi> {
  api: A,
  store: QueryStore,
  planner: PrefetchPlanner,
  mutations: MutationCoordinator,
  policy: CacheConfig,
}

impl<A: PartsApi> CachedPartsClient<A> {
  pub fn new(api: A, store: QueryStore, policy: CacheConfig) -> Self {
    Self {
      api,
      planner: PrefetchPlanner::new(store.clone()),
      mutations: MutationCoordinator::new(store.clone()),
      store,
      policy,
    }
  }

  pub fn store(&self) -> &QueryStore {
    &self.store
  }

  pub fn policy(&self) -> &CacheConfig {
    &self.policy
  }

  /// Children of `parent` (machines for `None`).
  ///
  /// Resolves as soon as the list is known; the parts it references are
  /// prefetched in the background. Like every read here, the store lookup
  /// happens on the call itself.
  pub fn children(
    &self,
    parent: Option<&str>,
  ) -> impl Future<Output = Result<Vec<Configuration>, FetchError>> + Send + 'static {
    let list = self.fetch_children(parent);
    let client = self.clone();
    async move {
      let children = list.await?;
      drop(client.warm_parts(&children));
      Ok(children)
    }
  }

  /// Children of `parent`, each paired with its part once the prefetches settle.
  ///
  /// A part that fails to load leaves its row with `resolved: None`; the list
  /// itself still succeeds.
  pub fn children_with_parts(
    &self,
    parent: Option<&str>,
  ) -> impl Future<Output = Result<Vec<ConfigWithPart>, FetchError>> + Send + 'static {
    let list = self.fetch_children(parent);
    let client = self.clone();
    async move {
      let children = list.await?;
      let warmed = client.warm_parts(&children);
      Ok(PrefetchPlanner::join(children, warmed).await)
    }
  }

  pub fn part(&self, id: &str) -> impl Future<Output = Result<Part, FetchError>> + Send + 'static {
    let api = self.api.clone();
    let id = id.to_string();
    let key = PartKey(id.clone());
    self.store.get_or_fetch(
      &key,
      move || async move { api.get_part(&id).await },
      self.policy.parts_stale_after,
    )
  }

  pub fn allowable_statuses(
    &self,
    id: &str,
  ) -> impl Future<Output = Result<AllowableStatuses, FetchError>> + Send + 'static {
    let api = self.api.clone();
    let id = id.to_string();
    let key = AllowableStatusesKey(id.clone());
    self.store.get_or_fetch(
      &key,
      move || async move { api.get_allowable_statuses(&id).await },
      self.policy.allowable_statuses_stale_after,
    )
  }

  /// Start loading a part without waiting for it.
  pub fn prefetch_part(&self, id: &str) -> PrefetchHandle<Part> {
    let api = self.api.clone();
    let id = id.to_string();
    let key = PartKey(id.clone());
    self.store.prefetch(
      &key,
      move || async move { api.get_part(&id).await },
      self.policy.parts_stale_after,
    )
  }

  /// Update a part optimistically.
  ///
  /// The cached part shows the update immediately. On success the part's
  /// allowable statuses are invalidated and the part is refetched in the
  /// background; on failure the cached part is restored and the error returned.
  pub async fn update_part(&self, id: &str, update: PartUpdate) -> Result<Part, FetchError> {
    let mutation = PartUpdateMutation {
      key: PartKey(id.to_string()),
      update,
      api: self.api.clone(),
    };
    self.mutations.mutate(mutation).await
  }

  /// State of the latest update issued for part `id`.
  pub fn mutation_state(&self, id: &str) -> MutationState {
    self.mutations.state(&PartKey(id.to_string()).cache_key())
  }

  pub fn reset_mutation(&self, id: &str) {
    self.mutations.reset(&PartKey(id.to_string()).cache_key());
  }

  /// Mark `key` stale and start refetching it.
  pub fn refetch<K: Resource>(&self, key: &K) {
    self.store.invalidate(&key.cache_key());
    self.load_in_background(key);
  }

  /// Read `key` through the store on a background task.
  ///
  /// The entry is `Loading` (or fresh) by the time this returns.
  pub fn load_in_background<K: Resource>(&self, key: &K) {
    let load = key.load(self);
    let description = key.description();
    tokio::spawn(async move {
      if let Err(error) = load.await {
        debug!(key = %description, error = %error, "background load failed");
      }
    });
  }

  fn fetch_children(
    &self,
    parent: Option<&str>,
  ) -> impl Future<Output = Result<Vec<Configuration>, FetchError>> + Send + 'static {
    let api = self.api.clone();
    let key = ChildrenKey {
      parent: parent.map(String::from),
    };
    let parent = key.parent.clone();
    self.store.get_or_fetch(
      &key,
      move || async move { api.list_children(parent.as_deref()).await },
      self.policy.children_stale_after,
    )
  }

  fn warm_parts(&self, children: &[Configuration]) -> Vec<(CacheKey, PrefetchHandle<Part>)> {
    let api = self.api.clone();
    self.planner.warm(
      children,
      move |key: &PartKey| {
        let api = api.clone();
        let id = key.0.clone();
        async move { api.get_part(&id).await }
      },
      self.policy.parts_stale_after,
    )
  }
}

/// A key the client knows how to load, so views can observe it generically.
pub trait Resource: QueryKey + Clone + Send + Sync + 'static {
  /// Freshness window for this kind of entry.
  fn stale_after(policy: &CacheConfig) -> Duration;

  /// Read the entry through the client's cache.
  fn load<A: PartsApi>(
    &self,
    client: &CachedPartsClient<A>,
  ) -> BoxFuture<'static, Result<Self::Value, FetchError>>;
}

impl Resource for ChildrenKey {
  fn stale_after(policy: &CacheConfig) -> Duration {
    policy.children_stale_after
  }

  fn load<A: PartsApi>(
    &self,
    client: &CachedPartsClient<A>,
  ) -> BoxFuture<'static, Result<Vec<Configuration>, FetchError>> {
    client.children(self.parent.as_deref()).boxed()
  }
}

impl Resource for PartKey {
  fn stale_after(policy: &CacheConfig) -> Duration {
    policy.parts_stale_after
  }

  fn load<A: PartsApi>(
    &self,
    client: &CachedPartsClient<A>,
  ) -> BoxFuture<'static, Result<Part, FetchError>> {
    client.part(&self.0).boxed()
  }
}

impl Resource for AllowableStatusesKey {
  fn stale_after(policy: &CacheConfig) -> Duration {
    policy.allowable_statuses_stale_after
  }

  fn load<A: PartsApi>(
    &self,
    client: &CachedPartsClient<A>,
  ) -> BoxFuture<'static, Result<AllowableStatuses, FetchError>> {
    client.allowable_statuses(&self.0).boxed()
  }
}

struct PartUpdateMutation<A> {
  key: PartKey,
  update: PartUpdate,
  api: A,
}

impl<A: PartsApi> OptimisticUpdate for PartUpdateMutation<A> {
  type Key = PartKey;

  fn key(&self) -> &PartKey {
    &self.key
  }

  fn apply(&self, current: &Part) -> Part {
    self.update.apply_to(current)
  }

  fn send(&self) -> BoxFuture<'static, Result<Part, FetchError>> {
    let api = self.api.clone();
    let id = self.key.0.clone();
    let update = self.update.clone();
    async move { api.update_part(&id, &update).await }.boxed()
  }

  fn dependents(&self) -> Vec<CacheKey> {
    vec![AllowableStatusesKey(self.key.0.clone()).cache_key()]
  }

  fn reconcile(&self) -> Option<BoxFuture<'static, Result<Part, FetchError>>> {
    let api = self.api.clone();
    let id = self.key.0.clone();
    Some(async move { api.get_part(&id).await }.boxed())
  }
}
