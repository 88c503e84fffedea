//! Per-view observation of a cached resource.
//!
//! A `Query<K>` does not own its data. Each tick it reads the entry's
//! snapshot from the shared store and, when the entry needs it, starts a
//! background load through the client. Every view looking at the same key
//! sees the same value, including optimistic writes made elsewhere.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::new(PartKey(id), client.clone());
//!
//! // In event loop tick
//! if query.poll() {
//!     // Snapshot changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(part) => render_part(part),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use std::fmt;
use tokio::time::Instant;

use crate::cache::{FetchStatus, Snapshot};
use crate::error::FetchError;
use crate::parts::{CachedPartsClient, HttpPartsApi, PartsApi, Resource};

/// What a view should render for a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
  /// Nothing requested yet
  Idle,
  /// First load in progress
  Loading,
  /// A value is available; it may be refreshing in the background
  Success(T),
  /// Load failed and there is no value to fall back on
  Error(FetchError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }
}

/// Observer of one cache entry.
pub struct Query<K: Resource, A: PartsApi = HttpPartsApi> {
  key: K,
  client: CachedPartsClient<A>,
  state: QueryState<K::Value>,
  /// Error of the latest load, even when an older value is still shown
  last_error: Option<FetchError>,
  refreshing: bool,
  /// Status and timestamp of the snapshot `state` was built from
  seen: Option<(FetchStatus, Option<Instant>, bool)>,
  started: bool,
}

impl<K: Resource, A: PartsApi> Query<K, A> {
  /// Create the observer and start loading if the entry is not fresh.
  pub fn new(key: K, client: CachedPartsClient<A>) -> Self {
    let mut query = Self {
      key,
      client,
      state: QueryState::Idle,
      last_error: None,
      refreshing: false,
      seen: None,
      started: false,
    };
    query.poll();
    query
  }

  pub fn state(&self) -> &QueryState<K::Value> {
    &self.state
  }

  pub fn data(&self) -> Option<&K::Value> {
    self.state.data()
  }

  /// No value yet and a load is running.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// A value is shown while a newer one is being fetched.
  pub fn is_refreshing(&self) -> bool {
    self.refreshing
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn last_error(&self) -> Option<&FetchError> {
    self.last_error.as_ref()
  }

  /// Invalidate the entry and load it again.
  pub fn refetch(&mut self) {
    self.client.refetch(&self.key);
    self.poll();
  }

  /// Sync with the store, starting a load if the entry needs one.
  ///
  /// Returns `true` if what the view should render changed. Call this in
  /// your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let stale_after = K::stale_after(self.client.policy());
    let mut snapshot = self.client.store().peek(&self.key, stale_after);

    if self.needs_load(&snapshot) {
      self.client.load_in_background(&self.key);
      snapshot = self.client.store().peek(&self.key, stale_after);
    }
    self.started = true;

    let seen = Some((snapshot.status, snapshot.fetched_at, snapshot.invalidated));
    if seen == self.seen {
      return false;
    }
    self.seen = seen;
    self.apply(snapshot);
    true
  }

  /// Load on first sight unless fresh; afterwards only when the entry was
  /// dropped or invalidated. A failed entry waits for an explicit refetch.
  fn needs_load(&self, snapshot: &Snapshot<K::Value>) -> bool {
    if snapshot.is_loading() {
      return false;
    }
    if !self.started {
      return snapshot.stale;
    }
    match snapshot.status {
      FetchStatus::Idle => true,
      FetchStatus::Success => snapshot.invalidated,
      FetchStatus::Loading | FetchStatus::Error => false,
    }
  }

  fn apply(&mut self, snapshot: Snapshot<K::Value>) {
    self.refreshing = snapshot.is_loading() && snapshot.value.is_some();
    self.last_error = snapshot.error.clone();
    self.state = match (snapshot.value, snapshot.status, snapshot.error) {
      (Some(value), _, _) => QueryState::Success(value),
      (None, FetchStatus::Loading, _) => QueryState::Loading,
      (None, _, Some(error)) => QueryState::Error(error),
      (None, _, None) => QueryState::Idle,
    };
  }
}

impl<K: Resource + fmt::Debug, A: PartsApi> fmt::Debug for Query<K, A>
where
  K::Value: fmt::Debug,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("refreshing", &self.refreshing)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::QueryStore;
  use crate::config::CacheConfig;
  use crate::parts::fake::FakeApi;
  use crate::parts::types::{PartStatus, PartUpdate};
  use crate::parts::{AllowableStatusesKey, ChildrenKey, PartKey};

  fn client(api: &FakeApi) -> CachedPartsClient<FakeApi> {
    CachedPartsClient::new(api.clone(), QueryStore::new(), CacheConfig::default())
  }

  async fn settle() {
    for _ in 0..10 {
      tokio::task::yield_now().await;
    }
  }

  #[tokio::test]
  async fn test_query_loads_on_creation() {
    let api = FakeApi::default().with_part("p-1", PartStatus::Active);
    let mut query = Query::new(PartKey("p-1".into()), client(&api));
    assert!(query.is_loading());

    settle().await;
    assert!(query.poll());
    assert_eq!(query.data().map(|p| p.status), Some(PartStatus::Active));
    assert!(!query.poll());
    assert_eq!(api.calls("part p-1"), 1);
  }

  #[tokio::test]
  async fn test_fresh_entry_is_not_refetched() {
    let api = FakeApi::default().with_part("p-1", PartStatus::Active);
    let client = client(&api);
    client.part("p-1").await.unwrap();

    let query = Query::new(PartKey("p-1".into()), client);
    assert!(query.data().is_some());
    settle().await;
    assert_eq!(api.calls("part p-1"), 1);
  }

  #[tokio::test]
  async fn test_error_waits_for_explicit_refetch() {
    let api = FakeApi::default().with_part("p-1", PartStatus::Active);
    api.break_part("p-1");
    let mut query = Query::new(PartKey("p-1".into()), client(&api));

    settle().await;
    query.poll();
    assert!(query.is_error());
    query.poll();
    settle().await;
    query.poll();
    assert_eq!(api.calls("part p-1"), 1);

    api.repair_part("p-1");
    query.refetch();
    settle().await;
    query.poll();
    assert_eq!(query.data().map(|p| p.status), Some(PartStatus::Active));
    assert!(query.last_error().is_none());
  }

  #[tokio::test]
  async fn test_observes_writes_from_elsewhere() {
    let api = FakeApi::default().with_part("p-2", PartStatus::Draft);
    let client = client(&api);
    let mut query = Query::new(PartKey("p-2".into()), client.clone());
    settle().await;
    query.poll();

    client
      .update_part("p-2", PartUpdate::status(PartStatus::Active))
      .await
      .unwrap();
    assert!(query.poll());
    assert_eq!(query.data().map(|p| p.status), Some(PartStatus::Active));
  }

  #[tokio::test]
  async fn test_invalidated_entry_reloads_on_poll() {
    let api = FakeApi::default().with_part("p-1", PartStatus::Configuration);
    let client = client(&api);
    let mut allowed = Query::new(AllowableStatusesKey("p-1".into()), client.clone());
    settle().await;
    allowed.poll();
    assert_eq!(api.calls("allowable p-1"), 1);

    client
      .update_part("p-1", PartUpdate::status(PartStatus::Recalled))
      .await
      .unwrap();
    allowed.poll();
    settle().await;
    allowed.poll();

    assert_eq!(api.calls("allowable p-1"), 2);
    assert_eq!(
      allowed.data().map(|a| a.allowable_statuses.clone()),
      Some(vec![PartStatus::Configuration, PartStatus::Active])
    );
  }

  #[tokio::test]
  async fn test_children_query_warms_parts() {
    let api = FakeApi::default()
      .with_part("p-1", PartStatus::Active)
      .with_children(None, &["p-1"]);
    let client = client(&api);
    let mut machines = Query::new(ChildrenKey::root(), client.clone());
    settle().await;
    machines.poll();

    assert_eq!(machines.data().map(Vec::len), Some(1));
    assert!(client.store().value(&PartKey("p-1".into())).is_some());
  }
}
