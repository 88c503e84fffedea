//! Keyed store of fetch results with in-flight deduplication.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::{CacheKey, QueryKey};
use crate::error::FetchError;

type ErasedValue = Arc<dyn Any + Send + Sync>;
type ErasedResult = Result<ErasedValue, FetchError>;

/// Pending fetch that late joiners attach to. One per key at most.
type InFlight = Shared<BoxFuture<'static, ErasedResult>>;

/// Fetch lifecycle of a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
  /// Never fetched, or its only fetch was cancelled before producing a value
  Idle,
  Loading,
  Success,
  /// Last fetch failed; any previous value is still readable
  Error,
}

/// Read-only view of an entry at one instant.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
  pub value: Option<T>,
  pub status: FetchStatus,
  pub error: Option<FetchError>,
  pub fetched_at: Option<Instant>,
  /// Marked stale by an explicit invalidation
  pub invalidated: bool,
  /// Not fresh under the stale policy the snapshot was taken with
  pub stale: bool,
}

impl<T> Snapshot<T> {
  fn missing() -> Self {
    Self {
      value: None,
      status: FetchStatus::Idle,
      error: None,
      fetched_at: None,
      invalidated: false,
      stale: true,
    }
  }

  pub fn is_loading(&self) -> bool {
    self.status == FetchStatus::Loading
  }
}

struct Slot {
  value: Option<ErasedValue>,
  status: FetchStatus,
  error: Option<FetchError>,
  fetched_at: Option<Instant>,
  invalidated: bool,
  /// Stamp of the last write or fetch start; completions carrying another stamp are dropped
  generation: u64,
  in_flight: Option<InFlight>,
}

impl Slot {
  fn new() -> Self {
    Self {
      value: None,
      status: FetchStatus::Idle,
      error: None,
      fetched_at: None,
      invalidated: false,
      generation: 0,
      in_flight: None,
    }
  }

  fn is_fresh(&self, now: Instant, stale_after: Duration) -> bool {
    self.value.is_some()
      && !self.invalidated
      && self
        .fetched_at
        .is_some_and(|at| now.saturating_duration_since(at) < stale_after)
  }

  /// Forget the in-flight fetch so its result is never written back.
  fn detach(&mut self, generation: u64) {
    self.in_flight = None;
    self.generation = generation;
    self.status = match (&self.value, &self.error) {
      (Some(_), _) => FetchStatus::Success,
      (None, Some(_)) => FetchStatus::Error,
      (None, None) => FetchStatus::Idle,
    };
  }
}

#[derive(Default)]
struct State {
  slots: HashMap<CacheKey, Slot>,
  /// Store-wide counter so a re-created slot never reuses an old stamp
  generation: u64,
}

impl State {
  fn next_generation(&mut self) -> u64 {
    self.generation += 1;
    self.generation
  }
}

enum Policy {
  StaleAfter(Duration),
  /// Fetch even if the entry is fresh
  Always,
}

enum Lookup<T> {
  Ready(T),
  Pending(InFlight),
}

/// Shared cache of query results.
///
/// Cloning is cheap and every clone addresses the same entries. The lock is
/// never held across an `.await`; fetches run outside it and write their
/// result back on completion.
#[derive(Clone, Default)]
pub struct QueryStore {
  inner: Arc<Mutex<State>>,
}

impl QueryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Return the cached value if fresh, otherwise fetch it.
  ///
  /// Concurrent callers for the same key share one fetch. A failed fetch is
  /// recorded on the entry and returned; the previous value stays readable
  /// through [`QueryStore::peek`].
  ///
  /// The lookup happens when this is called, not when the future is first
  /// polled: the entry is already `Loading` once this returns.
  pub fn get_or_fetch<K, F, Fut>(
    &self,
    key: &K,
    fetch: F,
    stale_after: Duration,
  ) -> impl Future<Output = Result<K::Value, FetchError>> + Send + 'static
  where
    K: QueryKey + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<K::Value, FetchError>> + Send + 'static,
  {
    let lookup = self.lookup(key, fetch, Policy::StaleAfter(stale_after));
    let mismatch = type_mismatch(key);
    async move {
      match lookup {
        Lookup::Ready(value) => Ok(value),
        Lookup::Pending(in_flight) => {
          let value = in_flight.await?;
          downcast(&value).ok_or(mismatch)
        }
      }
    }
  }

  /// Make sure the entry is fresh or being fetched, without waiting for it.
  ///
  /// The returned handle resolves to the value, or `None` if the fetch failed.
  /// Dropping it does not cancel the fetch.
  pub fn prefetch<K, F, Fut>(
    &self,
    key: &K,
    fetch: F,
    stale_after: Duration,
  ) -> PrefetchHandle<K::Value>
  where
    K: QueryKey,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<K::Value, FetchError>> + Send + 'static,
  {
    self.background(key, fetch, Policy::StaleAfter(stale_after))
  }

  /// Refetch in the background even if the entry is fresh.
  ///
  /// Readers keep getting the current value until the refetch lands.
  pub fn revalidate<K, F, Fut>(&self, key: &K, fetch: F) -> PrefetchHandle<K::Value>
  where
    K: QueryKey,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<K::Value, FetchError>> + Send + 'static,
  {
    self.background(key, fetch, Policy::Always)
  }

  /// Overwrite the entry with a successful value.
  ///
  /// Any fetch in flight for the key is detached first, so a late response
  /// cannot overwrite this write.
  pub fn set<K: QueryKey>(&self, key: &K, value: K::Value) {
    let cache_key = key.cache_key();
    let mut state = self.inner.lock();
    let generation = state.next_generation();
    let slot = state.slots.entry(cache_key.clone()).or_insert_with(Slot::new);
    if slot.in_flight.is_some() {
      debug!(key = %cache_key, "write supersedes in-flight fetch");
    }
    *slot = Slot {
      value: Some(Arc::new(value)),
      status: FetchStatus::Success,
      error: None,
      fetched_at: Some(Instant::now()),
      invalidated: false,
      generation,
      in_flight: None,
    };
  }

  /// Mark every entry selected by `prefix` stale so the next read refetches.
  ///
  /// Fetches already in flight for those entries started before the
  /// invalidation and are detached. Returns the number of entries marked.
  pub fn invalidate(&self, prefix: &CacheKey) -> usize {
    let mut state = self.inner.lock();
    let State { slots, generation } = &mut *state;
    let mut marked = 0;
    for (key, slot) in slots.iter_mut().filter(|(key, _)| prefix.matches(key)) {
      slot.invalidated = true;
      if slot.in_flight.is_some() {
        *generation += 1;
        slot.detach(*generation);
        debug!(key = %key, "invalidation detached in-flight fetch");
      }
      marked += 1;
    }
    debug!(prefix = %prefix, marked, "invalidated");
    marked
  }

  /// Detach the in-flight fetch for `key`, if any.
  ///
  /// Callers already awaiting it still receive its result, but the result is
  /// not written into the store.
  pub fn cancel_in_flight(&self, key: &CacheKey) -> bool {
    let mut state = self.inner.lock();
    let State { slots, generation } = &mut *state;
    match slots.get_mut(key) {
      Some(slot) if slot.in_flight.is_some() => {
        *generation += 1;
        slot.detach(*generation);
        debug!(key = %key, "cancelled in-flight fetch");
        true
      }
      _ => false,
    }
  }

  /// Drop the entry entirely.
  pub fn remove(&self, key: &CacheKey) -> bool {
    let removed = self.inner.lock().slots.remove(key).is_some();
    if removed {
      debug!(key = %key, "removed");
    }
    removed
  }

  /// Current value regardless of freshness.
  pub fn value<K: QueryKey>(&self, key: &K) -> Option<K::Value> {
    let state = self.inner.lock();
    state
      .slots
      .get(&key.cache_key())
      .and_then(|slot| slot.value.as_ref())
      .and_then(downcast)
  }

  /// Snapshot of the entry for display. Never triggers a fetch.
  pub fn peek<K: QueryKey>(&self, key: &K, stale_after: Duration) -> Snapshot<K::Value> {
    let state = self.inner.lock();
    let Some(slot) = state.slots.get(&key.cache_key()) else {
      return Snapshot::missing();
    };
    Snapshot {
      value: slot.value.as_ref().and_then(downcast),
      status: slot.status,
      error: slot.error.clone(),
      fetched_at: slot.fetched_at,
      invalidated: slot.invalidated,
      stale: !slot.is_fresh(Instant::now(), stale_after),
    }
  }

  fn background<K, F, Fut>(&self, key: &K, fetch: F, policy: Policy) -> PrefetchHandle<K::Value>
  where
    K: QueryKey,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<K::Value, FetchError>> + Send + 'static,
  {
    match self.lookup(key, fetch, policy) {
      Lookup::Ready(value) => PrefetchHandle::ready(value),
      Lookup::Pending(in_flight) => {
        let description = key.description();
        PrefetchHandle {
          inner: async move {
            match in_flight.await {
              Ok(value) => downcast(&value),
              Err(error) => {
                debug!(key = %description, error = %error, "prefetch left unresolved");
                None
              }
            }
          }
          .boxed(),
        }
      }
    }
  }

  /// Resolve a read against the entry: fresh hit, join, or start a new fetch.
  fn lookup<K, F, Fut>(&self, key: &K, fetch: F, policy: Policy) -> Lookup<K::Value>
  where
    K: QueryKey,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<K::Value, FetchError>> + Send + 'static,
  {
    let cache_key = key.cache_key();
    let mut state = self.inner.lock();

    if let Some(slot) = state.slots.get(&cache_key) {
      if let Policy::StaleAfter(stale_after) = policy {
        if slot.is_fresh(Instant::now(), stale_after) {
          if let Some(value) = slot.value.as_ref().and_then(downcast) {
            debug!(key = %cache_key, "cache hit");
            return Lookup::Ready(value);
          }
          warn!(key = %cache_key, "cached value has unexpected type, refetching");
        }
      }
      if let Some(in_flight) = &slot.in_flight {
        debug!(key = %cache_key, "joining in-flight fetch");
        return Lookup::Pending(in_flight.clone());
      }
    }

    let generation = state.next_generation();
    let in_flight = self.start(cache_key.clone(), generation, fetch);
    let slot = state.slots.entry(cache_key.clone()).or_insert_with(Slot::new);
    slot.generation = generation;
    slot.status = FetchStatus::Loading;
    slot.in_flight = Some(in_flight.clone());
    drop(state);

    debug!(key = %cache_key, generation, "fetch started");
    // Drive the fetch to completion even if every caller stops waiting.
    tokio::spawn(in_flight.clone());
    Lookup::Pending(in_flight)
  }

  fn start<T, F, Fut>(&self, key: CacheKey, generation: u64, fetch: F) -> InFlight
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    let store = Arc::downgrade(&self.inner);
    async move {
      let result: ErasedResult = fetch()
        .await
        .map(|value| Arc::new(value) as ErasedValue);
      if let Some(inner) = store.upgrade() {
        QueryStore { inner }.complete(&key, generation, &result);
      }
      result
    }
    .boxed()
    .shared()
  }

  fn complete(&self, key: &CacheKey, generation: u64, result: &ErasedResult) {
    let mut state = self.inner.lock();
    let slot = match state.slots.get_mut(key) {
      Some(slot) if slot.generation == generation => slot,
      _ => {
        debug!(key = %key, generation, "discarding result of cancelled fetch");
        return;
      }
    };

    slot.in_flight = None;
    match result {
      Ok(value) => {
        slot.value = Some(Arc::clone(value));
        slot.status = FetchStatus::Success;
        slot.error = None;
        slot.fetched_at = Some(Instant::now());
        slot.invalidated = false;
        debug!(key = %key, "fetch succeeded");
      }
      Err(error) => {
        slot.status = FetchStatus::Error;
        slot.error = Some(error.clone());
        warn!(key = %key, error = %error, "fetch failed");
      }
    }
  }
}

impl fmt::Debug for QueryStore {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryStore")
      .field("entries", &self.inner.lock().slots.len())
      .finish()
  }
}

/// Future returned by [`QueryStore::prefetch`].
pub struct PrefetchHandle<T> {
  inner: BoxFuture<'static, Option<T>>,
}

impl<T: Send + 'static> PrefetchHandle<T> {
  fn ready(value: T) -> Self {
    Self {
      inner: futures::future::ready(Some(value)).boxed(),
    }
  }
}

impl<T> Future for PrefetchHandle<T> {
  type Output = Option<T>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    self.get_mut().inner.poll_unpin(cx)
  }
}

fn downcast<T: Clone + 'static>(value: &ErasedValue) -> Option<T> {
  (**value).downcast_ref::<T>().cloned()
}

fn type_mismatch<K: QueryKey>(key: &K) -> FetchError {
  FetchError::Unknown(format!(
    "cached value for {} has an unexpected type",
    key.description()
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use tokio::sync::Notify;

  struct TestKey(&'static str);

  impl QueryKey for TestKey {
    type Value = u32;

    fn cache_key(&self) -> CacheKey {
      CacheKey::new("test").with(self.0)
    }

    fn description(&self) -> String {
      format!("test {}", self.0)
    }
  }

  const FIVE_MINUTES: Duration = Duration::from_secs(300);

  /// Fetch that counts its invocations and resolves to `value`.
  fn counted(
    calls: &Arc<AtomicUsize>,
    value: u32,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, FetchError>> + Send + 'static {
    let calls = Arc::clone(calls);
    move || {
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
      }
      .boxed()
    }
  }

  /// Like `counted`, but holds the response until `gate` is notified.
  fn gated(
    calls: &Arc<AtomicUsize>,
    gate: &Arc<Notify>,
    result: Result<u32, FetchError>,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, FetchError>> + Send + 'static {
    let calls = Arc::clone(calls);
    let gate = Arc::clone(gate);
    move || {
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        gate.notified().await;
        result
      }
      .boxed()
    }
  }

  async fn settle() {
    for _ in 0..5 {
      tokio::task::yield_now().await;
    }
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_fetch() {
    let store = QueryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let readers: Vec<_> = (0..8)
      .map(|_| {
        let store = store.clone();
        let fetch = gated(&calls, &gate, Ok(42));
        tokio::spawn(async move { store.get_or_fetch(&TestKey("a"), fetch, FIVE_MINUTES).await })
      })
      .collect();

    settle().await;
    gate.notify_one();

    for reader in readers {
      assert_eq!(reader.await.unwrap(), Ok(42));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fresh_entry_is_served_from_cache() {
    let store = QueryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let first = store
      .get_or_fetch(&TestKey("a"), counted(&calls, 1), FIVE_MINUTES)
      .await;
    let second = store
      .get_or_fetch(&TestKey("a"), counted(&calls, 2), FIVE_MINUTES)
      .await;

    assert_eq!(first, Ok(1));
    assert_eq!(second, Ok(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_read_is_registered_before_first_poll() {
    let store = QueryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let read = store.get_or_fetch(&TestKey("a"), counted(&calls, 3), FIVE_MINUTES);
    assert!(store.peek(&TestKey("a"), FIVE_MINUTES).is_loading());

    // A second read attaches instead of fetching again
    let again = store.get_or_fetch(&TestKey("a"), counted(&calls, 4), FIVE_MINUTES);
    assert_eq!(read.await, Ok(3));
    assert_eq!(again.await, Ok(3));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_entry_revalidates_once_and_stays_readable() {
    let store = QueryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    store
      .get_or_fetch(&TestKey("a"), counted(&calls, 1), FIVE_MINUTES)
      .await
      .unwrap();

    tokio::time::advance(FIVE_MINUTES).await;

    let gate = Arc::new(Notify::new());
    let first = {
      let store = store.clone();
      let fetch = gated(&calls, &gate, Ok(2));
      tokio::spawn(async move { store.get_or_fetch(&TestKey("a"), fetch, FIVE_MINUTES).await })
    };
    let second = {
      let store = store.clone();
      let fetch = gated(&calls, &gate, Ok(3));
      tokio::spawn(async move { store.get_or_fetch(&TestKey("a"), fetch, FIVE_MINUTES).await })
    };
    settle().await;

    let snapshot = store.peek(&TestKey("a"), FIVE_MINUTES);
    assert_eq!(snapshot.value, Some(1));
    assert_eq!(snapshot.status, FetchStatus::Loading);
    assert!(snapshot.stale);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), Ok(2));
    assert_eq!(second.await.unwrap(), Ok(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.value(&TestKey("a")), Some(2));
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_previous_value() {
    let store = QueryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    store
      .get_or_fetch(&TestKey("a"), counted(&calls, 1), FIVE_MINUTES)
      .await
      .unwrap();
    store.invalidate(&TestKey("a").cache_key());

    let result = store
      .get_or_fetch(
        &TestKey("a"),
        || async { Err::<u32, _>(FetchError::transport("reset")) },
        FIVE_MINUTES,
      )
      .await;

    assert_eq!(result, Err(FetchError::transport("reset")));
    let snapshot = store.peek(&TestKey("a"), FIVE_MINUTES);
    assert_eq!(snapshot.value, Some(1));
    assert_eq!(snapshot.status, FetchStatus::Error);
    assert!(snapshot.error.is_some());
  }

  #[tokio::test]
  async fn test_errored_entry_retries_on_next_read() {
    let store = QueryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let failed = store
      .get_or_fetch(
        &TestKey("a"),
        || async { Err::<u32, _>(FetchError::not_found("a")) },
        FIVE_MINUTES,
      )
      .await;
    assert!(failed.is_err());

    let retried = store
      .get_or_fetch(&TestKey("a"), counted(&calls, 5), FIVE_MINUTES)
      .await;
    assert_eq!(retried, Ok(5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_write_wins_over_late_fetch() {
    let store = QueryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let reader = {
      let store = store.clone();
      let fetch = gated(&calls, &gate, Ok(1));
      tokio::spawn(async move { store.get_or_fetch(&TestKey("a"), fetch, FIVE_MINUTES).await })
    };
    settle().await;

    assert!(store.cancel_in_flight(&TestKey("a").cache_key()));
    store.set(&TestKey("a"), 99);

    gate.notify_one();
    // The waiting reader still gets what its own fetch returned.
    assert_eq!(reader.await.unwrap(), Ok(1));
    settle().await;
    assert_eq!(store.value(&TestKey("a")), Some(99));
    assert_eq!(
      store.peek(&TestKey("a"), FIVE_MINUTES).status,
      FetchStatus::Success
    );
  }

  #[tokio::test]
  async fn test_set_alone_discards_in_flight_result() {
    let store = QueryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let handle = store.prefetch(&TestKey("a"), gated(&calls, &gate, Ok(1)), FIVE_MINUTES);
    settle().await;
    store.set(&TestKey("a"), 7);
    gate.notify_one();

    assert_eq!(handle.await, Some(1));
    settle().await;
    assert_eq!(store.value(&TestKey("a")), Some(7));
  }

  #[tokio::test]
  async fn test_invalidate_by_prefix() {
    let store = QueryStore::new();
    store.set(&TestKey("a"), 1);
    store.set(&TestKey("b"), 2);

    let marked = store.invalidate(&CacheKey::new("test"));
    assert_eq!(marked, 2);

    let snapshot = store.peek(&TestKey("a"), FIVE_MINUTES);
    assert!(snapshot.invalidated);
    assert!(snapshot.stale);
    assert_eq!(snapshot.value, Some(1));

    let calls = Arc::new(AtomicUsize::new(0));
    let refetched = store
      .get_or_fetch(&TestKey("b"), counted(&calls, 20), FIVE_MINUTES)
      .await;
    assert_eq!(refetched, Ok(20));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!store.peek(&TestKey("b"), FIVE_MINUTES).invalidated);
  }

  #[tokio::test]
  async fn test_prefetch_failure_is_swallowed() {
    let store = QueryStore::new();
    let handle = store.prefetch(
      &TestKey("a"),
      || async { Err::<u32, _>(FetchError::Server { status: 500, message: String::new() }) },
      FIVE_MINUTES,
    );

    assert_eq!(handle.await, None);
    let snapshot = store.peek(&TestKey("a"), FIVE_MINUTES);
    assert_eq!(snapshot.status, FetchStatus::Error);
    assert_eq!(snapshot.value, None);
  }

  #[tokio::test]
  async fn test_dropped_prefetch_still_lands() {
    let store = QueryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    drop(store.prefetch(&TestKey("a"), counted(&calls, 3), FIVE_MINUTES));

    settle().await;
    assert_eq!(store.value(&TestKey("a")), Some(3));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_revalidate_keeps_fresh_value_readable() {
    let store = QueryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    store.set(&TestKey("a"), 1);

    let handle = store.revalidate(&TestKey("a"), gated(&calls, &gate, Ok(2)));
    settle().await;

    // A read during revalidation is answered from the fresh value.
    let read = store
      .get_or_fetch(&TestKey("a"), counted(&calls, 9), FIVE_MINUTES)
      .await;
    assert_eq!(read, Ok(1));

    gate.notify_one();
    assert_eq!(handle.await, Some(2));
    assert_eq!(store.value(&TestKey("a")), Some(2));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_remove_drops_entry() {
    let store = QueryStore::new();
    store.set(&TestKey("a"), 1);
    assert!(store.remove(&TestKey("a").cache_key()));
    assert!(!store.remove(&TestKey("a").cache_key()));

    let snapshot = store.peek(&TestKey("a"), FIVE_MINUTES);
    assert_eq!(snapshot.status, FetchStatus::Idle);
    assert_eq!(snapshot.value, None);
  }
}
