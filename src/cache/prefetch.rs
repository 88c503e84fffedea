//! Warming referenced entities for freshly loaded child lists.

use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::key::{CacheKey, QueryKey};
use super::store::{PrefetchHandle, QueryStore};
use crate::error::FetchError;

/// An item that points at another cached entity.
pub trait References {
  type Key: QueryKey + Clone;

  fn referenced(&self) -> Self::Key;
}

/// A child paired with the entity it references.
///
/// `resolved` is `None` when that entity could not be fetched, so a single
/// row can show its own error without failing the whole list.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined<C, V> {
  pub item: C,
  pub resolved: Option<V>,
}

type Warmed<V> = Vec<(CacheKey, PrefetchHandle<V>)>;

/// Issues deduplicated prefetches for everything a list of children references.
#[derive(Clone, Debug)]
pub struct PrefetchPlanner {
  store: QueryStore,
}

impl PrefetchPlanner {
  pub fn new(store: QueryStore) -> Self {
    Self { store }
  }

  /// Referenced keys in first-seen order, without duplicates.
  pub fn plan<C: References>(children: &[C]) -> Vec<C::Key> {
    let mut seen = HashSet::new();
    children
      .iter()
      .map(References::referenced)
      .filter(|key| seen.insert(key.cache_key()))
      .collect()
  }

  /// Start one prefetch per distinct referenced key and return without waiting.
  ///
  /// Failures stay on the referenced entries; they never reach the caller.
  pub fn warm<C, F, Fut>(
    &self,
    children: &[C],
    fetch: F,
    stale_after: Duration,
  ) -> Warmed<<C::Key as QueryKey>::Value>
  where
    C: References,
    F: Fn(&C::Key) -> Fut,
    Fut: Future<Output = Result<<C::Key as QueryKey>::Value, FetchError>> + Send + 'static,
  {
    let keys = Self::plan(children);
    debug!(
      children = children.len(),
      referenced = keys.len(),
      "warming referenced entities"
    );
    keys
      .into_iter()
      .map(|key| {
        let request = fetch(&key);
        let handle = self.store.prefetch(&key, move || request, stale_after);
        (key.cache_key(), handle)
      })
      .collect()
  }

  /// Wait for warmed entities and pair each child with what it references.
  pub async fn join<C: References>(
    children: Vec<C>,
    warmed: Warmed<<C::Key as QueryKey>::Value>,
  ) -> Vec<Joined<C, <C::Key as QueryKey>::Value>> {
    let (keys, handles): (Vec<_>, Vec<_>) = warmed.into_iter().unzip();
    let results = join_all(handles).await;
    let resolved: HashMap<CacheKey, Option<_>> = keys.into_iter().zip(results).collect();

    children
      .into_iter()
      .map(|item| {
        let resolved = resolved
          .get(&item.referenced().cache_key())
          .cloned()
          .flatten();
        Joined { item, resolved }
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  #[derive(Clone, Debug, PartialEq)]
  struct Row {
    target: &'static str,
  }

  #[derive(Clone)]
  struct Target(&'static str);

  impl QueryKey for Target {
    type Value = String;

    fn cache_key(&self) -> CacheKey {
      CacheKey::new("target").with(self.0)
    }

    fn description(&self) -> String {
      format!("target {}", self.0)
    }
  }

  impl References for Row {
    type Key = Target;

    fn referenced(&self) -> Target {
      Target(self.target)
    }
  }

  fn rows() -> Vec<Row> {
    vec![
      Row { target: "a" },
      Row { target: "b" },
      Row { target: "a" },
      Row { target: "broken" },
    ]
  }

  const STALE: Duration = Duration::from_secs(300);

  #[test]
  fn test_plan_dedups_in_order() {
    let keys: Vec<_> = PrefetchPlanner::plan(&rows())
      .into_iter()
      .map(|key| key.0)
      .collect();
    assert_eq!(keys, vec!["a", "b", "broken"]);
  }

  #[test]
  fn test_plan_empty() {
    assert!(PrefetchPlanner::plan::<Row>(&[]).is_empty());
  }

  #[tokio::test]
  async fn test_join_isolates_failures() {
    let store = QueryStore::new();
    let planner = PrefetchPlanner::new(store.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let children = rows();
    let fetch = {
      let calls = Arc::clone(&calls);
      move |key: &Target| {
        let calls = Arc::clone(&calls);
        let id = key.0;
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          if id == "broken" {
            Err(FetchError::not_found(id))
          } else {
            Ok(format!("part {}", id))
          }
        }
      }
    };
    let warmed = planner.warm(&children, fetch, STALE);
    let joined = PrefetchPlanner::join(children, warmed).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let resolved: Vec<_> = joined.iter().map(|j| j.resolved.as_deref()).collect();
    assert_eq!(
      resolved,
      vec![Some("part a"), Some("part b"), Some("part a"), None]
    );
    assert_eq!(store.value(&Target("b")), Some("part b".to_string()));
  }

  #[tokio::test]
  async fn test_warm_skips_fresh_entries() {
    let store = QueryStore::new();
    store.set(&Target("a"), "cached".to_string());
    let planner = PrefetchPlanner::new(store.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let children = vec![Row { target: "a" }];
    let fetch = {
      let calls = Arc::clone(&calls);
      move |_: &Target| {
        let calls = Arc::clone(&calls);
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, FetchError>("fetched".to_string())
        }
      }
    };
    let warmed = planner.warm(&children, fetch, STALE);
    let joined = PrefetchPlanner::join(children, warmed).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(joined[0].resolved.as_deref(), Some("cached"));
  }
}
