//! Structural cache keys and the typed key trait.

use std::fmt;

/// Key of a single cache entry: a namespace plus an ordered identifier tuple.
///
/// Keys compare by value, so two keys built from the same logical resource
/// always address the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
  namespace: &'static str,
  segments: Vec<String>,
}

impl CacheKey {
  /// A key with no identifier segments. On its own it selects the whole namespace.
  pub fn new(namespace: &'static str) -> Self {
    Self {
      namespace,
      segments: Vec::new(),
    }
  }

  /// Append an identifier segment.
  pub fn with(mut self, segment: impl Into<String>) -> Self {
    self.segments.push(segment.into());
    self
  }

  /// Whether this key, used as a prefix, selects `other`.
  ///
  /// Same namespace and every segment of `self` equals the segment of `other`
  /// at the same position. A key always matches itself.
  pub fn matches(&self, other: &CacheKey) -> bool {
    self.namespace == other.namespace
      && self.segments.len() <= other.segments.len()
      && self
        .segments
        .iter()
        .zip(&other.segments)
        .all(|(a, b)| a == b)
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.namespace)?;
    for segment in &self.segments {
      write!(f, "/{}", segment)?;
    }
    Ok(())
  }
}

/// A typed handle on a cache entry.
///
/// The associated `Value` ties each key family to the type stored under it, so
/// the store can hand back concrete values without callers naming types twice.
pub trait QueryKey {
  type Value: Clone + Send + Sync + 'static;

  /// Structural key of the entry this handle addresses.
  fn cache_key(&self) -> CacheKey;

  /// Human readable description for logs.
  fn description(&self) -> String;
}
