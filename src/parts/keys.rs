//! Cache keys for configuration service resources.

use crate::cache::{CacheKey, QueryKey, References};
use crate::parts::types::{AllowableStatuses, Configuration, Part};

/// Segment used for the children of the (virtual) root, i.e. the machines.
const ROOT: &str = "root";

/// Children of a configuration node, or the machine list for `parent: None`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildrenKey {
  pub parent: Option<String>,
}

impl ChildrenKey {
  pub fn root() -> Self {
    Self { parent: None }
  }

  pub fn of(parent: impl Into<String>) -> Self {
    Self {
      parent: Some(parent.into()),
    }
  }

  /// Prefix selecting every children list.
  pub fn all() -> CacheKey {
    CacheKey::new("children")
  }
}

impl QueryKey for ChildrenKey {
  type Value = Vec<Configuration>;

  fn cache_key(&self) -> CacheKey {
    Self::all().with(self.parent.as_deref().unwrap_or(ROOT))
  }

  fn description(&self) -> String {
    match &self.parent {
      Some(parent) => format!("children of {}", parent),
      None => "machines".to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartKey(pub String);

impl QueryKey for PartKey {
  type Value = Part;

  fn cache_key(&self) -> CacheKey {
    CacheKey::new("part").with(self.0.as_str())
  }

  fn description(&self) -> String {
    format!("part {}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllowableStatusesKey(pub String);

impl QueryKey for AllowableStatusesKey {
  type Value = AllowableStatuses;

  fn cache_key(&self) -> CacheKey {
    CacheKey::new("allowableStatuses").with(self.0.as_str())
  }

  fn description(&self) -> String {
    format!("allowable statuses of part {}", self.0)
  }
}

impl References for Configuration {
  type Key = PartKey;

  fn referenced(&self) -> PartKey {
    PartKey(self.part_uuid.clone())
  }
}
