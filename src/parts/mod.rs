pub mod api_types;
pub mod cached_client;
pub mod client;
#[cfg(test)]
pub mod fake;
pub mod keys;
pub mod types;

pub use cached_client::{CachedPartsClient, Resource};
pub use client::{HttpPartsApi, PartsApi};
pub use keys::{AllowableStatusesKey, ChildrenKey, PartKey};
