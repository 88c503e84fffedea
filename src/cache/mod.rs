//! In-memory query cache shared by every screen of the application.
//!
//! This module provides a domain-agnostic caching core that:
//! - Collapses concurrent requests for the same key onto one fetch
//! - Serves fresh entries without touching the network and revalidates stale ones
//! - Warms referenced entities for freshly loaded child lists
//! - Applies optimistic writes with rollback on failure

mod key;
mod mutation;
mod prefetch;
mod store;

pub use key::{CacheKey, QueryKey};
pub use mutation::{MutationCoordinator, MutationState, OptimisticUpdate};
pub use prefetch::{Joined, PrefetchPlanner, References};
pub use store::{FetchStatus, PrefetchHandle, QueryStore, Snapshot};
