//! Listing cache and its backing stores

mod gallery;
mod paths;
mod staleness;
mod store;

pub use gallery::{DEFAULT_TTL, GalleryCache, KEY_PREFIX, PruneStats, cache_key};
pub use paths::CachePaths;
pub use staleness::is_stale;
pub use store::{KvStore, MemoryStore, SqliteStore, StoreError};
