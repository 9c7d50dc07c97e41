//! TTL-bound cache of gallery listings.
//!
//! Every failure in here is absorbed: a corrupt payload reads as a miss, a
//! failed write is logged and dropped. Callers never see a cache error.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use super::staleness::{is_stale, unix_millis};
use super::store::KvStore;
use crate::github::api_base;
use crate::types::{GalleryItem, GalleryQuery, normalize_path};

/// How long a listing stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Prefix shared by every key this cache writes.
pub const KEY_PREFIX: &str = "ghgallery:v1:";

/// Stored form of one listing.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    /// Unix milliseconds at write time.
    timestamp: u64,
    items: Vec<GalleryItem>,
}

/// Derive the cache key for a query.
///
/// Only the fields that change the listing take part: host, owner, repo,
/// branch, recursion and root path. The tuple is JSON-encoded, so distinct
/// tuples can never collide.
pub fn cache_key(query: &GalleryQuery) -> String {
    let parts = serde_json::json!([
        api_base(&query.host),
        query.repository.owner.as_str(),
        query.repository.repo.as_str(),
        query.branch.as_str(),
        query.recursive,
        normalize_path(&query.root_path),
    ]);
    format!("{}{}", KEY_PREFIX, parts)
}

/// Outcome of a [`GalleryCache::prune`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub scanned: u64,
    pub removed: u64,
}

/// Listing cache over any [`KvStore`].
pub struct GalleryCache<S: KvStore> {
    store: S,
    ttl: Duration,
}

impl<S: KvStore> GalleryCache<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Items stored under `key`, if present and fresh.
    pub fn read(&self, key: &str) -> Option<Vec<GalleryItem>> {
        self.read_at(key, SystemTime::now())
    }

    /// [`read`](Self::read) evaluated at `now`.
    pub fn read_at(&self, key: &str, now: SystemTime) -> Option<Vec<GalleryItem>> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let record: CacheRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                log::debug!("Ignoring malformed cache entry {}: {}", key, e);
                return None;
            }
        };

        if is_stale(record.timestamp, self.ttl, now) {
            log::debug!("Cache entry {} is stale", key);
            return None;
        }

        Some(record.items)
    }

    /// Store `items` under `key`. Best effort.
    pub fn write(&self, key: &str, items: &[GalleryItem]) {
        self.write_at(key, items, SystemTime::now());
    }

    /// [`write`](Self::write) stamped with `now`.
    pub fn write_at(&self, key: &str, items: &[GalleryItem], now: SystemTime) {
        let record = CacheRecord {
            timestamp: unix_millis(now),
            items: items.to_vec(),
        };
        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Failed to encode cache entry {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(key, &payload) {
            log::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    /// Drop the entry for `key`. Best effort.
    pub fn invalidate(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            log::warn!("Cache invalidate failed for {}: {}", key, e);
        }
    }

    /// Remove every gallery entry, leaving foreign keys alone. Returns the
    /// number of entries removed.
    pub fn clear(&self) -> u64 {
        let mut removed = 0;
        for key in self.gallery_keys() {
            match self.store.remove(&key) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to remove cache entry {}: {}", key, e),
            }
        }
        removed
    }

    /// Remove stale and unreadable gallery entries.
    pub fn prune(&self) -> PruneStats {
        self.prune_at(SystemTime::now())
    }

    pub fn prune_at(&self, now: SystemTime) -> PruneStats {
        let mut stats = PruneStats::default();
        for key in self.gallery_keys() {
            stats.scanned += 1;
            if self.read_at(&key, now).is_some() {
                continue;
            }
            match self.store.remove(&key) {
                Ok(()) => stats.removed += 1,
                Err(e) => log::warn!("Failed to prune cache entry {}: {}", key, e),
            }
        }
        stats
    }

    fn gallery_keys(&self) -> Vec<String> {
        match self.store.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(KEY_PREFIX))
                .collect(),
            Err(e) => {
                log::warn!("Failed to enumerate cache keys: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{MemoryStore, SqliteStore, StoreError};
    use crate::types::RepoKey;

    fn query(repo: &str) -> GalleryQuery {
        let repo: RepoKey = repo.parse().unwrap();
        GalleryQuery::new("api.github.com", repo)
    }

    fn items(names: &[&str]) -> Vec<GalleryItem> {
        names
            .iter()
            .map(|name| GalleryItem {
                name: name.to_string(),
                path: format!("img/{}", name),
                size: 42,
                download_url: format!("https://raw.example/img/{}", name),
                html_url: format!("https://github.example/img/{}", name),
            })
            .collect()
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    impl KvStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::QuotaExceeded {
                needed: 1,
                quota: 0,
            })
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
        fn keys(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[test]
    fn cache_key_is_deterministic() {
        assert_eq!(cache_key(&query("octocat/pics")), cache_key(&query("octocat/pics")));
        assert!(cache_key(&query("octocat/pics")).starts_with(KEY_PREFIX));
    }

    #[test]
    fn cache_key_ignores_display_settings() {
        let base = query("octocat/pics");
        let paged = base
            .clone()
            .with_page_size(std::num::NonZeroUsize::new(10))
            .with_sort(crate::types::SortKey::NameAsc);
        assert_eq!(cache_key(&base), cache_key(&paged));
    }

    #[test]
    fn cache_key_normalizes_equivalent_inputs() {
        let a = query("octocat/pics").with_root_path("/img/");
        let mut b = query("octocat/pics").with_root_path("img");
        b.host = "https://api.github.com/".to_string();
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn cache_key_distinguishes_each_field() {
        let base = query("octocat/pics").with_root_path("img");
        let variants = vec![
            base.clone(),
            query("octocat/pics2").with_root_path("img"),
            query("octocat2/pics").with_root_path("img"),
            base.clone().with_branch("gh-pages".parse().unwrap()),
            base.clone().with_recursive(true),
            base.clone().with_root_path("img/2024"),
            base.clone().with_root_path(""),
        ];
        let keys: std::collections::HashSet<String> = variants.iter().map(cache_key).collect();
        assert_eq!(keys.len(), variants.len());
    }

    #[test]
    fn cache_key_resists_separator_collisions() {
        // Fields are encoded, not concatenated, so shifting text between
        // neighbouring fields changes the key.
        let a = query("a-b/c").with_root_path("d");
        let b = query("a/b-c").with_root_path("d");
        assert_ne!(cache_key(&a), cache_key(&b));

        let c = query("o/r").with_branch("x/y".parse().unwrap()).with_root_path("z");
        let d = query("o/r").with_branch("x".parse().unwrap()).with_root_path("y/z");
        assert_ne!(cache_key(&c), cache_key(&d));
    }

    #[test]
    fn write_then_read_returns_same_items() {
        let cache = GalleryCache::new(MemoryStore::new());
        let key = cache_key(&query("octocat/pics"));
        let stored = items(&["a.png", "b.png"]);

        cache.write(&key, &stored);

        assert_eq!(cache.read(&key), Some(stored));
    }

    #[test]
    fn read_after_ttl_is_absent() {
        let cache = GalleryCache::new(MemoryStore::new());
        let key = cache_key(&query("octocat/pics"));
        let written_at = SystemTime::now();

        cache.write_at(&key, &items(&["a.png"]), written_at);

        assert!(cache.read_at(&key, written_at + Duration::from_secs(9 * 60)).is_some());
        assert!(cache.read_at(&key, written_at + DEFAULT_TTL).is_none());
        assert!(cache.read_at(&key, written_at + Duration::from_secs(3600)).is_none());
    }

    #[test]
    fn custom_ttl_is_respected() {
        let cache = GalleryCache::new(MemoryStore::new()).with_ttl(Duration::from_secs(5));
        let key = cache_key(&query("octocat/pics"));
        let written_at = SystemTime::now();
        cache.write_at(&key, &items(&["a.png"]), written_at);
        assert!(cache.read_at(&key, written_at + Duration::from_secs(6)).is_none());
    }

    #[test]
    fn malformed_payload_is_a_miss() {
        let store = MemoryStore::new();
        store.set("ghgallery:v1:broken", "{not json").unwrap();
        store
            .set("ghgallery:v1:shape", r#"{"timestamp": "yesterday", "items": 3}"#)
            .unwrap();
        let cache = GalleryCache::new(store);

        assert_eq!(cache.read("ghgallery:v1:broken"), None);
        assert_eq!(cache.read("ghgallery:v1:shape"), None);
    }

    #[test]
    fn store_failures_are_absorbed() {
        let cache = GalleryCache::new(BrokenStore);
        let key = cache_key(&query("octocat/pics"));

        cache.write(&key, &items(&["a.png"]));
        assert_eq!(cache.read(&key), None);
        cache.invalidate(&key);
        assert_eq!(cache.clear(), 0);
        assert_eq!(cache.prune(), PruneStats::default());
    }

    #[test]
    fn quota_failure_leaves_previous_state() {
        let cache = GalleryCache::new(MemoryStore::with_quota(64));
        let key = cache_key(&query("octocat/pics"));

        cache.write(&key, &items(&["a.png", "b.png", "c.png"]));

        assert_eq!(cache.read(&key), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = GalleryCache::new(SqliteStore::open_in_memory().unwrap());
        let key = cache_key(&query("octocat/pics"));
        cache.write(&key, &items(&["a.png"]));

        cache.invalidate(&key);

        assert_eq!(cache.read(&key), None);
    }

    #[test]
    fn clear_only_touches_gallery_keys() {
        let store = MemoryStore::new();
        store.set("unrelated", "keep me").unwrap();
        let cache = GalleryCache::new(store);
        cache.write(&cache_key(&query("octocat/a")), &items(&["a.png"]));
        cache.write(&cache_key(&query("octocat/b")), &items(&["b.png"]));

        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.store().keys().unwrap(), vec!["unrelated".to_string()]);
    }

    #[test]
    fn prune_drops_stale_and_corrupt_entries() {
        let cache = GalleryCache::new(MemoryStore::new());
        let now = SystemTime::now();
        let fresh = cache_key(&query("octocat/fresh"));
        let stale = cache_key(&query("octocat/stale"));

        cache.write_at(&fresh, &items(&["a.png"]), now);
        cache.write_at(&stale, &items(&["b.png"]), now - Duration::from_secs(3600));
        cache.store().set("ghgallery:v1:junk", "???").unwrap();

        let stats = cache.prune_at(now);

        assert_eq!(stats, PruneStats { scanned: 3, removed: 2 });
        assert!(cache.read_at(&fresh, now).is_some());
        assert_eq!(cache.store().get(&stale).unwrap(), None);
    }
}
