//! Cache directory path management
//!
//! ```text
//! ~/.cache/ghgallery/
//! └── cache.db        # SQLite key-value store of gallery listings
//! ```

use std::path::{Path, PathBuf};

/// Manages filesystem paths for the cache directory layout
#[derive(Debug, Clone)]
pub struct CachePaths {
    root: PathBuf,
}

impl CachePaths {
    /// Creates a new CachePaths with the specified root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the database path: `{root}/cache.db`
    pub fn database(&self) -> PathBuf {
        self.root.join("cache.db")
    }
}

impl Default for CachePaths {
    /// Uses `dirs::cache_dir()` + "ghgallery":
    /// - Linux: `~/.cache/ghgallery`
    /// - macOS: `~/Library/Caches/ghgallery`
    /// - Windows: `C:\Users\<user>\AppData\Local\ghgallery`
    fn default() -> Self {
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        Self::new(cache_dir.join("ghgallery"))
    }
}
