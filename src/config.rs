//! Settings file and per-gallery configuration.
//!
//! Settings live in `{config_dir}/ghgallery/config.json`:
//!
//! ```json
//! {
//!   "host": "api.github.com",
//!   "timeout_secs": 15,
//!   "ttl_secs": 600,
//!   "galleries": {
//!     "photos": { "owner": "octocat", "repo": "pics", "path": "img", "recursive": true, "page_size": 12 }
//!   }
//! }
//! ```
//!
//! `GHGALLERY_HOST` and `GITHUB_TOKEN` override the file.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{CachePaths, DEFAULT_TTL};
use crate::gallery::GalleryError;
use crate::github::DEFAULT_TIMEOUT;
use crate::types::{Branch, GalleryQuery, Owner, Repo, RepoKey, SortKey};

pub const DEFAULT_HOST: &str = "api.github.com";

/// Errors loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no gallery named '{0}' in settings")]
    UnknownGallery(String),
}

/// Unvalidated settings for one gallery. Every field is optional so that
/// settings-file entries and command-line flags can be layered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub path: Option<String>,
    pub recursive: Option<bool>,
    /// Items per page. Absent or 0 shows everything on one page.
    pub page_size: Option<usize>,
    pub sort: Option<String>,
    /// Show captions under each item.
    pub captions: Option<bool>,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, GalleryError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(GalleryError::ConfigMissing(field)),
    }
}

fn invalid(field: &'static str, reason: impl ToString) -> GalleryError {
    GalleryError::ConfigInvalid {
        field,
        reason: reason.to_string(),
    }
}

impl GalleryConfig {
    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: GalleryConfig) -> GalleryConfig {
        GalleryConfig {
            owner: overrides.owner.or(self.owner),
            repo: overrides.repo.or(self.repo),
            branch: overrides.branch.or(self.branch),
            path: overrides.path.or(self.path),
            recursive: overrides.recursive.or(self.recursive),
            page_size: overrides.page_size.or(self.page_size),
            sort: overrides.sort.or(self.sort),
            captions: overrides.captions.or(self.captions),
        }
    }

    pub fn captions(&self) -> bool {
        self.captions.unwrap_or(false)
    }

    /// Validate into a [`GalleryQuery`] against the given API host.
    pub fn to_query(&self, host: &str) -> Result<GalleryQuery, GalleryError> {
        let owner: Owner = required(&self.owner, "owner")?
            .parse()
            .map_err(|e| invalid("owner", e))?;
        let repo: Repo = required(&self.repo, "repo")?
            .parse()
            .map_err(|e| invalid("repo", e))?;

        let branch = match self.branch.as_deref().map(str::trim) {
            Some(b) if !b.is_empty() => b.parse::<Branch>().map_err(|e| invalid("branch", e))?,
            _ => Branch::default(),
        };

        let sort = match self.sort.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.parse::<SortKey>().map_err(|e| invalid("sort", e))?,
            _ => SortKey::default(),
        };

        Ok(GalleryQuery::new(host, RepoKey::new(owner, repo))
            .with_branch(branch)
            .with_root_path(self.path.as_deref().unwrap_or(""))
            .with_recursive(self.recursive.unwrap_or(false))
            .with_page_size(self.page_size.and_then(NonZeroUsize::new))
            .with_sort(sort))
    }
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub timeout_secs: u64,
    pub ttl_secs: u64,
    pub galleries: BTreeMap<String, GalleryConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            token: None,
            cache_dir: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            ttl_secs: DEFAULT_TTL.as_secs(),
            galleries: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// `{config_dir}/ghgallery/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ghgallery").join("config.json"))
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `GHGALLERY_HOST` and `GITHUB_TOKEN` from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = lookup("GHGALLERY_HOST").filter(|h| !h.trim().is_empty()) {
            self.host = host;
        }
        if let Some(token) = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.token = Some(token);
        }
        self
    }

    pub fn cache_paths(&self) -> CachePaths {
        match &self.cache_dir {
            Some(dir) => CachePaths::new(dir),
            None => CachePaths::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn gallery(&self, name: &str) -> Result<&GalleryConfig, ConfigError> {
        self.galleries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownGallery(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn config(owner: &str, repo: &str) -> GalleryConfig {
        GalleryConfig {
            owner: Some(owner.to_string()),
            repo: Some(repo.to_string()),
            ..GalleryConfig::default()
        }
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let query = config("octocat", "pics").to_query(DEFAULT_HOST).unwrap();
        assert_eq!(query.repository.to_string(), "octocat/pics");
        assert_eq!(query.branch.as_str(), "main");
        assert_eq!(query.root_path, "");
        assert!(!query.recursive);
        assert_eq!(query.page_size, None);
        assert_eq!(query.sort, SortKey::PathDesc);
        assert_eq!(query.host, DEFAULT_HOST);
    }

    #[test]
    fn missing_owner_or_repo_is_config_missing() {
        let mut cfg = config("octocat", "pics");
        cfg.owner = None;
        assert!(matches!(
            cfg.to_query(DEFAULT_HOST),
            Err(GalleryError::ConfigMissing("owner"))
        ));

        let mut cfg = config("octocat", "pics");
        cfg.repo = Some("   ".to_string());
        assert!(matches!(
            cfg.to_query(DEFAULT_HOST),
            Err(GalleryError::ConfigMissing("repo"))
        ));
    }

    #[test]
    fn malformed_fields_are_config_invalid() {
        let mut cfg = config("octocat", "pics");
        cfg.sort = Some("random".to_string());
        assert!(matches!(
            cfg.to_query(DEFAULT_HOST),
            Err(GalleryError::ConfigInvalid { field: "sort", .. })
        ));

        let cfg = config("bad_owner", "pics");
        assert!(matches!(
            cfg.to_query(DEFAULT_HOST),
            Err(GalleryError::ConfigInvalid { field: "owner", .. })
        ));

        let mut cfg = config("octocat", "pics");
        cfg.branch = Some("a..b".to_string());
        assert!(matches!(
            cfg.to_query(DEFAULT_HOST),
            Err(GalleryError::ConfigInvalid { field: "branch", .. })
        ));
    }

    #[test]
    fn zero_page_size_disables_paging() {
        let mut cfg = config("octocat", "pics");
        cfg.page_size = Some(0);
        assert_eq!(cfg.to_query(DEFAULT_HOST).unwrap().page_size, None);
        cfg.page_size = Some(12);
        assert_eq!(
            cfg.to_query(DEFAULT_HOST).unwrap().page_size,
            NonZeroUsize::new(12)
        );
    }

    #[test]
    fn merge_prefers_overrides() {
        let base = GalleryConfig {
            path: Some("img".to_string()),
            page_size: Some(10),
            ..config("octocat", "pics")
        };
        let overrides = GalleryConfig {
            page_size: Some(5),
            captions: Some(true),
            ..GalleryConfig::default()
        };

        let merged = base.merge(overrides);

        assert_eq!(merged.owner.as_deref(), Some("octocat"));
        assert_eq!(merged.path.as_deref(), Some("img"));
        assert_eq!(merged.page_size, Some(5));
        assert!(merged.captions());
    }

    #[test]
    fn load_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_parses_galleries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "ttl_secs": 60,
                "galleries": {
                    "photos": {"owner": "octocat", "repo": "pics", "recursive": true, "sort": "name-asc"}
                }
            }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.host, DEFAULT_HOST);
        assert_eq!(settings.ttl(), Duration::from_secs(60));
        let query = settings
            .gallery("photos")
            .unwrap()
            .to_query(&settings.host)
            .unwrap();
        assert!(query.recursive);
        assert_eq!(query.sort, SortKey::NameAsc);
        assert!(matches!(
            settings.gallery("missing"),
            Err(ConfigError::UnknownGallery(_))
        ));
    }

    #[test]
    fn load_rejects_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ host: ").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn overrides_replace_host_and_token() {
        let env: HashMap<&str, &str> =
            HashMap::from([("GHGALLERY_HOST", "ghe.example.com/api/v3"), ("GITHUB_TOKEN", "t0k")]);
        let settings = Settings::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.host, "ghe.example.com/api/v3");
        assert_eq!(settings.token.as_deref(), Some("t0k"));
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let settings = Settings::default().with_overrides(|_| Some(String::new()));
        assert_eq!(settings.host, DEFAULT_HOST);
        assert_eq!(settings.token, None);
    }

    #[test]
    fn cache_dir_setting_wins() {
        let settings = Settings {
            cache_dir: Some(PathBuf::from("/tmp/gallery-cache")),
            ..Settings::default()
        };
        assert_eq!(
            settings.cache_paths().database(),
            PathBuf::from("/tmp/gallery-cache").join("cache.db")
        );
    }
}
