//! Shared types for ghgallery

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for parsing failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("value cannot be empty")]
    Empty,
    #[error("invalid character in value: {0}")]
    InvalidCharacter(char),
    #[error("value cannot start with '{0}'")]
    InvalidStart(char),
    #[error("value cannot end with '{0}'")]
    InvalidEnd(char),
    #[error("value cannot contain '..'")]
    DoubleDot,
    #[error("missing separator '/' in repo key")]
    MissingSeparator,
    #[error("invalid owner: {0}")]
    InvalidOwner(#[source] Box<ParseError>),
    #[error("invalid repo: {0}")]
    InvalidRepo(#[source] Box<ParseError>),
    #[error("unknown sort key '{0}' (expected name-asc, name-desc, path-asc or path-desc)")]
    UnknownSortKey(String),
}

/// A GitHub owner (user or organization)
///
/// Validation rules:
/// - Non-empty
/// - Alphanumeric characters and hyphens only
/// - Cannot start or end with a hyphen
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Owner(String);

impl Owner {
    /// Returns the owner name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Owner {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        if s.starts_with('-') {
            return Err(ParseError::InvalidStart('-'));
        }
        if s.ends_with('-') {
            return Err(ParseError::InvalidEnd('-'));
        }
        if let Some(c) = s.chars().find(|&c| !c.is_ascii_alphanumeric() && c != '-') {
            return Err(ParseError::InvalidCharacter(c));
        }
        Ok(Owner(s.to_string()))
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A GitHub repository name
///
/// Alphanumerics plus `-`, `_` and `.`; cannot start with a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repo(String);

impl Repo {
    /// Returns the repository name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Repo {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        if s.starts_with('.') {
            return Err(ParseError::InvalidStart('.'));
        }
        if let Some(c) = s
            .chars()
            .find(|&c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
        {
            return Err(ParseError::InvalidCharacter(c));
        }
        Ok(Repo(s.to_string()))
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a specific GitHub repository (owner + repo)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoKey {
    pub owner: Owner,
    pub repo: Repo,
}

impl RepoKey {
    pub fn new(owner: Owner, repo: Repo) -> Self {
        Self { owner, repo }
    }
}

impl FromStr for RepoKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner_str, repo_str) = s.split_once('/').ok_or(ParseError::MissingSeparator)?;

        let owner = owner_str
            .parse::<Owner>()
            .map_err(|e| ParseError::InvalidOwner(Box::new(e)))?;
        let repo = repo_str
            .parse::<Repo>()
            .map_err(|e| ParseError::InvalidRepo(Box::new(e)))?;

        Ok(RepoKey { owner, repo })
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A git ref name used as the `ref` query parameter.
///
/// Follows the subset of `git check-ref-format` rules that matter for URLs:
/// no whitespace, no control characters, none of `~ ^ : ? * [ \`, no `..`,
/// and no leading or trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Branch(String);

impl Branch {
    /// Returns the branch name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Branch {
    fn default() -> Self {
        Branch("main".to_string())
    }
}

impl FromStr for Branch {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        if s.starts_with('/') {
            return Err(ParseError::InvalidStart('/'));
        }
        if s.ends_with('/') {
            return Err(ParseError::InvalidEnd('/'));
        }
        if s.contains("..") {
            return Err(ParseError::DoubleDot);
        }
        if let Some(c) = s.chars().find(|&c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '~' | '^' | ':' | '?' | '*' | '[' | '\\')
        }) {
            return Err(ParseError::InvalidCharacter(c));
        }
        Ok(Branch(s.to_string()))
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordering applied to gallery items before pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    NameAsc,
    NameDesc,
    PathAsc,
    #[default]
    PathDesc,
}

impl SortKey {
    /// Returns the settings and CLI spelling of this key
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::NameAsc => "name-asc",
            SortKey::NameDesc => "name-desc",
            SortKey::PathAsc => "path-asc",
            SortKey::PathDesc => "path-desc",
        }
    }
}

impl FromStr for SortKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name-asc" => Ok(SortKey::NameAsc),
            "name-desc" => Ok(SortKey::NameDesc),
            "path-asc" => Ok(SortKey::PathAsc),
            "path-desc" => Ok(SortKey::PathDesc),
            _ => Err(ParseError::UnknownSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single image in a gallery, as listed by the contents API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    /// File name, e.g. `sunset.jpg`
    pub name: String,
    /// Path within the repository, e.g. `photos/2024/sunset.jpg`
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Raw download location for the image bytes
    pub download_url: String,
    /// Location of the file's page on the GitHub web UI
    pub html_url: String,
}

impl GalleryItem {
    /// File name without its extension.
    pub fn caption(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

/// Everything that identifies one gallery listing and how it is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryQuery {
    /// API host, e.g. `api.github.com`. May carry a scheme and a path prefix
    /// for GitHub Enterprise (`https://ghe.example.com/api/v3`).
    pub host: String,
    pub repository: RepoKey,
    pub branch: Branch,
    /// Directory to list, without leading or trailing slashes. Empty means
    /// the repository root.
    pub root_path: String,
    pub recursive: bool,
    pub page_size: Option<NonZeroUsize>,
    pub sort: SortKey,
}

impl GalleryQuery {
    pub fn new(host: impl Into<String>, repository: RepoKey) -> Self {
        Self {
            host: host.into(),
            repository,
            branch: Branch::default(),
            root_path: String::new(),
            recursive: false,
            page_size: None,
            sort: SortKey::default(),
        }
    }

    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_root_path(mut self, path: &str) -> Self {
        self.root_path = normalize_path(path);
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_page_size(mut self, page_size: Option<NonZeroUsize>) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }
}

/// Strip surrounding slashes and collapse empty segments so that `/a//b/`
/// and `a/b` name the same directory.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
