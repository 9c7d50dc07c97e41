//! Blocking client for the GitHub contents API.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Deserialize;
use thiserror::Error;

use super::contents::{ApiMessage, ContentEntry, parse_listing};
use crate::types::GalleryQuery;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = "ghgallery";
const ACCEPT: &str = "application/vnd.github+json";

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/');

/// Errors returned by a listing request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The API refused the request because the rate limit is exhausted.
    #[error("GitHub API rate limit exceeded (HTTP {status})")]
    RateLimited {
        status: u16,
        /// Unix time (seconds) at which the limit resets, if reported.
        reset_at: Option<u64>,
    },
    /// Any other non-2xx response.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// DNS, TLS, connection or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

/// Source of directory listings. Implemented over HTTP by [`GitHubClient`];
/// tests substitute in-memory fakes.
pub trait ContentsApi {
    /// List the entries at `path` (relative to the repository root) for the
    /// repository, branch and host named by `query`.
    fn list_dir(&self, query: &GalleryQuery, path: &str) -> Result<Vec<ContentEntry>, FetchError>;
}

impl<T: ContentsApi + ?Sized> ContentsApi for &T {
    fn list_dir(&self, query: &GalleryQuery, path: &str) -> Result<Vec<ContentEntry>, FetchError> {
        (**self).list_dir(query, path)
    }
}

/// Rate limit snapshot from `GET /rate_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitStatus {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}

#[derive(Deserialize)]
struct RateLimitResponse {
    rate: RateLimitStatus,
}

/// HTTP client for the contents API.
pub struct GitHubClient {
    agent: ureq::Agent,
    token: Option<String>,
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubClient {
    /// Create an unauthenticated client with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            token: None,
        }
    }

    /// Authenticate requests with a personal access token. Raises the rate
    /// limit from 60 to 5000 requests per hour.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    fn get(&self, url: &str) -> ureq::Request {
        let request = self
            .agent
            .get(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", ACCEPT);
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    fn call(&self, request: ureq::Request) -> Result<String, FetchError> {
        match request.call() {
            Ok(response) => response
                .into_string()
                .map_err(|e| FetchError::Body(e.to_string())),
            Err(ureq::Error::Status(status, response)) => {
                let remaining = response.header("x-ratelimit-remaining").map(str::to_owned);
                let reset = response.header("x-ratelimit-reset").map(str::to_owned);
                let status_text = response.status_text().to_string();
                let body = response.into_string().unwrap_or_default();
                Err(classify_failure(
                    status,
                    &status_text,
                    remaining.as_deref(),
                    reset.as_deref(),
                    &body,
                ))
            }
            Err(ureq::Error::Transport(e)) => Err(FetchError::Transport(e.to_string())),
        }
    }

    /// Query the caller's current core rate limit.
    pub fn rate_limit(&self, host: &str) -> Result<RateLimitStatus, FetchError> {
        let url = format!("{}/rate_limit", api_base(host));
        let body = self.call(self.get(&url))?;
        serde_json::from_str::<RateLimitResponse>(&body)
            .map(|r| r.rate)
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}

impl ContentsApi for GitHubClient {
    fn list_dir(&self, query: &GalleryQuery, path: &str) -> Result<Vec<ContentEntry>, FetchError> {
        let url = contents_url(query, path);
        log::debug!("GET {} (ref {})", url, query.branch);

        let body = self.call(self.get(&url).query("ref", query.branch.as_str()))?;
        Ok(listing_or_empty(query, path, &body))
    }
}

/// Parse a listing body. Any unexpected shape is an empty directory.
pub(crate) fn listing_or_empty(query: &GalleryQuery, path: &str, body: &str) -> Vec<ContentEntry> {
    match parse_listing(body) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!(
                "Unexpected listing payload for {}:{}: {}; treating as empty",
                query.repository,
                path,
                e
            );
            Vec::new()
        }
    }
}

/// Base URL for API calls. Bare hosts get `https://`; hosts that already
/// carry a scheme are used as given.
pub fn api_base(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Build the contents URL for `path` in the query's repository.
pub fn contents_url(query: &GalleryQuery, path: &str) -> String {
    let mut url = format!(
        "{}/repos/{}/{}/contents",
        api_base(&query.host),
        query.repository.owner,
        query.repository.repo
    );
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        url.push('/');
        url.extend(utf8_percent_encode(segment, PATH_SEGMENT));
    }
    url
}

/// Turn a non-2xx response into a [`FetchError`].
///
/// A 403 or 429 with `x-ratelimit-remaining: 0` is a rate limit; so is any
/// 429. Everything else is reported with GitHub's `message` when the body
/// has one.
pub(crate) fn classify_failure(
    status: u16,
    status_text: &str,
    remaining: Option<&str>,
    reset: Option<&str>,
    body: &str,
) -> FetchError {
    let exhausted = remaining.is_some_and(|r| r.trim() == "0");
    if status == 429 || (status == 403 && exhausted) {
        return FetchError::RateLimited {
            status,
            reset_at: reset.and_then(|r| r.trim().parse().ok()),
        };
    }

    let message = serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status_text.to_string());

    FetchError::Status { status, message }
}

/// Whole minutes until `reset_at`, rounded up, or `None` if already past.
pub fn minutes_until(reset_at: u64) -> Option<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let secs = reset_at.checked_sub(now).filter(|s| *s > 0)?;
    Some(secs.div_ceil(60))
}
