//! Per-gallery hydration state.
//!
//! A [`Gallery`] owns one configuration, its listing source and its cache,
//! and moves through `Idle -> Loading -> {Ready | Empty | Error}` each time
//! it is hydrated. At most one hydration runs at a time; calls made while
//! one is in flight return [`Hydration::Ignored`] without touching the
//! network.
//!
//! Changing the query (or calling [`Gallery::supersede`]) advances the
//! gallery's epoch. A hydration that was started under an older epoch stops
//! at its next listing request, and whatever it produces is dropped on
//! arrival as [`Hydration::Superseded`].

use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::cache::{GalleryCache, KvStore, cache_key};
use crate::cancel::{CancelToken, Epoch};
use crate::config::GalleryConfig;
use crate::github::{ContentsApi, FetchError, minutes_until};
use crate::lister::{ContentLister, ListError};
use crate::paginate::{PageState, PageView, paginate, sort_items};
use crate::types::{GalleryItem, GalleryQuery};

/// Errors surfaced by a hydration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    /// A required setting is absent. Not retried.
    #[error("gallery setting '{0}' is required")]
    ConfigMissing(&'static str),
    /// A setting is present but unusable.
    #[error("invalid gallery setting '{field}': {reason}")]
    ConfigInvalid { field: &'static str, reason: String },
    /// A listing request failed.
    #[error("failed to load gallery: {0}")]
    Fetch(#[from] FetchError),
    /// The hydration was superseded before it finished.
    #[error("hydration superseded")]
    Cancelled,
}

impl From<ListError> for GalleryError {
    fn from(e: ListError) -> Self {
        match e {
            ListError::Fetch(e) => GalleryError::Fetch(e),
            ListError::Cancelled => GalleryError::Cancelled,
        }
    }
}

impl GalleryError {
    /// Text suitable for showing in place of the gallery.
    pub fn user_message(&self) -> String {
        match self {
            GalleryError::ConfigMissing(field) => format!(
                "Gallery is not configured: set '{}'. A gallery needs an owner and a repo, \
                 and may set branch, path, recursive, page_size and sort.",
                field
            ),
            GalleryError::ConfigInvalid { field, reason } => {
                format!("Gallery setting '{}' is invalid: {}", field, reason)
            }
            GalleryError::Fetch(FetchError::RateLimited { reset_at, .. }) => {
                match reset_at.and_then(minutes_until) {
                    Some(1) => "GitHub API rate limit exceeded. Try again in 1 minute, \
                                or set GITHUB_TOKEN for a higher limit."
                        .to_string(),
                    Some(minutes) => format!(
                        "GitHub API rate limit exceeded. Try again in {} minutes, \
                         or set GITHUB_TOKEN for a higher limit.",
                        minutes
                    ),
                    None => "GitHub API rate limit exceeded. Try again later, \
                             or set GITHUB_TOKEN for a higher limit."
                        .to_string(),
                }
            }
            GalleryError::Fetch(e) => format!("Failed to load gallery: {}", e),
            GalleryError::Cancelled => "Gallery load was superseded.".to_string(),
        }
    }
}

/// Where a gallery is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryStatus {
    Idle,
    Loading,
    Ready,
    Empty,
    /// Holds the user-visible message.
    Error(String),
}

/// Result of one [`Gallery::hydrate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydration {
    /// A page to display. `view.state` may be [`PageState::EmptyPage`].
    Ready(PageView),
    /// The gallery has no items at all.
    Empty,
    /// Loading failed; `message` is ready to show.
    Failed { message: String, error: GalleryError },
    /// Another hydration was already in flight; nothing was done.
    Ignored,
    /// The query changed while this hydration ran; its result was dropped.
    Superseded,
}

struct GalleryState {
    query: Result<GalleryQuery, GalleryError>,
    status: GalleryStatus,
    current_page: usize,
}

/// One gallery instance. Owned by the caller and shared by reference.
pub struct Gallery<C: ContentsApi, S: KvStore> {
    api: C,
    cache: GalleryCache<S>,
    state: Mutex<GalleryState>,
    epoch: Epoch,
}

impl<C: ContentsApi, S: KvStore> Gallery<C, S> {
    /// Create a gallery for an already-validated (or already-failed) query.
    pub fn new(query: Result<GalleryQuery, GalleryError>, api: C, cache: GalleryCache<S>) -> Self {
        Self {
            api,
            cache,
            state: Mutex::new(GalleryState {
                query,
                status: GalleryStatus::Idle,
                current_page: 1,
            }),
            epoch: Epoch::new(),
        }
    }

    /// Create a gallery from raw settings. Invalid settings are kept and
    /// reported by the first hydration.
    pub fn from_config(config: &GalleryConfig, host: &str, api: C, cache: GalleryCache<S>) -> Self {
        Self::new(config.to_query(host), api, cache)
    }

    fn lock(&self) -> MutexGuard<'_, GalleryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> GalleryStatus {
        self.lock().status.clone()
    }

    /// Page shown by the last successful hydration (1-based).
    pub fn current_page(&self) -> usize {
        self.lock().current_page
    }

    pub fn query(&self) -> Result<GalleryQuery, GalleryError> {
        self.lock().query.clone()
    }

    pub fn cache(&self) -> &GalleryCache<S> {
        &self.cache
    }

    /// Replace the query. Any in-flight hydration is superseded and the
    /// gallery returns to `Idle` on page 1.
    pub fn set_query(&self, query: Result<GalleryQuery, GalleryError>) {
        let mut state = self.lock();
        self.epoch.bump();
        state.query = query;
        state.status = GalleryStatus::Idle;
        state.current_page = 1;
    }

    /// Abandon any in-flight hydration without changing the query.
    pub fn supersede(&self) {
        let mut state = self.lock();
        self.epoch.bump();
        if state.status == GalleryStatus::Loading {
            state.status = GalleryStatus::Idle;
        }
    }

    /// Load (from cache or the API) and show page `page` (1-based).
    pub fn hydrate(&self, page: usize) -> Hydration {
        self.run(page, false)
    }

    /// Like [`hydrate`](Self::hydrate) but drops the cached listing first.
    pub fn refresh(&self, page: usize) -> Hydration {
        self.run(page, true)
    }

    fn run(&self, page: usize, force: bool) -> Hydration {
        let (query, token) = {
            let mut state = self.lock();
            if state.status == GalleryStatus::Loading {
                log::debug!("Hydration already in flight, ignoring request for page {}", page);
                return Hydration::Ignored;
            }
            let query = match state.query.clone() {
                Ok(query) => query,
                Err(error) => {
                    let message = error.user_message();
                    state.status = GalleryStatus::Error(message.clone());
                    return Hydration::Failed { message, error };
                }
            };
            state.status = GalleryStatus::Loading;
            (query, self.epoch.token())
        };

        let items = self.load(&query, force, &token);
        self.finish(&query, page, items, &token)
    }

    fn load(
        &self,
        query: &GalleryQuery,
        force: bool,
        token: &CancelToken,
    ) -> Result<Vec<GalleryItem>, GalleryError> {
        let key = cache_key(query);

        if force {
            self.cache.invalidate(&key);
        } else if let Some(items) = self.cache.read(&key) {
            log::debug!("Cache hit for {} ({} items)", query.repository, items.len());
            return Ok(items);
        }

        log::info!(
            "Listing {}@{}:{:?}{}",
            query.repository,
            query.branch,
            query.root_path,
            if query.recursive { " (recursive)" } else { "" }
        );
        let items = ContentLister::new(&self.api).list(query, token)?;
        self.cache.write(&key, &items);
        Ok(items)
    }

    fn finish(
        &self,
        query: &GalleryQuery,
        page: usize,
        items: Result<Vec<GalleryItem>, GalleryError>,
        token: &CancelToken,
    ) -> Hydration {
        let mut state = self.lock();

        if token.is_cancelled() {
            log::debug!("Dropping superseded hydration of {}", query.repository);
            return Hydration::Superseded;
        }

        match items {
            Ok(mut items) => {
                sort_items(&mut items, query.sort);
                let view = paginate(&items, query.page_size, page);
                state.current_page = view.current_page;
                if view.state == PageState::EmptyGallery {
                    state.status = GalleryStatus::Empty;
                    Hydration::Empty
                } else {
                    state.status = GalleryStatus::Ready;
                    Hydration::Ready(view)
                }
            }
            Err(GalleryError::Cancelled) => Hydration::Superseded,
            Err(error) => {
                log::warn!("Failed to hydrate {}: {}", query.repository, error);
                let message = error.user_message();
                state.status = GalleryStatus::Error(message.clone());
                Hydration::Failed { message, error }
            }
        }
    }
}
