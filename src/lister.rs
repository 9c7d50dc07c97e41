//! Breadth-first walk over a repository directory collecting images.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::cancel::CancelToken;
use crate::github::{ContentEntry, ContentsApi, EntryType, FetchError};
use crate::types::{GalleryItem, GalleryQuery};

/// File extensions recognized as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "bmp"];

/// Errors returned by a traversal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// A listing request failed. The traversal stops at the first failure.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The token was cancelled before the traversal finished.
    #[error("listing cancelled")]
    Cancelled,
}

/// Returns true if `name` ends in a recognized image extension.
pub fn is_image(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => IMAGE_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

/// Walks the directory tree named by a [`GalleryQuery`].
pub struct ContentLister<'a, C: ContentsApi> {
    api: &'a C,
}

impl<'a, C: ContentsApi> ContentLister<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self { api }
    }

    /// Collect every image under `query.root_path`.
    ///
    /// One request per directory, issued sequentially. Subdirectories are
    /// followed only when `query.recursive` is set. Items come back in
    /// discovery order.
    pub fn list(
        &self,
        query: &GalleryQuery,
        cancel: &CancelToken,
    ) -> Result<Vec<GalleryItem>, ListError> {
        let mut queue = VecDeque::from([query.root_path.clone()]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_files: HashSet<String> = HashSet::new();
        let mut items = Vec::new();

        while let Some(dir) = queue.pop_front() {
            if !visited.insert(dir.clone()) {
                continue;
            }
            if cancel.is_cancelled() {
                log::debug!("Listing of {} cancelled before {:?}", query.repository, dir);
                return Err(ListError::Cancelled);
            }

            let entries = self.api.list_dir(query, &dir)?;
            log::debug!(
                "Listed {}:{:?} ({} entries)",
                query.repository,
                dir,
                entries.len()
            );

            for entry in entries {
                match entry.entry_type {
                    EntryType::Dir if query.recursive => {
                        if !visited.contains(&entry.path) {
                            queue.push_back(entry.path);
                        }
                    }
                    EntryType::File => {
                        if seen_files.contains(&entry.path) {
                            continue;
                        }
                        if let Some(item) = to_item(entry) {
                            seen_files.insert(item.path.clone());
                            items.push(item);
                        }
                    }
                    _ => {}
                }
            }
        }

        log::debug!(
            "Found {} images in {} ({} directories)",
            items.len(),
            query.repository,
            visited.len()
        );
        Ok(items)
    }
}

fn to_item(entry: ContentEntry) -> Option<GalleryItem> {
    if !is_image(&entry.name) {
        return None;
    }
    let Some(download_url) = entry.download_url else {
        log::debug!("Skipping {}: no download url", entry.path);
        return None;
    };
    Some(GalleryItem {
        name: entry.name,
        path: entry.path,
        size: entry.size,
        download_url,
        html_url: entry.html_url.unwrap_or_default(),
    })
}
