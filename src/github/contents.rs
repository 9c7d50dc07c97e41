//! Wire types for the GitHub contents API.
//!
//! `GET /repos/{owner}/{repo}/contents/{path}` answers with an array of
//! descriptors when `path` is a directory and with a single descriptor when
//! it is a file.

use serde::Deserialize;

/// Kind of a contents entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
    Symlink,
    Submodule,
    /// Anything GitHub adds later. Never traversed, never displayed.
    #[serde(other)]
    Other,
}

/// One descriptor from a contents listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub sha: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListingPayload {
    Many(Vec<ContentEntry>),
    One(Box<ContentEntry>),
}

/// Parse a contents response body into a flat list of entries.
pub fn parse_listing(body: &str) -> Result<Vec<ContentEntry>, serde_json::Error> {
    match serde_json::from_str::<ListingPayload>(body)? {
        ListingPayload::Many(entries) => Ok(entries),
        ListingPayload::One(entry) => Ok(vec![*entry]),
    }
}

/// Body of a GitHub error response, e.g. `{"message": "Not Found"}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    pub message: String,
}
