//! GitHub contents API access

mod client;
mod contents;

pub use client::{
    ContentsApi, DEFAULT_TIMEOUT, FetchError, GitHubClient, RateLimitStatus, api_base,
    contents_url, minutes_until,
};
pub use contents::{ContentEntry, EntryType, parse_listing};

pub(crate) use client::listing_or_empty;
