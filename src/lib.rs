//! Image galleries backed by GitHub repository contents.
//!
//! A gallery is a directory in a repository. [`Gallery`] lists it through
//! the contents API (optionally recursing), keeps the listing in a
//! TTL-bound cache, and serves it back sorted and paginated.

pub mod cache;
pub mod cancel;
pub mod config;
pub mod gallery;
pub mod github;
pub mod lister;
pub mod paginate;
pub mod render;
pub mod types;

pub use gallery::{Gallery, GalleryError, GalleryStatus, Hydration};
pub use types::{GalleryItem, GalleryQuery, SortKey};
