//! Ordering and page slicing for gallery items.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::num::NonZeroUsize;
use std::str::Chars;

use crate::types::{GalleryItem, SortKey};

/// Compare two strings the way a person would order file names.
///
/// Letters compare case-insensitively, runs of ASCII digits compare by
/// numeric value (`c2` < `c10`), and strings that are equal under those
/// rules fall back to plain byte order so the result is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    compare_chunks(a, b).then_with(|| a.cmp(b))
}

fn compare_chunks(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let lhs = take_digits(&mut left);
                let rhs = take_digits(&mut right);
                let ord = compare_numeric(&lhs, &rhs);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                left.next();
                right.next();
                let ord = fold(x).cmp(&fold(y));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
}

/// Compare digit strings of any length without parsing.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Sort `items` in place. The sort is stable.
pub fn sort_items(items: &mut [GalleryItem], key: SortKey) {
    match key {
        SortKey::NameAsc => items.sort_by(|a, b| by_name(a, b)),
        SortKey::NameDesc => items.sort_by(|a, b| by_name(b, a)),
        SortKey::PathAsc => items.sort_by(|a, b| natural_cmp(&a.path, &b.path)),
        SortKey::PathDesc => items.sort_by(|a, b| natural_cmp(&b.path, &a.path)),
    }
}

fn by_name(a: &GalleryItem, b: &GalleryItem) -> Ordering {
    natural_cmp(&a.name, &b.name).then_with(|| natural_cmp(&a.path, &b.path))
}

/// What a page view holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// The page has at least one item.
    Items,
    /// The gallery itself has no items.
    EmptyGallery,
    /// The gallery has items but none land on this page. [`paginate`] clamps
    /// the page number so it never produces this; it is kept for views
    /// built elsewhere, which renderers still have to handle.
    EmptyPage,
}

/// One page of a sorted gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub items: Vec<GalleryItem>,
    /// 1-based page number actually shown.
    pub current_page: usize,
    pub total_pages: usize,
    /// Number of items across all pages.
    pub total_items: usize,
    pub state: PageState,
}

impl PageView {
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Number of pages for `len` items. Never zero.
pub fn total_pages(len: usize, page_size: Option<NonZeroUsize>) -> usize {
    match page_size {
        Some(size) => len.div_ceil(size.get()).max(1),
        None => 1,
    }
}

/// Slice already-sorted `items` into the page numbered `requested` (1-based).
///
/// Without a page size every item is on page 1. Requests past the end clamp
/// to the last page; page 0 clamps to page 1.
pub fn paginate(
    items: &[GalleryItem],
    page_size: Option<NonZeroUsize>,
    requested: usize,
) -> PageView {
    let total_pages = total_pages(items.len(), page_size);
    let current_page = requested.clamp(1, total_pages);

    let visible: Vec<GalleryItem> = match page_size {
        Some(size) => items
            .iter()
            .skip((current_page - 1) * size.get())
            .take(size.get())
            .cloned()
            .collect(),
        None => items.to_vec(),
    };

    let state = if items.is_empty() {
        PageState::EmptyGallery
    } else if visible.is_empty() {
        PageState::EmptyPage
    } else {
        PageState::Items
    };

    PageView {
        items: visible,
        current_page,
        total_pages,
        total_items: items.len(),
        state,
    }
}
