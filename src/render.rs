//! Plain-text display of a hydrated gallery.

use std::io::{self, Write};

use crate::gallery::Hydration;
use crate::paginate::{PageState, PageView};

/// Write the outcome of a hydration to `out`.
pub fn render_hydration<W: Write>(
    hydration: &Hydration,
    captions: bool,
    out: &mut W,
) -> io::Result<()> {
    match hydration {
        Hydration::Ready(view) => render_page(view, captions, out),
        Hydration::Empty => writeln!(out, "No images found in this gallery."),
        Hydration::Failed { message, .. } => writeln!(out, "{}", message),
        Hydration::Ignored => writeln!(out, "Gallery is already loading."),
        Hydration::Superseded => writeln!(out, "Gallery load was superseded."),
    }
}

/// Write one page of items followed by a navigation footer.
pub fn render_page<W: Write>(view: &PageView, captions: bool, out: &mut W) -> io::Result<()> {
    match view.state {
        PageState::EmptyGallery => return writeln!(out, "No images found in this gallery."),
        PageState::EmptyPage => {
            writeln!(out, "No images on page {}.", view.current_page)?;
        }
        PageState::Items => {
            let width = view.items.len().to_string().len();
            for (i, item) in view.items.iter().enumerate() {
                writeln!(
                    out,
                    "{:>width$}. {}  ({})",
                    i + 1,
                    item.path,
                    format_size(item.size),
                    width = width
                )?;
                if captions {
                    writeln!(out, "{:>width$}  {}", "", item.caption(), width = width)?;
                }
                writeln!(out, "{:>width$}  {}", "", item.download_url, width = width)?;
            }
        }
    }

    writeln!(out)?;
    write!(
        out,
        "Page {} of {} ({} {})",
        view.current_page,
        view.total_pages,
        view.total_items,
        if view.total_items == 1 { "image" } else { "images" }
    )?;
    if view.has_previous() {
        write!(out, "  [--page {}: previous]", view.current_page - 1)?;
    }
    if view.has_next() {
        write!(out, "  [--page {}: next]", view.current_page + 1)?;
    }
    writeln!(out)
}

/// Human-readable byte count using binary units.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::GalleryError;
    use crate::paginate::paginate;
    use crate::types::GalleryItem;
    use std::num::NonZeroUsize;

    fn item(name: &str, size: u64) -> GalleryItem {
        GalleryItem {
            name: name.to_string(),
            path: format!("img/{}", name),
            size,
            download_url: format!("https://raw.example/img/{}", name),
            html_url: String::new(),
        }
    }

    fn render(h: &Hydration, captions: bool) -> String {
        let mut out = Vec::new();
        render_hydration(h, captions, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn renders_items_and_footer() {
        let items = vec![item("a.png", 2048), item("b.png", 10), item("c.png", 1)];
        let view = paginate(&items, NonZeroUsize::new(2), 1);

        let text = render(&Hydration::Ready(view), false);

        assert!(text.contains("1. img/a.png  (2.0 KiB)"));
        assert!(text.contains("https://raw.example/img/b.png"));
        assert!(!text.contains("c.png"));
        assert!(text.contains("Page 1 of 2 (3 images)"));
        assert!(text.contains("[--page 2: next]"));
        assert!(!text.contains("previous"));
    }

    #[test]
    fn captions_are_optional() {
        let items = vec![item("sunset.jpg", 1)];
        let view = paginate(&items, None, 1);

        let plain = render(&Hydration::Ready(view.clone()), false);
        let captioned = render(&Hydration::Ready(view), true);

        assert!(!plain.contains("  sunset\n"));
        assert!(captioned.contains("  sunset\n"));
        assert!(captioned.contains("(1 image)"));
    }

    #[test]
    fn renders_failures_and_empty_states() {
        let failed = Hydration::Failed {
            message: "GitHub API rate limit exceeded. Try again later.".to_string(),
            error: GalleryError::Cancelled,
        };
        assert_eq!(
            render(&failed, false),
            "GitHub API rate limit exceeded. Try again later.\n"
        );
        assert_eq!(
            render(&Hydration::Empty, false),
            "No images found in this gallery.\n"
        );
    }

    #[test]
    fn empty_page_differs_from_empty_gallery() {
        let view = PageView {
            items: Vec::new(),
            current_page: 4,
            total_pages: 4,
            total_items: 30,
            state: PageState::EmptyPage,
        };
        let text = render(&Hydration::Ready(view), false);
        assert!(text.starts_with("No images on page 4."));
        assert!(text.contains("[--page 3: previous]"));
    }
}
