//! Text rendering for the character list, status line and detail view.
//!
//! Everything here is a pure function of its inputs so it can be tested
//! without a terminal.

use crate::api::Character;
use crate::feed::{FeedMode, FeedState};
use crate::images::SlotImage;
use crate::util::{display_width, single_line, truncate_to_width};
use std::ops::Range;

pub(crate) const LOADING_TEXT: &str = "Loading...";
pub(crate) const EMPTY_TEXT: &str = "No characters found";

/// Narrowest the name column is allowed to get.
const MIN_NAME_WIDTH: usize = 8;

fn human_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        format!("{} KB", bytes / 1024)
    }
}

/// Short marker for the row's thumbnail state.
pub(crate) fn image_marker(character: &Character, image: Option<&SlotImage>) -> String {
    match image {
        Some(SlotImage::Loaded(data)) => format!("[img {}]", human_size(data.len())),
        _ if character.has_image() => "[img ...]".to_string(),
        _ => "[no img]".to_string(),
    }
}

/// One list row: `index  name  [category] n appearances [img]`.
///
/// The name is made single-line and truncated so the row fits `width`
/// columns where possible.
pub(crate) fn format_row(
    index: usize,
    character: &Character,
    image: Option<&SlotImage>,
    width: usize,
) -> String {
    let prefix = format!("{index:>4}  ");
    let suffix = format!(
        "[{}] {} appearances {}",
        character.primary_category(),
        character.total_appearances(),
        image_marker(character, image)
    );
    let budget = width
        .saturating_sub(display_width(&prefix) + display_width(&suffix) + 2)
        .max(MIN_NAME_WIDTH);

    let name = single_line(&character.name);
    let name = truncate_to_width(&name, budget);
    format!("{prefix}{name}  {suffix}")
}

/// Rows for `window`, or the loading/empty line when there is nothing to
/// show. "Loading..." only appears for an initial load; a refresh of a
/// non-empty list keeps showing the old rows.
pub(crate) fn render_rows<'a>(
    feed: &FeedState,
    window: Range<usize>,
    image_for_row: impl Fn(usize) -> Option<&'a SlotImage>,
    width: usize,
) -> Vec<String> {
    if feed.item_count() == 0 {
        let line = if feed.is_loading() {
            LOADING_TEXT
        } else {
            EMPTY_TEXT
        };
        return vec![line.to_string()];
    }

    window
        .filter_map(|row| {
            feed.item_at(row)
                .map(|c| format_row(row, c, image_for_row(row), width))
        })
        .collect()
}

pub(crate) fn status_line(feed: &FeedState) -> String {
    let count = feed.item_count();
    let mut line = match feed.mode() {
        FeedMode::Browse => {
            let mut line = format!(
                "{count} characters, page {}/{}",
                feed.current_page(),
                feed.total_pages()
            );
            if feed.has_more_pages() {
                line.push_str(", more available");
            }
            line
        }
        FeedMode::Search => {
            let query = feed.search_query().unwrap_or_default();
            format!(
                "{count} result{} for \"{}\"",
                if count == 1 { "" } else { "s" },
                single_line(query)
            )
        }
    };
    if feed.is_loading() {
        line.push_str(" (loading)");
    }
    line
}

/// Multi-line breakdown of one character, category by category.
pub(crate) fn render_detail(character: &Character) -> Vec<String> {
    let name = single_line(&character.name);
    let mut lines = vec![
        format!("{name} (#{})", character.id),
        format!(
            "  {} appearances, mostly {}",
            character.total_appearances(),
            character.primary_category()
        ),
    ];
    if let Some(url) = character.source_url.as_deref() {
        lines.push(format!("  source: {}", single_line(url)));
    }
    if let Some(url) = character.image() {
        lines.push(format!("  image:  {}", single_line(url)));
    }
    if let Some(updated) = character.updated_at() {
        lines.push(format!("  updated: {}", updated.format("%Y-%m-%d")));
    }

    for category in character.categories() {
        let n = category.items.len();
        lines.push(format!(
            "  {} ({n} item{})",
            category.title,
            if n == 1 { "" } else { "s" }
        ));
        if category.items.is_empty() {
            lines.push(format!(
                "    {name} doesn't appear in any {}.",
                category.title.to_lowercase()
            ));
        }
        for item in category.items {
            lines.push(format!("    - {}", single_line(item)));
        }
    }
    lines
}
