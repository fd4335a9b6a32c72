//! Helper functions shared by the command and event handlers.

use crate::api::CollectionSource;
use crate::app::{App, AppEvent};
use crate::images::ImageFetcher;
use crate::util::{catch_task_panic, validate_url};
use std::io::Write;
use std::sync::Arc;

use super::render::{render_rows, status_line};

/// Look up one character by id off the loop. The answer arrives as
/// [`AppEvent::DetailLoaded`].
pub(super) fn spawn_detail_lookup<S: CollectionSource, F: ImageFetcher>(
    app: &mut App<S, F>,
    id: i64,
) {
    let source = Arc::clone(&app.source);
    let tx = app.event_tx.clone();
    app.pending_lookups += 1;

    tracing::debug!(id, "Spawning detail lookup");

    tokio::spawn(async move {
        let event = match catch_task_panic(source.fetch_by_id(id)).await {
            Ok(result) => AppEvent::DetailLoaded { id, result },
            Err(error) => {
                tracing::error!(id, error = %error, "Detail lookup panicked");
                AppEvent::TaskPanicked {
                    task: "detail",
                    error,
                }
            }
        };
        if let Err(e) = tx.send(event).await {
            tracing::debug!(id, error = %e, "Failed to send detail result (receiver dropped)");
        }
    });
}

/// Open row `row`'s source page in the system browser.
///
/// Returns the opened URL, or a message for the user.
pub(super) fn open_row<S: CollectionSource, F: ImageFetcher>(
    app: &App<S, F>,
    row: usize,
) -> Result<String, String> {
    let character = app
        .feed
        .item_at(row)
        .ok_or_else(|| format!("No row {row}"))?;
    let url = character
        .source_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| format!("{} has no source page", character.name))?;

    // Validate before handing anything from the API to the OS launcher
    let url = validate_url(url).map_err(|e| format!("Refusing to open link: {e}"))?;
    open::that(url.as_str()).map_err(|e| format!("Failed to open browser: {e}"))?;
    tracing::debug!(row, url = %url, "Opened source page");
    Ok(url.to_string())
}

/// Print the status line and the visible rows.
pub(super) fn write_window<S, F, W>(app: &App<S, F>, out: &mut W) -> std::io::Result<()>
where
    S: CollectionSource,
    F: ImageFetcher,
    W: Write,
{
    let feed = app.feed.state();
    if feed.item_count() > 0 {
        writeln!(out, "{}", status_line(feed))?;
    }
    let rows = render_rows(
        feed,
        app.window(),
        |row| app.images.image(App::<S, F>::slot_for_row(row)),
        app.list_width,
    );
    for line in rows {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
