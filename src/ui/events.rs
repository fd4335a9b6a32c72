//! Handling of feed, image and background-task notifications.

use crate::api::CollectionSource;
use crate::app::{App, AppEvent};
use crate::feed::{FeedMode, FeedNotification};
use crate::images::{ImageApplied, ImageFetcher};
use std::io::Write;

use super::helpers::write_window;
use super::render::{format_row, render_detail, LOADING_TEXT};

/// React to one controller notification.
pub(super) fn handle_feed_notification<S, F, W>(
    app: &mut App<S, F>,
    notification: FeedNotification,
    out: &mut W,
) -> std::io::Result<()>
where
    S: CollectionSource,
    F: ImageFetcher,
    W: Write,
{
    match notification {
        FeedNotification::LoadingChanged {
            is_loading: true,
            item_count: 0,
        } => {
            writeln!(out, "{LOADING_TEXT}")?;
        }
        FeedNotification::LoadingChanged {
            is_loading,
            item_count,
        } => {
            // Background refresh of a non-empty list: keep showing it
            tracing::trace!(is_loading, item_count, "Loading state changed");
        }
        FeedNotification::DataUpdated { item_count } => {
            let feed = app.feed.state();
            let appended = feed.mode() == FeedMode::Browse
                && feed.current_page() > 1
                && item_count > app.last_count;
            let start = if appended { app.last_count } else { 0 };
            app.last_count = item_count;

            app.set_window(start);
            write_window(app, out)?;
        }
        FeedNotification::ErrorOccurred { kind, message } => {
            tracing::debug!(?kind, "Reporting feed error");
            writeln!(out, "Error: {message}")?;
        }
    }
    Ok(())
}

/// Reprint a row whose thumbnail finished loading.
pub(super) fn handle_image_applied<S, F, W>(
    app: &App<S, F>,
    applied: ImageApplied,
    out: &mut W,
) -> std::io::Result<()>
where
    S: CollectionSource,
    F: ImageFetcher,
    W: Write,
{
    if !applied.loaded {
        return Ok(());
    }
    let Some(row) = app.row_for_slot(applied.slot) else {
        return Ok(());
    };
    if let Some(character) = app.feed.item_at(row) {
        let line = format_row(
            row,
            character,
            app.images.image(applied.slot),
            app.list_width,
        );
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Handle a result from a one-off background task.
pub(super) fn handle_app_event<S, F, W>(
    app: &mut App<S, F>,
    event: AppEvent,
    out: &mut W,
) -> std::io::Result<()>
where
    S: CollectionSource,
    F: ImageFetcher,
    W: Write,
{
    app.pending_lookups = app.pending_lookups.saturating_sub(1);
    match event {
        AppEvent::DetailLoaded {
            id,
            result: Ok(character),
        } => {
            tracing::debug!(id, "Detail loaded");
            for line in render_detail(&character) {
                writeln!(out, "{line}")?;
            }
        }
        AppEvent::DetailLoaded {
            id,
            result: Err(e),
        } => {
            tracing::warn!(id, error = %e, "Detail lookup failed");
            writeln!(out, "Error: #{id}: {e}")?;
        }
        AppEvent::TaskPanicked { task, error } => {
            writeln!(out, "Error: {task} task failed: {error}")?;
        }
    }
    Ok(())
}
