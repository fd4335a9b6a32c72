//! Main event loop for the front end.
//!
//! Multiplexes input lines, feed completions, debounced search text, image
//! completions and background task results on one task, so every piece of
//! feed and image state has a single owner.

use crate::api::CollectionSource;
use crate::app::App;
use crate::feed::FeedNotification;
use crate::images::ImageFetcher;
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::events::{handle_app_event, handle_feed_notification, handle_image_applied};
use super::input::{handle_command, parse_command};
use super::render::{render_rows, status_line};

/// Result of handling a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep reading commands.
    Continue,
    /// Leave the loop.
    Quit,
}

/// Runs the interactive loop until `quit`, a signal, or end of input.
///
/// On end of input the loop keeps going until outstanding work (requests,
/// a pending debounced search, image fetches, lookups) has finished, so
/// piped command scripts see every result.
pub async fn run<S, F, R, W>(app: &mut App<S, F>, input: R, out: &mut W) -> Result<()>
where
    S: CollectionSource,
    F: ImageFetcher,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut input_open = true;

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        // Drain notifications produced by the last step before waiting again
        drain_notifications(app, out)?;
        out.flush()?;

        if !input_open && app.is_idle() {
            tracing::debug!("Input closed and nothing pending, exiting");
            break;
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down");
                break;
            }

            Some(done) = app.feed.next_completion() => {
                app.feed.apply(done);
            }

            Some(event) = app.event_rx.recv() => {
                handle_app_event(app, event, out)?;
            }

            text = app.debouncer.fired() => {
                app.feed.search(&text);
            }

            Some(done) = app.images.next_completion() => {
                app.images.apply(done);
            }

            line = lines.next_line(), if input_open => {
                match line.context("Failed to read input")? {
                    Some(line) => match parse_command(&line) {
                        Ok(Some(command)) => {
                            if handle_command(app, command, out)? == Action::Quit {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(message) => writeln!(out, "{message}")?,
                    },
                    None => input_open = false,
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// Wait for whatever the caller started (first page or a search), print
/// the whole list once, and return.
///
/// A failed request becomes an error so the process exits non-zero.
pub async fn run_once<S, F, W>(app: &mut App<S, F>, out: &mut W) -> Result<()>
where
    S: CollectionSource,
    F: ImageFetcher,
    W: Write,
{
    app.feed.settle().await;

    while let Ok(notification) = app.feed_events.try_recv() {
        if let FeedNotification::ErrorOccurred { kind, message } = notification {
            anyhow::bail!("{message} ({kind:?})");
        }
    }

    let feed = app.feed.state();
    if feed.item_count() > 0 {
        writeln!(out, "{}", status_line(feed))?;
    }
    for line in render_rows(feed, 0..feed.item_count(), |_| None, app.list_width) {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

fn drain_notifications<S, F, W>(app: &mut App<S, F>, out: &mut W) -> Result<()>
where
    S: CollectionSource,
    F: ImageFetcher,
    W: Write,
{
    while let Ok(notification) = app.feed_events.try_recv() {
        handle_feed_notification(app, notification, out)?;
    }
    while let Ok(applied) = app.image_events.try_recv() {
        handle_image_applied(app, applied, out)?;
    }
    Ok(())
}
