//! Command parsing and dispatch for the line-oriented front end.

use crate::api::CollectionSource;
use crate::app::App;
use crate::images::ImageFetcher;
use anyhow::Result;
use std::io::Write;

use super::help::help_lines;
use super::helpers::{open_row, spawn_detail_lookup, write_window};
use super::Action;

/// Longest search text accepted from the prompt.
pub(crate) const MAX_SEARCH_QUERY_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search box edit; an empty string clears the search.
    SearchText(String),
    More,
    Show(usize),
    Reload,
    Detail(i64),
    Open(usize),
    Help,
    Quit,
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    // Search text is taken verbatim apart from the line ending
    if let Some(text) = line.trim_end_matches(['\r', '\n']).strip_prefix('/') {
        if text.chars().count() > MAX_SEARCH_QUERY_LENGTH {
            return Err(format!(
                "Search query too long (max {MAX_SEARCH_QUERY_LENGTH} chars)"
            ));
        }
        return Ok(Some(Command::SearchText(text.to_string())));
    }

    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("Too many arguments for '{word}'"));
    }

    let command = match (word, arg) {
        ("more" | "n", None) => Command::More,
        ("reload" | "r", None) => Command::Reload,
        ("help" | "?", None) => Command::Help,
        ("quit" | "q" | "exit", None) => Command::Quit,
        ("show", Some(n)) => Command::Show(parse_number(n)?),
        ("open", Some(n)) => Command::Open(parse_number(n)?),
        ("detail", Some(id)) => Command::Detail(
            id.parse()
                .map_err(|_| format!("'{id}' is not a character id"))?,
        ),
        ("show" | "open" | "detail", None) => {
            return Err(format!("'{word}' needs an argument"));
        }
        _ => return Err(format!("Unknown command '{word}' (try 'help')")),
    };
    Ok(Some(command))
}

fn parse_number(s: &str) -> Result<usize, String> {
    s.parse().map_err(|_| format!("'{s}' is not a row number"))
}

/// Run one command against the app, writing any immediate output.
pub(super) fn handle_command<S, F, W>(
    app: &mut App<S, F>,
    command: Command,
    out: &mut W,
) -> Result<Action>
where
    S: CollectionSource,
    F: ImageFetcher,
    W: Write,
{
    match command {
        Command::SearchText(text) => {
            tracing::trace!(text = %text, "Search text changed");
            app.debouncer.input(text);
        }
        Command::More => {
            if !app.feed.load_next_page() {
                let reason = if app.feed.is_loading() {
                    "Already loading"
                } else {
                    "Nothing more to load"
                };
                writeln!(out, "{reason}")?;
            }
        }
        Command::Show(row) => {
            if row >= app.feed.item_count() {
                writeln!(out, "No row {row} ({} loaded)", app.feed.item_count())?;
            } else {
                app.set_window(row);
                write_window(app, out)?;
            }
        }
        Command::Reload => {
            if !app.feed.refresh() {
                writeln!(out, "Already loading")?;
            }
        }
        Command::Detail(id) => {
            spawn_detail_lookup(app, id);
            writeln!(out, "Looking up #{id}...")?;
        }
        Command::Open(row) => match open_row(app, row) {
            Ok(url) => writeln!(out, "Opened {url}")?,
            Err(message) => writeln!(out, "{message}")?,
        },
        Command::Help => {
            for line in help_lines() {
                writeln!(out, "{line}")?;
            }
        }
        Command::Quit => return Ok(Action::Quit),
    }
    Ok(Action::Continue)
}
