//! The character feed: one list, three ways to fill it.
//!
//! - **Browse**: page 1 via `load_first_page`, more via `load_next_page`
//! - **Search**: a single unpaginated result set that replaces the list
//! - **Refresh**: re-run whichever of the two is showing
//!
//! # Architecture
//!
//! - [`controller`] - owns [`FeedState`], spawns requests, applies their
//!   completions and notifies a [`FeedObserver`]
//! - [`state`] - the observable list, page cursor and loading flag
//! - [`debounce`] - coalesces search-box edits before they reach the controller
//!
//! All mutation happens on the task that owns the controller; requests
//! run on spawned tasks and report back through a channel, tagged with a
//! generation counter so stale results are dropped.

mod controller;
mod debounce;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
    Completion, FeedController, FeedNotification, FeedObserver, DEFAULT_PREFETCH_THRESHOLD,
};
pub use debounce::{SearchDebouncer, DEFAULT_SEARCH_DEBOUNCE};
pub use state::{FeedMode, FeedState};
