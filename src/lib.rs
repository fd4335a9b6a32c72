//! Browse and search the Disney character API from the terminal.
//!
//! - [`api`] - HTTP client and wire types for the character collection
//! - [`feed`] - paginated, searchable list with one request in flight at a time
//! - [`images`] - per-row thumbnails that never show a recycled row's image
//! - [`ui`] - the command loop driving all of the above

pub mod api;
pub mod app;
pub mod config;
pub mod feed;
pub mod images;
pub mod ui;
pub mod util;
