//! Line-oriented terminal front end.
//!
//! Reads commands from stdin and prints the character list to stdout.
//!
//! # Module Structure
//!
//! - `loop_runner` - main event loop and the one-shot mode
//! - `input` - command parsing and dispatch
//! - `events` - feed, image and background task notifications
//! - `render` - row, status and detail formatting
//! - `helpers` - detail lookups, opening links, shared printing
//! - `help` - command reference

mod events;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod render;

pub use input::{parse_command, Command};
pub use loop_runner::{run, run_once, Action};
