//! Utility functions for common operations.
//!
//! - **Text**: display-width measurement and truncation, control-sequence
//!   stripping for API-supplied strings
//! - **URL validation**: checks before opening links or using an endpoint
//! - **Tasks**: panic capture for spawned work
//!
//! # Examples
//!
//! ```
//! use charlist::util::{single_line, truncate_to_width, validate_url};
//!
//! let name = single_line("Mickey\nMouse");
//! assert_eq!(truncate_to_width(&name, 8), "Micke...");
//! assert!(validate_url("https://disney.fandom.com/wiki/Mickey_Mouse").is_ok());
//! ```

mod task;
mod text;
mod url_validator;

pub(crate) use task::catch_task_panic;
pub use text::{display_width, single_line, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_base_url, validate_url, UrlValidationError};
