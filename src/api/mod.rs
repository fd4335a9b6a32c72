//! Remote collection access for the Disney character API.
//!
//! - [`types`] - serde models for characters and the paginated envelope
//! - [`client`] - the HTTP client and the [`CollectionSource`] seam the
//!   feed controller is written against

mod client;
mod types;

pub(crate) use client::read_limited_bytes;
pub use client::{
    CollectionClient, CollectionSource, ErrorKind, FetchError, DEFAULT_BASE_URL,
    DEFAULT_PAGE_SIZE,
};
pub use types::{Category, Character, DetailEnvelope, PageEnvelope, PageInfo, OTHER_CATEGORY};

#[cfg(test)]
pub(crate) use types::fixtures;
