//! Per-row thumbnails.
//!
//! [`ImageLoader`] tracks which URL each visible slot is bound to and
//! drops results that arrive for a binding that has since been replaced.
//! [`HttpImageFetcher`] does the network side with a small LRU cache.

mod fetcher;
mod loader;

pub use fetcher::{
    HttpImageFetcher, ImageData, ImageError, ImageFetcher, DEFAULT_IMAGE_CACHE_ENTRIES,
};
pub use loader::{
    BindingToken, ImageApplied, ImageCompletion, ImageLoader, ImageObserver, SlotId, SlotImage,
};
