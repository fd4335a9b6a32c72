use crate::images::fetcher::{ImageData, ImageError, ImageFetcher};
use crate::util::catch_task_panic;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const COMPLETION_CHANNEL_SIZE: usize = 64;

/// A reusable display slot (a visible row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

/// Identifies one binding of a slot. Issued from a counter that only moves
/// forward, so two bindings never share a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingToken(u64);

/// What a slot currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotImage {
    Placeholder,
    Loaded(ImageData),
}

impl SlotImage {
    pub fn is_loaded(&self) -> bool {
        matches!(self, SlotImage::Loaded(_))
    }
}

/// Told whenever a slot's displayed image changes.
pub trait ImageObserver: Send {
    fn image_applied(&mut self, slot: SlotId, image: &SlotImage);
}

/// Channel form of [`ImageObserver`] callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageApplied {
    pub slot: SlotId,
    pub loaded: bool,
}

impl ImageObserver for mpsc::UnboundedSender<ImageApplied> {
    fn image_applied(&mut self, slot: SlotId, image: &SlotImage) {
        let applied = ImageApplied {
            slot,
            loaded: image.is_loaded(),
        };
        if let Err(e) = self.send(applied) {
            tracing::debug!(error = %e, "Image notification dropped (receiver gone)");
        }
    }
}

/// Fetch outcome for one binding.
#[derive(Debug)]
pub struct ImageCompletion {
    slot: SlotId,
    token: BindingToken,
    url: String,
    result: Result<ImageData, ImageError>,
}

struct Binding {
    token: BindingToken,
    url: Option<String>,
    image: SlotImage,
    fetch: Option<JoinHandle<()>>,
}

/// Binds display slots to image URLs and fills them in as fetches finish.
///
/// Rebinding a slot cancels its previous fetch and issues a fresh token.
/// A completion is only applied if its token is still the slot's current
/// one, so a recycled row never shows the image of what it displayed
/// before. Fetch failures leave the placeholder in place.
pub struct ImageLoader<F: ImageFetcher> {
    fetcher: Arc<F>,
    slots: HashMap<SlotId, Binding>,
    next_token: u64,
    observer: Box<dyn ImageObserver>,
    completion_tx: mpsc::Sender<ImageCompletion>,
    completion_rx: mpsc::Receiver<ImageCompletion>,
}

impl<F: ImageFetcher> ImageLoader<F> {
    pub fn new(fetcher: Arc<F>, observer: impl ImageObserver + 'static) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_CHANNEL_SIZE);
        Self {
            fetcher,
            slots: HashMap::new(),
            next_token: 0,
            observer: Box::new(observer),
            completion_tx,
            completion_rx,
        }
    }

    /// Bind `slot` to `url`, replacing whatever it was bound to.
    ///
    /// The slot shows the placeholder immediately. With no URL nothing is
    /// fetched.
    pub fn bind(&mut self, slot: SlotId, url: Option<&str>) -> BindingToken {
        self.cancel(slot);

        self.next_token += 1;
        let token = BindingToken(self.next_token);
        let url = url.filter(|u| !u.is_empty()).map(str::to_string);

        let fetch = url.as_ref().map(|url| {
            let fetcher = Arc::clone(&self.fetcher);
            let tx = self.completion_tx.clone();
            let url = url.clone();
            tracing::trace!(slot = slot.0, token = token.0, url = %url, "Fetching image");
            tokio::spawn(async move {
                let result = catch_task_panic(fetcher.fetch(&url))
                    .await
                    .unwrap_or_else(|error| Err(ImageError::Panicked(error)));
                let completion = ImageCompletion {
                    slot,
                    token,
                    url,
                    result,
                };
                if let Err(e) = tx.send(completion).await {
                    tracing::debug!(error = %e, "Image loader gone, dropping completion");
                }
            })
        });

        self.slots.insert(
            slot,
            Binding {
                token,
                url,
                image: SlotImage::Placeholder,
                fetch,
            },
        );
        self.observer.image_applied(slot, &SlotImage::Placeholder);
        token
    }

    /// Release `slot`: cancel its fetch and clear it to the placeholder.
    pub fn unbind(&mut self, slot: SlotId) {
        self.cancel(slot);
        if self.slots.remove(&slot).is_some() {
            self.observer.image_applied(slot, &SlotImage::Placeholder);
        }
    }

    pub fn image(&self, slot: SlotId) -> Option<&SlotImage> {
        self.slots.get(&slot).map(|b| &b.image)
    }

    pub fn bound_url(&self, slot: SlotId) -> Option<&str> {
        self.slots.get(&slot).and_then(|b| b.url.as_deref())
    }

    pub fn token(&self, slot: SlotId) -> Option<BindingToken> {
        self.slots.get(&slot).map(|b| b.token)
    }

    /// Number of fetches still running.
    pub fn pending(&self) -> usize {
        self.slots.values().filter(|b| b.fetch.is_some()).count()
    }

    /// Wait for the next fetch to finish. Cancel-safe.
    pub async fn next_completion(&mut self) -> Option<ImageCompletion> {
        self.completion_rx.recv().await
    }

    /// Apply a completion if its binding is still current.
    ///
    /// Returns whether the slot's image changed.
    pub fn apply(&mut self, completion: ImageCompletion) -> bool {
        let ImageCompletion {
            slot,
            token,
            url,
            result,
        } = completion;

        let Some(binding) = self.slots.get_mut(&slot) else {
            tracing::trace!(slot = slot.0, url = %url, "Image for unbound slot discarded");
            return false;
        };
        if binding.token != token {
            tracing::trace!(
                slot = slot.0,
                token = token.0,
                current = binding.token.0,
                "Stale image discarded"
            );
            return false;
        }
        binding.fetch = None;

        match result {
            Ok(image) => {
                binding.image = SlotImage::Loaded(image);
                self.observer.image_applied(slot, &binding.image);
                true
            }
            Err(e) => {
                tracing::debug!(slot = slot.0, url = %url, error = %e, "Image fetch failed");
                false
            }
        }
    }

    /// Process completions until no fetch is running.
    pub async fn settle(&mut self) {
        while self.pending() > 0 {
            match self.next_completion().await {
                Some(completion) => {
                    self.apply(completion);
                }
                None => break,
            }
        }
    }

    fn cancel(&mut self, slot: SlotId) {
        if let Some(handle) = self.slots.get_mut(&slot).and_then(|b| b.fetch.take()) {
            handle.abort();
        }
    }
}

impl<F: ImageFetcher> Drop for ImageLoader<F> {
    fn drop(&mut self) {
        for binding in self.slots.values_mut() {
            if let Some(handle) = binding.fetch.take() {
                handle.abort();
            }
        }
    }
}
