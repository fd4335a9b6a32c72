use crate::api::{Character, CollectionSource, FetchError};
use crate::config::Config;
use crate::feed::{FeedController, FeedNotification, SearchDebouncer};
use crate::images::{ImageApplied, ImageFetcher, ImageLoader, SlotId};
use reqwest::redirect::Policy;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Rows shown at once, and the number of image slots they are bound to.
pub const VISIBLE_SLOTS: usize = 10;

const APP_EVENT_CHANNEL_SIZE: usize = 32;

// ============================================================================
// HTTP Client Configuration
// ============================================================================

/// Create a redirect policy with loop detection and limited hops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Shared HTTP client for the API and image fetches.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .user_agent(concat!("charlist/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(timeout)
        .build()
}

// ============================================================================
// Events
// ============================================================================

/// Results of one-off background tasks started by commands.
#[derive(Debug)]
pub enum AppEvent {
    DetailLoaded {
        id: i64,
        result: Result<Character, FetchError>,
    },
    /// A background task panicked.
    TaskPanicked { task: &'static str, error: String },
}

// ============================================================================
// Application State
// ============================================================================

/// Everything the front end loop owns.
///
/// The feed controller, debouncer and image loader are only touched from
/// the loop's task; their notifications arrive on the receivers here.
pub struct App<S: CollectionSource, F: ImageFetcher> {
    pub(crate) source: Arc<S>,
    pub feed: FeedController<S>,
    pub(crate) feed_events: mpsc::UnboundedReceiver<FeedNotification>,
    pub debouncer: SearchDebouncer,
    pub images: ImageLoader<F>,
    pub(crate) image_events: mpsc::UnboundedReceiver<ImageApplied>,
    pub(crate) event_tx: mpsc::Sender<AppEvent>,
    pub(crate) event_rx: mpsc::Receiver<AppEvent>,
    pub(crate) pending_lookups: usize,
    pub list_width: usize,
    window_start: usize,
    /// Row each slot was last bound for.
    slot_rows: [Option<usize>; VISIBLE_SLOTS],
    /// Item count at the previous data update, to spot appended pages.
    pub(crate) last_count: usize,
}

impl<S: CollectionSource, F: ImageFetcher> App<S, F> {
    pub fn new(source: Arc<S>, fetcher: Arc<F>, config: &Config) -> Self {
        let (feed_tx, feed_events) = mpsc::unbounded_channel();
        let (image_tx, image_events) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(APP_EVENT_CHANNEL_SIZE);

        let feed = FeedController::new(Arc::clone(&source), feed_tx)
            .with_page_size(config.page_size)
            .with_prefetch_threshold(config.prefetch_threshold);

        Self {
            source,
            feed,
            feed_events,
            debouncer: SearchDebouncer::new(config.search_debounce()),
            images: ImageLoader::new(fetcher, image_tx),
            image_events,
            event_tx,
            event_rx,
            pending_lookups: 0,
            list_width: config.list_width,
            window_start: 0,
            slot_rows: [None; VISIBLE_SLOTS],
            last_count: 0,
        }
    }

    /// Rows currently shown.
    pub fn window(&self) -> Range<usize> {
        let count = self.feed.item_count();
        let start = self.window_start.min(count);
        start..(start + VISIBLE_SLOTS).min(count)
    }

    pub fn slot_for_row(row: usize) -> SlotId {
        SlotId(row % VISIBLE_SLOTS)
    }

    /// The visible row a slot is currently showing.
    pub fn row_for_slot(&self, slot: SlotId) -> Option<usize> {
        self.window().find(|row| Self::slot_for_row(*row) == slot)
    }

    /// Scroll so `start` is the first visible row.
    ///
    /// Rebinds each slot whose row or image changed and reports every
    /// visible row as displayed, which may start loading the next page.
    /// Slots still showing the same row and URL keep their image.
    pub fn set_window(&mut self, start: usize) {
        self.window_start = start;
        let window = self.window();

        let mut bound = [false; VISIBLE_SLOTS];
        for row in window.clone() {
            let slot = Self::slot_for_row(row);
            bound[slot.0] = true;
            let url = self.feed.item_at(row).and_then(Character::image);
            let unchanged = self.slot_rows[slot.0] == Some(row)
                && self.images.token(slot).is_some()
                && self.images.bound_url(slot) == url;
            if !unchanged {
                self.images.bind(slot, url);
                self.slot_rows[slot.0] = Some(row);
            }
        }
        for (index, used) in bound.iter().enumerate() {
            if !used {
                self.images.unbind(SlotId(index));
                self.slot_rows[index] = None;
            }
        }

        for row in window {
            self.feed.row_displayed(row);
        }
    }

    /// No request, lookup, debounce timer or image fetch is outstanding.
    pub fn is_idle(&self) -> bool {
        !self.feed.is_loading()
            && !self.debouncer.is_pending()
            && self.images.pending() == 0
            && self.pending_lookups == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures::character;
    use crate::feed::testing::StaticSource;
    use crate::images::{ImageData, ImageError};

    /// Fetcher that fails every request without touching the network.
    struct NoImages;

    impl ImageFetcher for NoImages {
        async fn fetch(&self, url: &str) -> Result<ImageData, ImageError> {
            Err(ImageError::InvalidUrl(url.to_string()))
        }
    }

    fn source_with_images(count: i64) -> StaticSource {
        StaticSource::new(
            (1..=count)
                .map(|id| {
                    let mut c = character(id, &format!("Character {id}"));
                    if id % 2 == 0 {
                        c.image_url = Some(format!("https://img.example/{id}.png"));
                    }
                    c
                })
                .collect(),
        )
    }

    fn app(count: i64, page_size: u32) -> App<StaticSource, NoImages> {
        let config = Config {
            page_size,
            ..Config::default()
        };
        App::new(
            Arc::new(source_with_images(count)),
            Arc::new(NoImages),
            &config,
        )
    }

    #[tokio::test]
    async fn test_window_clamped_to_items() {
        let mut app = app(4, 50);
        app.feed.load_first_page();
        app.feed.settle().await;

        app.set_window(0);
        assert_eq!(app.window(), 0..4);
        app.set_window(2);
        assert_eq!(app.window(), 2..4);
        app.set_window(99);
        assert_eq!(app.window(), 4..4);
    }

    #[tokio::test]
    async fn test_set_window_binds_slots() {
        let mut app = app(30, 50);
        app.feed.load_first_page();
        app.feed.settle().await;

        app.set_window(12);
        assert_eq!(app.row_for_slot(SlotId(2)), Some(12));
        assert_eq!(app.row_for_slot(SlotId(1)), Some(21));
        // Row 12 is character 13 (no image), row 13 is character 14
        assert_eq!(app.images.bound_url(SlotId(2)), None);
        assert_eq!(
            app.images.bound_url(SlotId(3)),
            Some("https://img.example/14.png")
        );
    }

    #[tokio::test]
    async fn test_overlapping_window_keeps_unchanged_slots() {
        let mut app = app(30, 50);
        app.feed.load_first_page();
        app.feed.settle().await;

        app.set_window(0);
        let row1 = app.images.token(SlotId(1));
        let row0 = app.images.token(SlotId(0));

        // Same window again: nothing is rebound
        app.set_window(0);
        assert_eq!(app.images.token(SlotId(1)), row1);
        assert_eq!(app.images.token(SlotId(0)), row0);

        // Shift by one: row 1 stays on slot 1, slot 0 now shows row 10
        app.set_window(1);
        assert_eq!(app.images.token(SlotId(1)), row1);
        assert_ne!(app.images.token(SlotId(0)), row0);
        assert_eq!(app.row_for_slot(SlotId(0)), Some(10));
    }

    #[tokio::test]
    async fn test_replaced_items_rebind_slots() {
        let mut app = app(30, 50);
        app.feed.load_first_page();
        app.feed.settle().await;
        app.set_window(0);
        let before = app.images.token(SlotId(1));

        // Only character 20 matches, so row 1 is now empty
        app.feed.search("Character 20");
        app.feed.settle().await;
        app.set_window(0);
        assert_eq!(
            app.images.bound_url(SlotId(0)),
            Some("https://img.example/20.png")
        );
        assert!(before.is_some());
        assert_eq!(app.images.token(SlotId(1)), None);
    }

    #[tokio::test]
    async fn test_short_window_unbinds_spare_slots() {
        let mut app = app(3, 50);
        app.feed.load_first_page();
        app.feed.settle().await;

        app.set_window(0);
        assert!(app.images.token(SlotId(2)).is_some());
        assert!(app.images.token(SlotId(5)).is_none());
    }

    #[tokio::test]
    async fn test_window_near_end_prefetches() {
        let mut app = app(30, 10);
        app.feed.load_first_page();
        app.feed.settle().await;
        assert_eq!(app.feed.item_count(), 10);

        app.set_window(0);
        assert!(app.feed.is_loading());
        app.feed.settle().await;
        assert_eq!(app.feed.item_count(), 20);
    }

    #[tokio::test]
    async fn test_idle_tracking() {
        let mut app = app(3, 50);
        assert!(app.is_idle());
        app.feed.load_first_page();
        assert!(!app.is_idle());
        app.feed.settle().await;
        assert!(app.is_idle());
        app.debouncer.input("Char");
        assert!(!app.is_idle());
    }
}
