use crate::api::{CollectionSource, ErrorKind, FetchError, PageEnvelope, DEFAULT_PAGE_SIZE};
use crate::feed::state::{FeedMode, FeedState};
use crate::util::catch_task_panic;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Rows from the end of the list that trigger loading the next page.
pub const DEFAULT_PREFETCH_THRESHOLD: usize = 5;

/// Capacity of the completion channel. At most one request is live at a
/// time, so this only has to absorb completions from superseded tasks.
const COMPLETION_CHANNEL_SIZE: usize = 8;

// ============================================================================
// Observer
// ============================================================================

/// Receives the controller's three notification kinds.
///
/// Callbacks run after the state change is committed, so `feed` is
/// always consistent. Whether a loading transition is an initial load or
/// a background refresh is up to the observer (`feed.item_count() == 0`).
pub trait FeedObserver: Send {
    fn data_updated(&mut self, feed: &FeedState);
    fn loading_changed(&mut self, is_loading: bool, feed: &FeedState);
    fn error_occurred(&mut self, error: &FetchError, feed: &FeedState);
}

/// Notification forwarded over a channel by the [`FeedObserver`] impl on
/// `mpsc::UnboundedSender<FeedNotification>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedNotification {
    DataUpdated { item_count: usize },
    LoadingChanged { is_loading: bool, item_count: usize },
    ErrorOccurred { kind: ErrorKind, message: String },
}

impl FeedObserver for mpsc::UnboundedSender<FeedNotification> {
    fn data_updated(&mut self, feed: &FeedState) {
        forward(
            self,
            FeedNotification::DataUpdated {
                item_count: feed.item_count(),
            },
        );
    }

    fn loading_changed(&mut self, is_loading: bool, feed: &FeedState) {
        forward(
            self,
            FeedNotification::LoadingChanged {
                is_loading,
                item_count: feed.item_count(),
            },
        );
    }

    fn error_occurred(&mut self, error: &FetchError, _feed: &FeedState) {
        forward(
            self,
            FeedNotification::ErrorOccurred {
                kind: error.kind(),
                message: error.to_string(),
            },
        );
    }
}

fn forward(tx: &mpsc::UnboundedSender<FeedNotification>, notification: FeedNotification) {
    if let Err(e) = tx.send(notification) {
        tracing::debug!(error = %e, "Feed notification dropped (receiver gone)");
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Request {
    FirstPage,
    NextPage { page: u32 },
    Search { query: String },
}

impl Request {
    fn label(&self) -> &'static str {
        match self {
            Request::FirstPage => "first_page",
            Request::NextPage { .. } => "next_page",
            Request::Search { .. } => "search",
        }
    }
}

/// Result of a background request, to be handed back to
/// [`FeedController::apply`] on the controller's own task.
#[derive(Debug)]
pub struct Completion {
    generation: u64,
    request: Request,
    result: Result<PageEnvelope, FetchError>,
}

struct InFlight {
    generation: u64,
    request: Request,
    handle: JoinHandle<()>,
}

// ============================================================================
// Controller
// ============================================================================

/// Owns the feed and serializes the requests that change it.
///
/// Network calls run on spawned tasks and come back as [`Completion`]s.
/// The owner drives the controller from one task:
///
/// ```ignore
/// tokio::select! {
///     Some(done) = controller.next_completion() => controller.apply(done),
///     // ... other event sources
/// }
/// ```
///
/// Every request carries a generation number; completions whose
/// generation is no longer current are discarded, so a superseded search
/// can never overwrite a newer result.
pub struct FeedController<S: CollectionSource> {
    source: Arc<S>,
    page_size: u32,
    prefetch_threshold: usize,
    state: FeedState,
    observer: Box<dyn FeedObserver>,
    generation: u64,
    in_flight: Option<InFlight>,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
}

impl<S: CollectionSource> FeedController<S> {
    pub fn new(source: Arc<S>, observer: impl FeedObserver + 'static) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_CHANNEL_SIZE);
        Self {
            source,
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            state: FeedState::default(),
            observer: Box::new(observer),
            generation: 0,
            in_flight: None,
            completion_tx,
            completion_rx,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_prefetch_threshold(mut self, threshold: usize) -> Self {
        self.prefetch_threshold = threshold;
        self
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn item_count(&self) -> usize {
        self.state.item_count()
    }

    pub fn item_at(&self, index: usize) -> Option<&crate::api::Character> {
        self.state.item_at(index)
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn has_more_pages(&self) -> bool {
        self.state.has_more_pages()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Reload the browse listing from page 1.
    ///
    /// Returns `false` (and does nothing) while any request is in flight.
    pub fn load_first_page(&mut self) -> bool {
        if self.state.is_loading() {
            tracing::debug!("load_first_page ignored: request in flight");
            return false;
        }
        self.start(Request::FirstPage);
        true
    }

    /// Append the next browse page.
    ///
    /// No-op while loading, in search mode, or on the last page. The page
    /// cursor only advances when the page arrives, so a failed load can be
    /// retried and will request the same page again.
    pub fn load_next_page(&mut self) -> bool {
        if self.state.is_loading() || !self.state.has_more_pages() {
            tracing::debug!(
                loading = self.state.is_loading(),
                has_more = self.state.has_more_pages(),
                "load_next_page ignored"
            );
            return false;
        }
        let page = self.state.current_page().saturating_add(1);
        self.start(Request::NextPage { page });
        true
    }

    /// Replace the feed with the characters matching `name`.
    ///
    /// An empty name falls back to [`load_first_page`](Self::load_first_page).
    /// A new search supersedes whatever request is in flight; an empty name
    /// only supersedes an in-flight search.
    pub fn search(&mut self, name: &str) -> bool {
        if name.is_empty() {
            if matches!(self.in_flight_request(), Some(Request::Search { .. })) {
                self.cancel_in_flight();
                self.start(Request::FirstPage);
                return true;
            }
            return self.load_first_page();
        }

        self.cancel_in_flight();
        self.start(Request::Search {
            query: name.to_string(),
        });
        true
    }

    /// Pull-to-refresh: re-run the current search, or reload page 1.
    pub fn refresh(&mut self) -> bool {
        match (self.state.mode(), self.state.search_query()) {
            (FeedMode::Search, Some(query)) if !query.is_empty() => {
                let query = query.to_string();
                self.search(&query)
            }
            _ => self.load_first_page(),
        }
    }

    /// Tell the controller that row `index` became visible.
    ///
    /// Loads the next page once a row within `prefetch_threshold` of the
    /// end is shown. Returns whether a load was started.
    pub fn row_displayed(&mut self, index: usize) -> bool {
        let count = self.state.item_count();
        if index >= count {
            return false;
        }
        let trigger = count.saturating_sub(self.prefetch_threshold);
        if index >= trigger && self.state.has_more_pages() && !self.state.is_loading() {
            tracing::debug!(index, count, "Near end of list, loading more");
            return self.load_next_page();
        }
        false
    }

    /// Wait for the next background completion.
    ///
    /// Never resolves while nothing is in flight, which makes it safe to
    /// poll from a `select!` loop. Cancel-safe.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completion_rx.recv().await
    }

    /// Commit a completion and notify the observer.
    pub fn apply(&mut self, completion: Completion) {
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == completion.generation);
        if !current {
            tracing::debug!(
                generation = completion.generation,
                latest = self.generation,
                request = completion.request.label(),
                "Discarding stale completion"
            );
            return;
        }
        self.in_flight = None;

        let Completion {
            generation,
            request,
            result,
        } = completion;

        match result {
            Ok(envelope) => {
                let PageEnvelope { info, data } = envelope;
                let received = data.len();
                match request {
                    Request::FirstPage => {
                        self.state
                            .commit_first_page(data, info.total_pages_or_default());
                    }
                    Request::NextPage { page } => {
                        self.state.commit_next_page(page, data, info.total_pages);
                    }
                    Request::Search { query } => {
                        self.state.commit_search(query, data);
                    }
                }
                tracing::debug!(
                    generation,
                    received,
                    total = self.state.item_count(),
                    page = self.state.current_page(),
                    has_more = self.state.has_more_pages(),
                    "Feed updated"
                );
                self.set_loading(false);
                self.observer.data_updated(&self.state);
            }
            Err(e) => {
                tracing::warn!(
                    generation,
                    request = request.label(),
                    error = %e,
                    "Feed request failed"
                );
                self.set_loading(false);
                self.observer.error_occurred(&e, &self.state);
            }
        }
    }

    /// Process completions until no request is in flight.
    pub async fn settle(&mut self) {
        while self.in_flight.is_some() {
            match self.next_completion().await {
                Some(completion) => self.apply(completion),
                None => break,
            }
        }
    }

    fn in_flight_request(&self) -> Option<&Request> {
        self.in_flight.as_ref().map(|f| &f.request)
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
            tracing::debug!(
                generation = in_flight.generation,
                request = in_flight.request.label(),
                "Superseded in-flight request"
            );
        }
    }

    fn start(&mut self, request: Request) {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let source = Arc::clone(&self.source);
        let tx = self.completion_tx.clone();
        let page_size = self.page_size;
        let task_request = request.clone();

        tracing::debug!(generation, request = request.label(), "Spawning feed request");

        let handle = tokio::spawn(async move {
            let fetch = async {
                match &task_request {
                    Request::FirstPage => source.fetch_page(1, page_size).await,
                    Request::NextPage { page } => source.fetch_page(*page, page_size).await,
                    Request::Search { query } => source.search_by_name(query).await,
                }
            };
            let result = catch_task_panic(fetch).await.unwrap_or_else(|error| {
                tracing::error!(generation, error = %error, "Feed request panicked");
                Err(FetchError::Panicked(error))
            });
            let completion = Completion {
                generation,
                request: task_request,
                result,
            };
            if let Err(e) = tx.send(completion).await {
                tracing::debug!(generation, error = %e, "Feed controller gone, dropping completion");
            }
        });

        self.in_flight = Some(InFlight {
            generation,
            request,
            handle,
        });
        self.set_loading(true);
    }

    /// Update the loading flag, notifying only on an actual transition.
    fn set_loading(&mut self, loading: bool) {
        if self.state.is_loading() == loading {
            return;
        }
        self.state.set_loading(loading);
        self.observer.loading_changed(loading, &self.state);
    }
}

impl<S: CollectionSource> Drop for FeedController<S> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
    }
}
