use crate::api::Character;

/// Whether the feed is walking pages or showing a one-shot search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedMode {
    #[default]
    Browse,
    Search,
}

/// The feed as observers see it.
///
/// Only the controller mutates this, and every commit updates the item
/// list and the pagination fields in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedState {
    items: Vec<Character>,
    mode: FeedMode,
    current_page: u32,
    total_pages: u32,
    has_more_pages: bool,
    is_loading: bool,
    /// Query behind the current search result, kept for refresh.
    search_query: Option<String>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            mode: FeedMode::Browse,
            current_page: 1,
            total_pages: 1,
            has_more_pages: false,
            is_loading: false,
            search_query: None,
        }
    }
}

impl FeedState {
    pub fn items(&self) -> &[Character] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Character at `index`, or `None` when out of range.
    pub fn item_at(&self, index: usize) -> Option<&Character> {
        self.items.get(index)
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn has_more_pages(&self) -> bool {
        self.has_more_pages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn search_query(&self) -> Option<&str> {
        self.search_query.as_deref()
    }

    pub(super) fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    /// Replace the feed with page 1 of the browse listing.
    pub(super) fn commit_first_page(&mut self, items: Vec<Character>, total_pages: u32) {
        self.items = items;
        self.mode = FeedMode::Browse;
        self.search_query = None;
        self.current_page = 1;
        self.total_pages = total_pages;
        self.recompute_has_more();
    }

    /// Append `page` to the browse listing. No de-duplication.
    pub(super) fn commit_next_page(
        &mut self,
        page: u32,
        items: Vec<Character>,
        total_pages: Option<u32>,
    ) {
        self.items.extend(items);
        self.current_page = page;
        if let Some(total) = total_pages {
            self.total_pages = total;
        }
        self.recompute_has_more();
    }

    /// Replace the feed with an unpaginated search result.
    pub(super) fn commit_search(&mut self, query: String, items: Vec<Character>) {
        self.items = items;
        self.mode = FeedMode::Search;
        self.search_query = Some(query);
        self.recompute_has_more();
    }

    fn recompute_has_more(&mut self) {
        self.has_more_pages = match self.mode {
            FeedMode::Browse => self.current_page < self.total_pages,
            FeedMode::Search => false,
        };
    }
}
