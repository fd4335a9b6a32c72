//! In-process collection sources for controller tests.

use crate::api::fixtures::character;
use crate::api::{Character, CollectionSource, FetchError, PageEnvelope, PageInfo};
use crate::feed::FeedNotification;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Page { page: u32, page_size: u32 },
    ById(i64),
    Search(String),
}

type Reply = Result<PageEnvelope, FetchError>;

/// Source whose calls block until the test answers them, in any order.
#[derive(Default)]
pub struct GatedSource {
    calls: Mutex<Vec<Call>>,
    gates: Mutex<Vec<Option<oneshot::Sender<Reply>>>>,
}

impl GatedSource {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Yield until at least `n` calls have reached the source.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls.lock().unwrap().len() < n {
            tokio::task::yield_now().await;
        }
    }

    /// Answer call number `index` (0-based, in arrival order).
    pub fn respond(&self, index: usize, reply: Reply) {
        let gate = self.gates.lock().unwrap()[index]
            .take()
            .expect("call already answered");
        // The task may have been aborted; that is fine.
        let _ = gate.send(reply);
    }

    async fn gated(&self, call: Call) -> Reply {
        let (tx, rx) = oneshot::channel();
        {
            let mut calls = self.calls.lock().unwrap();
            let mut gates = self.gates.lock().unwrap();
            calls.push(call);
            gates.push(Some(tx));
        }
        rx.await.unwrap_or(Err(FetchError::Timeout))
    }
}

impl CollectionSource for GatedSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<PageEnvelope, FetchError> {
        self.gated(Call::Page { page, page_size }).await
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Character, FetchError> {
        let envelope = self.gated(Call::ById(id)).await?;
        envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Decode("empty".into()))
    }

    async fn search_by_name(&self, name: &str) -> Result<PageEnvelope, FetchError> {
        self.gated(Call::Search(name.to_string())).await
    }
}

/// Source backed by a fixed character list, answering immediately.
pub struct StaticSource {
    characters: Vec<Character>,
    failing_pages: Mutex<HashSet<u32>>,
    fail_searches: Mutex<bool>,
    panic_next: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

impl StaticSource {
    /// Characters with ids `1..=count`, named "Character {id}".
    pub fn with_count(count: usize) -> Self {
        let characters = (1..=count as i64)
            .map(|id| character(id, &format!("Character {id}")))
            .collect();
        Self::new(characters)
    }

    pub fn new(characters: Vec<Character>) -> Self {
        Self {
            characters,
            failing_pages: Mutex::new(HashSet::new()),
            fail_searches: Mutex::new(false),
            panic_next: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_page(&self, page: u32) {
        self.failing_pages.lock().unwrap().insert(page);
    }

    pub fn heal_page(&self, page: u32) {
        self.failing_pages.lock().unwrap().remove(&page);
    }

    pub fn fail_searches(&self, fail: bool) {
        *self.fail_searches.lock().unwrap() = fail;
    }

    /// Make the next page or search call panic instead of answering.
    pub fn panic_next_call(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn maybe_panic(&self) {
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("source blew up");
        }
    }
}

impl CollectionSource for StaticSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<PageEnvelope, FetchError> {
        self.maybe_panic();
        self.calls
            .lock()
            .unwrap()
            .push(Call::Page { page, page_size });
        if self.failing_pages.lock().unwrap().contains(&page) {
            return Err(FetchError::HttpStatus(500));
        }

        let size = page_size as usize;
        let total_pages = self.characters.len().div_ceil(size).max(1) as u32;
        let start = (page as usize - 1) * size;
        let data: Vec<Character> = self.characters.iter().skip(start).take(size).cloned().collect();
        Ok(PageEnvelope {
            info: PageInfo {
                total_pages: Some(total_pages),
                count: data.len() as u32,
                previous_page: None,
                next_page: None,
            },
            data,
        })
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Character, FetchError> {
        self.calls.lock().unwrap().push(Call::ById(id));
        self.characters
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(FetchError::HttpStatus(404))
    }

    async fn search_by_name(&self, name: &str) -> Result<PageEnvelope, FetchError> {
        self.maybe_panic();
        self.calls.lock().unwrap().push(Call::Search(name.to_string()));
        if *self.fail_searches.lock().unwrap() {
            return Err(FetchError::Decode("unexpected body".into()));
        }

        let needle = name.to_lowercase();
        let data: Vec<Character> = self
            .characters
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(PageEnvelope {
            // Search results still report page metadata; the controller must ignore it
            info: PageInfo {
                total_pages: Some(99),
                count: data.len() as u32,
                previous_page: None,
                next_page: None,
            },
            data,
        })
    }
}

/// Drain every notification received so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<FeedNotification>) -> Vec<FeedNotification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}
