use std::time::Duration;
use tokio::time::Instant;

/// Quiet interval after the last edit before a search is sent.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

struct Pending {
    text: String,
    deadline: Instant,
}

/// Coalesces bursts of search-box edits into one search.
///
/// Holds at most one pending timer. Every edit replaces the pending text
/// and restarts the quiet interval; [`fired`](Self::fired) resolves with
/// the latest text once the interval passes without further edits. The
/// debouncer knows nothing about the feed: the owner decides what to do
/// with the text (an empty string means "back to browsing").
pub struct SearchDebouncer {
    quiet: Duration,
    pending: Option<Pending>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

impl SearchDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet
    }

    /// Record an edit, superseding any edit that has not fired yet.
    pub fn input(&mut self, text: impl Into<String>) {
        let text = text.into();
        if let Some(previous) = &self.pending {
            tracing::trace!(superseded = %previous.text, "Debounced search superseded");
        }
        self.pending = Some(Pending {
            text,
            deadline: Instant::now() + self.quiet,
        });
    }

    /// Drop the pending edit, if any, without firing it.
    pub fn cancel(&mut self) -> Option<String> {
        self.pending.take().map(|p| p.text)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_text(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.text.as_str())
    }

    /// Wait for the pending edit to go quiet and take its text.
    ///
    /// Never resolves when nothing is pending. Cancel-safe: dropping the
    /// future before it resolves leaves the pending edit in place.
    pub async fn fired(&mut self) -> String {
        let Some(deadline) = self.pending.as_ref().map(|p| p.deadline) else {
            return std::future::pending().await;
        };
        tokio::time::sleep_until(deadline).await;

        match self.pending.take() {
            Some(pending) => {
                tracing::debug!(text = %pending.text, "Debounced search fired");
                pending.text
            }
            None => std::future::pending().await,
        }
    }
}
