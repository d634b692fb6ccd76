//! Keystroke debouncing and stale-response suppression.
//!
//! Every query gets a ticket from a [`QuerySequencer`]. Results are only
//! applied while their ticket is still the newest one issued, so a slow
//! response for `"ip"` can never overwrite the results for `"iphone"`.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A position in the query sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Issues monotonically increasing tickets.
#[derive(Debug, Clone, Default)]
pub struct QuerySequencer {
    latest: Arc<AtomicU64>,
}

impl QuerySequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new query, superseding every earlier ticket.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether no newer ticket has been issued.
    #[must_use]
    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Pass `results` through only if `ticket` is still the latest.
    pub fn accept<T>(&self, ticket: Ticket, results: T) -> Option<T> {
        self.is_latest(ticket).then_some(results)
    }
}

/// Waits out a quiet period before running a query.
#[derive(Debug, Clone)]
pub struct Debouncer {
    sequencer: QuerySequencer,
    window: Duration,
}

impl Debouncer {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            sequencer: QuerySequencer::new(),
            window,
        }
    }

    /// Run `query` after the debounce window.
    ///
    /// Returns `None` without running it if another call started during the
    /// window, and discards its output if another call started while it ran.
    pub async fn run<F, Fut, T>(&self, query: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = self.sequencer.issue();
        tokio::time::sleep(self.window).await;

        if !self.sequencer.is_latest(ticket) {
            return None;
        }

        let results = query().await;
        self.sequencer.accept(ticket, results)
    }
}
