use serde::{Serialize, Serializer};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Label written in place of a referrer for the start page.
pub const ROOT_REFERRER_LABEL: &str = "Inicio";

/// The page on which a URL was discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Referrer {
    Root,
    Page(String),
}

impl fmt::Display for Referrer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Referrer::Root => f.write_str(ROOT_REFERRER_LABEL),
            Referrer::Page(url) => f.write_str(url),
        }
    }
}

impl Serialize for Referrer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub referrer: Referrer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Unseen,
    InFlight,
    Visited,
}

#[derive(Default)]
struct FrontierState {
    pending: VecDeque<FrontierEntry>,
    in_flight: HashSet<String>,
    visited: HashSet<String>,
}

impl FrontierState {
    fn is_claimed(&self, url: &str) -> bool {
        self.in_flight.contains(url) || self.visited.contains(url)
    }
}

/// Pending work plus the visited/in-flight guards.
///
/// A URL may sit in `pending` more than once when several pages link to it
/// before it is dispatched; `dequeue_batch` drops the extra copies.
#[derive(Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    progress: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `url` unless it is already in flight or visited.
    pub fn enqueue(&self, url: impl Into<String>, referrer: Referrer) -> bool {
        let url = url.into();
        let mut state = self.state();
        if state.is_claimed(&url) {
            return false;
        }
        state.pending.push_back(FrontierEntry { url, referrer });
        true
    }

    /// Takes up to `max` dispatchable entries from the head, marking each in flight.
    pub fn dequeue_batch(&self, max: usize) -> Vec<FrontierEntry> {
        let mut state = self.state();
        let mut batch = Vec::with_capacity(max.min(state.pending.len()));

        while batch.len() < max {
            let Some(entry) = state.pending.pop_front() else {
                break;
            };
            if state.is_claimed(&entry.url) {
                continue;
            }
            state.in_flight.insert(entry.url.clone());
            batch.push(entry);
        }

        batch
    }

    /// Moves `url` from in flight to visited.
    pub fn complete(&self, url: &str) {
        {
            let mut state = self.state();
            state.in_flight.remove(url);
            state.visited.insert(url.to_string());
        }
        self.progress.notify_waiters();
    }

    pub fn is_quiescent(&self) -> bool {
        let state = self.state();
        state.pending.is_empty() && state.in_flight.is_empty()
    }

    /// Resolves the next time an in-flight URL completes.
    pub async fn wait_for_progress(&self) {
        self.progress.notified().await;
    }

    pub fn state_of(&self, url: &str) -> CrawlState {
        let state = self.state();
        if state.visited.contains(url) {
            CrawlState::Visited
        } else if state.in_flight.contains(url) {
            CrawlState::InFlight
        } else {
            CrawlState::Unseen
        }
    }

    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.state().in_flight.len()
    }

    pub fn visited_len(&self) -> usize {
        self.state().visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str) -> Referrer {
        Referrer::Page(url.to_string())
    }

    #[test]
    fn test_referrer_display() {
        assert_eq!(Referrer::Root.to_string(), "Inicio");
        assert_eq!(page("https://a.test/x").to_string(), "https://a.test/x");
    }

    #[test]
    fn test_dequeue_is_fifo() {
        let frontier = Frontier::new();
        frontier.enqueue("https://a.test/1", Referrer::Root);
        frontier.enqueue("https://a.test/2", Referrer::Root);
        frontier.enqueue("https://a.test/3", Referrer::Root);

        let batch = frontier.dequeue_batch(2);
        let urls: Vec<_> = batch.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test/1", "https://a.test/2"]);
        assert_eq!(frontier.pending_len(), 1);
        assert_eq!(frontier.in_flight_len(), 2);
    }

    #[test]
    fn test_enqueue_ignores_in_flight_and_visited() {
        let frontier = Frontier::new();
        frontier.enqueue("https://a.test/", Referrer::Root);
        let batch = frontier.dequeue_batch(10);
        assert_eq!(batch.len(), 1);

        assert!(!frontier.enqueue("https://a.test/", page("https://a.test/b")));
        assert_eq!(frontier.state_of("https://a.test/"), CrawlState::InFlight);

        frontier.complete("https://a.test/");
        assert_eq!(frontier.state_of("https://a.test/"), CrawlState::Visited);
        assert!(!frontier.enqueue("https://a.test/", page("https://a.test/c")));
        assert_eq!(frontier.pending_len(), 0);
    }

    #[test]
    fn test_duplicate_pending_entries_dispatch_once() {
        let frontier = Frontier::new();
        assert!(frontier.enqueue("https://a.test/x", page("https://a.test/1")));
        assert!(frontier.enqueue("https://a.test/x", page("https://a.test/2")));
        assert!(frontier.enqueue("https://a.test/y", page("https://a.test/2")));

        let batch = frontier.dequeue_batch(10);
        let urls: Vec<_> = batch.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test/x", "https://a.test/y"]);
        // first referrer wins
        assert_eq!(batch[0].referrer, page("https://a.test/1"));
        assert_eq!(frontier.pending_len(), 0);
    }

    #[test]
    fn test_stale_entries_skipped_across_batches() {
        let frontier = Frontier::new();
        frontier.enqueue("https://a.test/x", Referrer::Root);
        frontier.enqueue("https://a.test/x", page("https://a.test/1"));

        let first = frontier.dequeue_batch(1);
        assert_eq!(first.len(), 1);
        frontier.complete("https://a.test/x");

        let second = frontier.dequeue_batch(1);
        assert!(second.is_empty());
        assert!(frontier.is_quiescent());
    }

    #[test]
    fn test_quiescence_requires_no_in_flight() {
        let frontier = Frontier::new();
        assert!(frontier.is_quiescent());

        frontier.enqueue("https://a.test/", Referrer::Root);
        assert!(!frontier.is_quiescent());

        let batch = frontier.dequeue_batch(5);
        assert_eq!(frontier.pending_len(), 0);
        assert!(!frontier.is_quiescent());

        frontier.complete(&batch[0].url);
        assert!(frontier.is_quiescent());
        assert_eq!(frontier.visited_len(), 1);
    }

    #[test]
    fn test_dequeue_zero_takes_nothing() {
        let frontier = Frontier::new();
        frontier.enqueue("https://a.test/", Referrer::Root);
        assert!(frontier.dequeue_batch(0).is_empty());
        assert_eq!(frontier.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_complete_wakes_waiter() {
        let frontier = std::sync::Arc::new(Frontier::new());
        frontier.enqueue("https://a.test/", Referrer::Root);
        let batch = frontier.dequeue_batch(1);

        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.wait_for_progress().await })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        frontier.complete(&batch[0].url);
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
