use crate::error::{Result, ScanError};
use crate::frontier::{Frontier, Referrer};
use crate::result::{BrokenPage, BrokenReason, CrawlSummary, FailedPage};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use url::Url;

/// Broken pages in discovery order, indexed by URL.
#[derive(Default)]
struct BrokenLog {
    pages: Vec<BrokenPage>,
    urls: HashSet<String>,
}

/// Broken pages, failures and the visit counter for one run.
#[derive(Default)]
pub struct ResultAggregator {
    broken: Mutex<BrokenLog>,
    failed: Mutex<Vec<FailedPage>>,
    visited: AtomicUsize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a broken page. The first referrer recorded for a URL is kept.
    pub fn record_broken(&self, url: &str, referrer: &Referrer, reason: BrokenReason) -> bool {
        let mut broken = self.broken.lock().unwrap_or_else(PoisonError::into_inner);
        if !broken.urls.insert(url.to_string()) {
            return false;
        }
        broken.pages.push(BrokenPage {
            url: url.to_string(),
            referrer: referrer.clone(),
            reason,
        });
        true
    }

    pub fn record_failure(&self, url: &str, referrer: &Referrer, error: impl Into<String>) {
        self.failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FailedPage {
                url: url.to_string(),
                referrer: referrer.clone(),
                error: error.into(),
            });
    }

    /// Counts a finished attempt and returns the new total.
    pub fn record_visit(&self) -> usize {
        self.visited.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn visited(&self) -> usize {
        self.visited.load(Ordering::SeqCst)
    }

    pub fn broken(&self) -> Vec<BrokenPage> {
        self.broken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pages
            .clone()
    }

    pub fn failed(&self) -> Vec<FailedPage> {
        self.failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// All mutable state of a single crawl, shared by the dispatcher and its workers.
pub struct CrawlSession {
    start_url: String,
    origin: String,
    frontier: Frontier,
    results: ResultAggregator,
    started_at: DateTime<Utc>,
}

impl CrawlSession {
    /// Opens a session and seeds the frontier with `start_url`.
    pub fn new(start_url: &str) -> Result<Self> {
        let parsed = Url::parse(start_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", start_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl(format!(
                "{}: only http and https URLs can be crawled",
                start_url
            )));
        }

        let origin = parsed.origin().ascii_serialization();
        let frontier = Frontier::new();
        frontier.enqueue(start_url, Referrer::Root);

        Ok(Self {
            start_url: start_url.to_string(),
            origin,
            frontier,
            results: ResultAggregator::new(),
            started_at: Utc::now(),
        })
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn results(&self) -> &ResultAggregator {
        &self.results
    }

    /// True for same-origin links without a fragment.
    ///
    /// The origin must be followed by a path, query or nothing, so
    /// `https://site.test.evil` does not pass for `https://site.test`.
    pub fn should_follow(&self, href: &str) -> bool {
        if href.contains('#') {
            return false;
        }
        match href.strip_prefix(self.origin.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
            None => false,
        }
    }

    pub fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            start_url: self.start_url.clone(),
            visited: self.results.visited(),
            broken: self.results.broken(),
            failed: self.results.failed(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_seeds_start_url() {
        let session = CrawlSession::new("https://site.test/").unwrap();
        assert_eq!(session.origin(), "https://site.test");
        let batch = session.frontier().dequeue_batch(10);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].url, "https://site.test/");
        assert_eq!(batch[0].referrer, Referrer::Root);
    }

    #[test]
    fn test_invalid_start_urls_rejected() {
        assert!(matches!(
            CrawlSession::new("not a url"),
            Err(ScanError::InvalidUrl(_))
        ));
        assert!(matches!(
            CrawlSession::new("ftp://site.test/"),
            Err(ScanError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_origin_keeps_port() {
        let session = CrawlSession::new("http://127.0.0.1:8080/start").unwrap();
        assert_eq!(session.origin(), "http://127.0.0.1:8080");
        assert!(session.should_follow("http://127.0.0.1:8080/other"));
        assert!(!session.should_follow("http://127.0.0.1:9090/other"));
    }

    #[test]
    fn test_should_follow_filters_fragments_and_other_origins() {
        let session = CrawlSession::new("https://site.test/").unwrap();
        assert!(session.should_follow("https://site.test/x"));
        assert!(session.should_follow("https://site.test/search?q=1"));
        assert!(!session.should_follow("https://site.test/x#section"));
        assert!(!session.should_follow("https://other.test/y"));
        assert!(!session.should_follow("http://site.test/x"));
        assert!(!session.should_follow("https://site.test.evil/x"));
        assert!(!session.should_follow("mailto:info@site.test"));
    }

    #[test]
    fn test_first_broken_referrer_wins() {
        let results = ResultAggregator::new();
        let first = Referrer::Page("https://site.test/a".to_string());
        let second = Referrer::Page("https://site.test/b".to_string());

        assert!(results.record_broken("https://site.test/gone", &first, BrokenReason::Status404));
        assert!(!results.record_broken(
            "https://site.test/gone",
            &second,
            BrokenReason::NotFoundText
        ));

        assert!(results.record_broken(
            "https://site.test/also-gone",
            &second,
            BrokenReason::NotFoundText
        ));

        let broken = results.broken();
        assert_eq!(broken.len(), 2);
        assert_eq!(broken[1].url, "https://site.test/also-gone");
        assert_eq!(broken[0].referrer, first);
        assert_eq!(broken[0].reason, BrokenReason::Status404);
    }

    #[test]
    fn test_visit_counter_and_failures() {
        let results = ResultAggregator::new();
        assert_eq!(results.record_visit(), 1);
        assert_eq!(results.record_visit(), 2);
        results.record_failure("https://site.test/slow", &Referrer::Root, "timeout");

        assert_eq!(results.visited(), 2);
        assert_eq!(results.failed().len(), 1);
        assert_eq!(results.failed()[0].error, "timeout");
    }
}
