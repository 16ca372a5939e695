use crate::frontier::Referrer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Why a page was classified as broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokenReason {
    /// The server answered 404.
    Status404,
    /// The page rendered a "not found" message.
    NotFoundText,
}

impl fmt::Display for BrokenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokenReason::Status404 => f.write_str("HTTP 404"),
            BrokenReason::NotFoundText => f.write_str("not-found text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenPage {
    pub url: String,
    pub referrer: Referrer,
    pub reason: BrokenReason,
}

/// A page whose navigation failed. It is neither healthy nor known to be broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPage {
    pub url: String,
    pub referrer: Referrer,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub start_url: String,
    pub visited: usize,
    pub broken: Vec<BrokenPage>,
    pub failed: Vec<FailedPage>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlSummary {
    pub fn has_broken(&self) -> bool {
        !self.broken.is_empty()
    }

    pub fn referrer_of(&self, url: &str) -> Option<&Referrer> {
        self.broken
            .iter()
            .find(|page| page.url == url)
            .map(|page| &page.referrer)
    }
}

/// What a single crawl attempt ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Healthy { links_enqueued: usize },
    Broken(BrokenReason),
    /// Navigation produced no response.
    Empty,
    /// Blocked by the fetcher's request policy.
    Aborted,
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_referrers_as_strings() {
        let now = Utc::now();
        let summary = CrawlSummary {
            start_url: "https://site.test/".to_string(),
            visited: 2,
            broken: vec![BrokenPage {
                url: "https://site.test/gone".to_string(),
                referrer: Referrer::Root,
                reason: BrokenReason::Status404,
            }],
            failed: vec![FailedPage {
                url: "https://site.test/slow".to_string(),
                referrer: Referrer::Page("https://site.test/".to_string()),
                error: "Navigation timeout of 20000ms exceeded".to_string(),
            }],
            started_at: now,
            finished_at: now,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["broken"][0]["referrer"], "Inicio");
        assert_eq!(json["broken"][0]["reason"], "status404");
        assert_eq!(json["failed"][0]["referrer"], "https://site.test/");
        assert!(summary.has_broken());
        assert_eq!(
            summary.referrer_of("https://site.test/gone"),
            Some(&Referrer::Root)
        );
        assert_eq!(summary.referrer_of("https://site.test/slow"), None);
    }
}
