pub mod classify;
pub mod config;
pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod frontier;
pub mod pool;
pub mod result;
pub mod session;

pub use config::{BlockPolicy, CrawlConfig};
pub use crawler::{CrawlWorker, Crawler, ProgressCallback, ResultCallback};
pub use error::{FetchError, ScanError};
pub use fetcher::{HttpFetcher, NavigateOptions, PageFetcher, PageSnapshot, Readiness};
pub use frontier::{CrawlState, Frontier, FrontierEntry, Referrer};
pub use pool::{FetcherLease, FetcherPool};
pub use result::{AttemptOutcome, BrokenPage, BrokenReason, CrawlSummary, FailedPage};
pub use session::{CrawlSession, ResultAggregator};
