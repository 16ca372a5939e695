use crate::classify::classify;
use crate::config::CrawlConfig;
use crate::error::{Result, ScanError};
use crate::fetcher::{HttpFetcher, NavigateOptions, PageFetcher};
use crate::frontier::{FrontierEntry, Referrer};
use crate::pool::FetcherPool;
use crate::result::{AttemptOutcome, CrawlSummary};
use crate::session::CrawlSession;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Called as each attempt starts with its running number and URL.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
/// Called as each attempt finishes.
pub type ResultCallback = Arc<dyn Fn(&str, &AttemptOutcome) + Send + Sync>;

/// Batch dispatcher over a pool of page fetchers.
pub struct Crawler<F> {
    pool: FetcherPool<F>,
    concurrency: usize,
    nav_options: NavigateOptions,
    idle_backoff: Duration,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
}

impl Crawler<HttpFetcher> {
    /// Builds a crawler with a pool of HTTP fetchers sized from `config`.
    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        config.validate()?;
        let pool = FetcherPool::build(config.pool_size, config.block_policy(), |policy| {
            HttpFetcher::new(policy.clone(), &config.user_agent)
        })?;
        Self::new(pool, config)
    }
}

impl<F: PageFetcher> Crawler<F> {
    pub fn new(pool: FetcherPool<F>, config: &CrawlConfig) -> Result<Self> {
        config.validate()?;
        if config.concurrency > pool.size() {
            return Err(ScanError::InvalidConfig(format!(
                "concurrency ({}) exceeds fetcher pool size ({})",
                config.concurrency,
                pool.size()
            )));
        }

        Ok(Self {
            pool,
            concurrency: config.concurrency,
            nav_options: NavigateOptions::new(config.nav_timeout),
            idle_backoff: config.idle_backoff,
            progress_callback: None,
            result_callback: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    pub fn pool(&self) -> &FetcherPool<F> {
        &self.pool
    }

    /// Crawls everything reachable from `start_url` inside its origin.
    pub async fn crawl(&self, start_url: &str) -> Result<CrawlSummary> {
        let session = CrawlSession::new(start_url)?;
        self.run(&session).await;
        Ok(session.summary())
    }

    /// Drives `session` until its frontier is quiescent.
    ///
    /// Each batch holds at most `concurrency` attempts and must finish
    /// completely before the next batch is taken from the frontier.
    pub async fn run(&self, session: &CrawlSession) {
        info!(
            "Starting crawl of {} with concurrency {} and {} fetchers",
            session.start_url(),
            self.concurrency,
            self.pool.size()
        );

        let worker = CrawlWorker {
            session,
            pool: &self.pool,
            options: &self.nav_options,
            started: AtomicUsize::new(0),
            progress_callback: self.progress_callback.as_ref(),
            result_callback: self.result_callback.as_ref(),
        };

        let frontier = session.frontier();
        while !frontier.is_quiescent() {
            let batch = frontier.dequeue_batch(self.concurrency);
            if batch.is_empty() {
                // Either a completion or the backoff, whichever comes first.
                let _ = tokio::time::timeout(self.idle_backoff, frontier.wait_for_progress()).await;
                continue;
            }

            debug!(
                "Dispatching batch of {} ({} still pending)",
                batch.len(),
                frontier.pending_len()
            );
            join_all(batch.into_iter().map(|entry| worker.attempt(entry))).await;
        }

        info!(
            "Crawl complete. Visited {} pages, {} broken",
            session.results().visited(),
            session.results().broken().len()
        );
    }
}

/// Runs single crawl attempts against a session.
pub struct CrawlWorker<'a, F> {
    session: &'a CrawlSession,
    pool: &'a FetcherPool<F>,
    options: &'a NavigateOptions,
    started: AtomicUsize,
    progress_callback: Option<&'a ProgressCallback>,
    result_callback: Option<&'a ResultCallback>,
}

impl<'a, F: PageFetcher> CrawlWorker<'a, F> {
    pub fn new(
        session: &'a CrawlSession,
        pool: &'a FetcherPool<F>,
        options: &'a NavigateOptions,
    ) -> Self {
        Self {
            session,
            pool,
            options,
            started: AtomicUsize::new(0),
            progress_callback: None,
            result_callback: None,
        }
    }

    /// Crawls one in-flight URL.
    ///
    /// Whatever happens during the visit, the URL ends up visited, the fetcher
    /// goes back to the pool and the visit counter moves by exactly one.
    pub async fn attempt(&self, entry: FrontierEntry) -> AttemptOutcome {
        let FrontierEntry { url, referrer } = entry;

        let lease = self.pool.acquire().await;
        let number = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        info!("[{}] Visiting: {}", number, url);
        if let Some(callback) = self.progress_callback {
            callback(number, url.clone());
        }

        let outcome = self.visit(&lease, &url, &referrer).await;

        lease.release();
        self.session.frontier().complete(&url);
        self.session.results().record_visit();

        if let Some(callback) = self.result_callback {
            callback(&url, &outcome);
        }
        outcome
    }

    async fn visit(&self, fetcher: &F, url: &str, referrer: &Referrer) -> AttemptOutcome {
        let snapshot = match fetcher.navigate(url, self.options).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("No response for {}", url);
                return AttemptOutcome::Empty;
            }
            Err(e) if e.is_abort() => return AttemptOutcome::Aborted,
            Err(e) => {
                warn!("Error navigating {}: {}", url, e);
                let message = e.to_string();
                self.session.results().record_failure(url, referrer, &message);
                return AttemptOutcome::Failed(message);
            }
        };

        if let Some(reason) = classify(snapshot.status, &snapshot.text) {
            warn!("Broken page ({}): {} (found on {})", reason, url, referrer);
            self.session.results().record_broken(url, referrer, reason);
            return AttemptOutcome::Broken(reason);
        }

        let frontier = self.session.frontier();
        let found_on = Referrer::Page(url.to_string());
        let links_enqueued = snapshot
            .hrefs
            .into_iter()
            .filter(|href| self.session.should_follow(href))
            .filter(|href| frontier.enqueue(href.as_str(), found_on.clone()))
            .count();
        debug!("{} new links queued from {}", links_enqueued, url);

        AttemptOutcome::Healthy { links_enqueued }
    }
}
