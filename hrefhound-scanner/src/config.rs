use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_START_URL: &str = "https://qa.garzablancaresort.com/";
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_POOL_SIZE: usize = 15;
pub const DEFAULT_NAV_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(200);
pub const DEFAULT_BLOCKED_EXTENSIONS: [&str; 3] = [".pdf", ".zip", ".doc"];
pub const DEFAULT_USER_AGENT: &str = "hrefhound/0.1";

/// Tunables for a single crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub start_url: String,
    /// Maximum simultaneous crawl attempts per batch.
    pub concurrency: usize,
    /// Number of reusable fetchers. Must be >= `concurrency`.
    pub pool_size: usize,
    pub nav_timeout: Duration,
    /// How long the dispatcher waits when a batch comes back empty.
    pub idle_backoff: Duration,
    pub blocked_extensions: Vec<String>,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            pool_size: DEFAULT_POOL_SIZE,
            nav_timeout: DEFAULT_NAV_TIMEOUT,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            blocked_extensions: DEFAULT_BLOCKED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            ..Default::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_nav_timeout(mut self, timeout: Duration) -> Self {
        self.nav_timeout = timeout;
        self
    }

    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    pub fn with_blocked_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn block_policy(&self) -> BlockPolicy {
        BlockPolicy::new(self.blocked_extensions.iter())
    }

    /// Rejects configurations that would stall or never make progress.
    ///
    /// A concurrency ceiling above the pool size would leave the surplus
    /// attempts waiting on fetchers that are never handed back within the batch.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ScanError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(ScanError::InvalidConfig(
                "pool size must be at least 1".to_string(),
            ));
        }
        if self.concurrency > self.pool_size {
            return Err(ScanError::InvalidConfig(format!(
                "concurrency ({}) exceeds fetcher pool size ({})",
                self.concurrency, self.pool_size
            )));
        }
        if self.nav_timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "navigation timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Decides which requests a fetcher refuses to make.
///
/// Matching is a case-insensitive suffix test on the full URL string, so
/// `https://host/file.PDF` is blocked but `https://host/file.pdf?dl=1` is not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPolicy {
    extensions: Vec<String>,
}

impl BlockPolicy {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref().trim().to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{}", ext)
                }
            })
            .filter(|ext| ext.len() > 1)
            .collect();
        Self { extensions }
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn should_block(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        self.extensions.iter().any(|ext| url.ends_with(ext.as_str()))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}
