use crate::config::BlockPolicy;
use crate::error::{Result, ScanError};
use crate::fetcher::PageFetcher;
use std::ops::Deref;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

/// Fixed set of reusable fetchers, each leased to one attempt at a time.
///
/// Acquisition waits on a semaphore instead of polling. A lease hands its
/// fetcher back when dropped, so every exit path of an attempt releases it.
pub struct FetcherPool<F> {
    idle: Mutex<Vec<F>>,
    permits: Semaphore,
    size: usize,
    policy: BlockPolicy,
    leased: AtomicUsize,
    peak_leased: AtomicUsize,
}

impl<F: PageFetcher> FetcherPool<F> {
    /// Builds `size` fetchers, each configured with the same block policy.
    pub fn build<B>(size: usize, policy: BlockPolicy, mut factory: B) -> Result<Self>
    where
        B: FnMut(&BlockPolicy) -> Result<F>,
    {
        if size == 0 {
            return Err(ScanError::InvalidConfig(
                "fetcher pool needs at least one fetcher".to_string(),
            ));
        }

        let fetchers = (0..size)
            .map(|_| factory(&policy))
            .collect::<Result<Vec<_>>>()?;
        debug!("Fetcher pool ready with {} fetchers", size);

        Ok(Self {
            idle: Mutex::new(fetchers),
            permits: Semaphore::new(size),
            size,
            policy,
            leased: AtomicUsize::new(0),
            peak_leased: AtomicUsize::new(0),
        })
    }

    /// Waits until a fetcher is free and takes exclusive use of it.
    pub async fn acquire(&self) -> FetcherLease<'_, F> {
        let Ok(permit) = self.permits.acquire().await else {
            unreachable!("fetcher pool semaphore is never closed");
        };

        let fetcher = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop();

        let now_leased = self.leased.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_leased.fetch_max(now_leased, Ordering::SeqCst);

        FetcherLease {
            pool: self,
            fetcher,
            _permit: permit,
        }
    }
}

impl<F> FetcherPool<F> {
    fn give_back(&self, fetcher: F) {
        self.idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(fetcher);
        self.leased.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Highest number of fetchers that were leased at the same moment.
    pub fn peak_leased(&self) -> usize {
        self.peak_leased.load(Ordering::SeqCst)
    }

    pub fn policy(&self) -> &BlockPolicy {
        &self.policy
    }
}

/// Temporary exclusive ownership of one pooled fetcher.
pub struct FetcherLease<'a, F> {
    pool: &'a FetcherPool<F>,
    fetcher: Option<F>,
    // Dropped after `Drop::drop` has put the fetcher back.
    _permit: SemaphorePermit<'a>,
}

impl<F> FetcherLease<'_, F> {
    /// Returns the fetcher to the pool now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl<F> Deref for FetcherLease<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        match self.fetcher.as_ref() {
            Some(fetcher) => fetcher,
            None => unreachable!("lease holds its fetcher until dropped"),
        }
    }
}

impl<F> Drop for FetcherLease<'_, F> {
    fn drop(&mut self) {
        if let Some(fetcher) = self.fetcher.take() {
            self.pool.give_back(fetcher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetcher::{NavigateOptions, PageSnapshot};
    use async_trait::async_trait;
    use std::time::Duration;

    struct NullFetcher {
        id: usize,
    }

    #[async_trait]
    impl PageFetcher for NullFetcher {
        async fn navigate(
            &self,
            _url: &str,
            _options: &NavigateOptions,
        ) -> std::result::Result<Option<PageSnapshot>, FetchError> {
            Ok(None)
        }
    }

    fn pool(size: usize) -> FetcherPool<NullFetcher> {
        let mut next_id = 0;
        FetcherPool::build(size, BlockPolicy::allow_all(), |_| {
            next_id += 1;
            Ok(NullFetcher { id: next_id })
        })
        .unwrap()
    }

    #[test]
    fn test_build_rejects_empty_pool() {
        let result = FetcherPool::build(0, BlockPolicy::allow_all(), |_| {
            Ok(NullFetcher { id: 0 })
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_build_propagates_factory_error() {
        let result: Result<FetcherPool<NullFetcher>> =
            FetcherPool::build(3, BlockPolicy::allow_all(), |_| {
                Err(ScanError::InvalidConfig("no browser".to_string()))
            });
        assert!(matches!(result, Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn test_factory_receives_pool_policy() {
        let policy = BlockPolicy::new([".pdf"]);
        let pool = FetcherPool::build(2, policy.clone(), |p| {
            assert_eq!(p, &policy);
            Ok(NullFetcher { id: 1 })
        })
        .unwrap();
        assert_eq!(pool.policy(), &policy);
    }

    #[tokio::test]
    async fn test_lease_is_exclusive_and_returned_on_drop() {
        let pool = pool(2);
        assert_eq!(pool.available(), 2);

        let first = pool.acquire().await;
        let second = pool.acquire().await;
        assert_ne!(first.id, second.id);
        assert_eq!(pool.available(), 0);

        drop(first);
        assert_eq!(pool.available(), 1);
        second.release();
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_third_acquire_blocks_until_release() {
        let pool = pool(2);

        let first = pool.acquire().await;
        let _second = pool.acquire().await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(blocked.is_err(), "third lease should wait for a free fetcher");

        let released_id = first.id;
        first.release();

        let third = tokio::time::timeout(Duration::from_millis(50), pool.acquire())
            .await
            .expect("fetcher should be free after release");
        assert_eq!(third.id, released_id);
        assert_eq!(pool.peak_leased(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_leases_never_exceed_pool_size() {
        let pool = pool(2);

        let tasks = (0..5).map(|_| async {
            let lease = pool.acquire().await;
            tokio::time::sleep(Duration::from_millis(10)).await;
            lease.id
        });
        let ids = futures::future::join_all(tasks).await;

        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(|id| *id == 1 || *id == 2));
        assert_eq!(pool.peak_leased(), 2);
        assert_eq!(pool.available(), 2);
    }
}
