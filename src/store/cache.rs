//! Time-to-live memoization of fetched rows.
//!
//! Owned by the caller that refreshes the report; the analysis code only
//! ever receives the rows, fresh or cached.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
pub struct FetchCache<T> {
    ttl: Duration,
    entry: Option<(Instant, T)>,
}

impl<T: Clone> FetchCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// The cached value if it was stored less than `ttl` before `now`.
    pub fn get(&self, now: Instant) -> Option<T> {
        match &self.entry {
            Some((stored_at, value)) if now.saturating_duration_since(*stored_at) < self.ttl => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub fn put(&mut self, value: T, now: Instant) {
        self.entry = Some((now, value));
    }

    /// Drop the cached value so the next read fetches again.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Return the cached value or run `fetch` and cache its result.
    /// Failed fetches leave the cache untouched.
    pub async fn get_or_fetch<F, Fut, E>(&mut self, now: Instant, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(now) {
            debug!("Serving rows from cache");
            return Ok(value);
        }

        let value = fetch().await?;
        self.put(value.clone(), now);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_and_stale() {
        let start = Instant::now();
        let mut cache = FetchCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(start), None);

        cache.put(vec![1, 2, 3], start);
        assert_eq!(cache.get(start + Duration::from_secs(59)), Some(vec![1, 2, 3]));
        assert_eq!(cache.get(start + Duration::from_secs(60)), None);
    }

    #[test]
    fn test_invalidate() {
        let now = Instant::now();
        let mut cache = FetchCache::new(Duration::from_secs(60));
        cache.put("rows", now);

        cache.invalidate();
        assert_eq!(cache.get(now), None);
    }

    #[test]
    fn test_get_or_fetch_only_fetches_when_stale() {
        let start = Instant::now();
        let mut cache = FetchCache::new(Duration::from_secs(10));
        let mut calls = 0;

        let first: Result<u32, String> = tokio_test::block_on(cache.get_or_fetch(start, || {
            calls += 1;
            async { Ok(7) }
        }));
        assert_eq!(first, Ok(7));

        let second: Result<u32, String> = tokio_test::block_on(
            cache.get_or_fetch(start + Duration::from_secs(5), || {
                calls += 1;
                async { Ok(8) }
            }),
        );
        assert_eq!(second, Ok(7));

        let third: Result<u32, String> = tokio_test::block_on(
            cache.get_or_fetch(start + Duration::from_secs(11), || {
                calls += 1;
                async { Ok(9) }
            }),
        );
        assert_eq!(third, Ok(9));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_failed_fetch_is_not_cached() {
        let now = Instant::now();
        let mut cache: FetchCache<u32> = FetchCache::new(Duration::from_secs(10));

        let result: Result<u32, String> = tokio_test::block_on(
            cache.get_or_fetch(now, || async { Err("store down".to_string()) }),
        );

        assert!(result.is_err());
        assert_eq!(cache.get(now), None);
    }
}
