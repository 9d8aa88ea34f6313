use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Single-value cache that expires `ttl` after the last fill
///
/// Expiry is the only invalidation. The lock is held while fetching, so
/// concurrent callers wait for one fetch instead of racing.
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value if still fresh
    pub async fn get(&self) -> Option<T> {
        let slot = self.slot.lock().await;
        self.fresh(&slot)
    }

    pub async fn insert(&self, value: T) {
        *self.slot.lock().await = Some((Instant::now(), value));
    }

    /// Return the fresh value or fill it with `fetch`
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(value) = self.fresh(&slot) {
            return value;
        }

        let value = fetch().await;
        *slot = Some((Instant::now(), value.clone()));
        value
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch) but errors are returned and not cached
    pub async fn get_or_try_fetch<F, Fut, E>(&self, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(value) = self.fresh(&slot) {
            return Ok(value);
        }

        let value = fetch().await?;
        *slot = Some((Instant::now(), value.clone()));
        Ok(value)
    }

    fn fresh(&self, slot: &Option<(Instant, T)>) -> Option<T> {
        slot.as_ref()
            .filter(|(filled_at, _)| filled_at.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fresh_value_is_reused() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    42
                })
                .await;
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_refetches() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert(1).await;
        assert_eq!(cache.get().await, None);

        let value = cache.get_or_fetch(|| async { 2 }).await;
        assert_eq!(value, 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        tokio_test::block_on(async {
            let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));

            let first: Result<u32, &str> = cache.get_or_try_fetch(|| async { Err("boom") }).await;
            assert_eq!(first, Err("boom"));
            assert_eq!(cache.get().await, None);

            let second: Result<u32, &str> = cache.get_or_try_fetch(|| async { Ok(7) }).await;
            assert_eq!(second, Ok(7));
            assert_eq!(cache.get().await, Some(7));
        });
    }
}
