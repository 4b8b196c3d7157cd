use dashmap::DashMap;
use std::borrow::Borrow;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use crate::cache::clock::Clock;
use crate::error::Result;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Debug)]
pub struct Cached<V> {
    pub value: V,
    pub stored_at: Timestamp,
}

impl<V> Cached<V> {
    pub fn is_fresh(&self, now: Timestamp, ttl: Duration) -> bool {
        now.since(self.stored_at) <= ttl
    }
}

/// Keyed cache whose entries expire after `ttl` but are never evicted, so an
/// expired value stays available as a last resort.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Cached<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn get_fresh<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Returns the entry regardless of age.
    pub fn get_stale<Q>(&self, key: &Q) -> Option<Cached<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: K, value: V) -> Timestamp {
        let stored_at = self.clock.now();
        self.entries.insert(key, Cached { value, stored_at });
        stored_at
    }
}

/// Single cached value refreshed on miss or expiry.
///
/// The lock is held across the refresh, so concurrent readers of an expired
/// cell wait for one refresh instead of each issuing their own. A failed
/// refresh leaves the previous value untouched and is not cached.
pub struct TtlCell<V> {
    slot: Mutex<Option<Cached<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCell<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        TtlCell {
            slot: Mutex::new(None),
            ttl,
            clock,
        }
    }

    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let mut slot = self.slot.lock().await;
        let now = self.clock.now();

        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh(now, self.ttl) {
                return Ok(cached.value.clone());
            }
        }

        let value = refresh().await?;
        *slot = Some(Cached {
            value: value.clone(),
            stored_at: now,
        });
        Ok(value)
    }

    #[cfg(test)]
    pub async fn peek(&self) -> Option<Cached<V>> {
        self.slot.lock().await.clone()
    }

    #[cfg(test)]
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Timestamp::from_millis(1_000_000)))
    }

    #[test]
    fn keyed_entry_expires_but_stays_readable() {
        let clock = clock();
        let cache: TtlCache<String, f64> = TtlCache::new(Duration::from_secs(60), clock.clone());

        cache.insert("GC=F".to_string(), 2000.0);
        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get_fresh("GC=F"), Some(2000.0));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get_fresh("GC=F"), None);
        assert_eq!(cache.get_stale("GC=F").map(|c| c.value), Some(2000.0));
        assert!(cache.get_stale("SI=F").is_none());
    }

    #[tokio::test]
    async fn cell_refreshes_only_after_expiry() {
        let clock = clock();
        let cell: TtlCell<u32> = TtlCell::new(Duration::from_secs(60), clock.clone());
        let calls = AtomicUsize::new(0);

        let refresh = || async {
            Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
        };

        assert_eq!(cell.get_or_refresh(refresh).await.unwrap(), 0);
        clock.advance(Duration::from_secs(30));
        assert_eq!(cell.get_or_refresh(refresh).await.unwrap(), 0);
        clock.advance(Duration::from_secs(40));
        assert_eq!(cell.get_or_refresh(refresh).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_is_not_cached() {
        let clock = clock();
        let cell: TtlCell<u32> = TtlCell::new(Duration::from_secs(60), clock.clone());

        let err = cell
            .get_or_refresh(|| async { Err(Error::NoPriceFound("XAUUSD=X".into())) })
            .await;
        assert!(err.is_err());
        assert!(cell.peek().await.is_none());

        let value = cell.get_or_refresh(|| async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn invalidate_forces_refresh() {
        let clock = clock();
        let cell: TtlCell<u32> = TtlCell::new(Duration::from_secs(60), clock);

        cell.get_or_refresh(|| async { Ok(1) }).await.unwrap();
        cell.invalidate().await;
        assert_eq!(cell.get_or_refresh(|| async { Ok(2) }).await.unwrap(), 2);
    }
}
