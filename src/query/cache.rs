use crate::query::filter::AggregationQuery;
use crate::query::metrics::ConversionRecord;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Thread-safe cache of computed records per aggregation descriptor, with TTL expiry.
#[derive(Clone)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<AggregationQuery, CacheEntry>>>,
    ttl: Duration,
}

struct CacheEntry {
    records: Arc<Vec<ConversionRecord>>,
    inserted_at: Instant,
}

impl QueryCache {
    /// Create a new cache with the given TTL in seconds.
    /// A TTL of 0 disables caching (all lookups miss).
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Look up records for `query`. Returns `None` if missing or expired.
    pub fn get(&self, query: &AggregationQuery) -> Option<Arc<Vec<ConversionRecord>>> {
        if self.ttl.is_zero() {
            return None;
        }
        self.entries.lock().get(query).and_then(|entry| {
            if entry.inserted_at.elapsed() > self.ttl {
                None
            } else {
                Some(Arc::clone(&entry.records))
            }
        })
    }

    pub fn insert(&self, query: AggregationQuery, records: Arc<Vec<ConversionRecord>>) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.lock().insert(
            query,
            CacheEntry {
                records,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove expired entries from the cache.
    pub fn cleanup_expired(&self) {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::Granularity;

    fn records(n: u64) -> Arc<Vec<ConversionRecord>> {
        Arc::new(vec![ConversionRecord::new("2025-05-23", "email", n, 0)])
    }

    fn monthly() -> AggregationQuery {
        AggregationQuery {
            granularity: Granularity::Month,
            ..AggregationQuery::default()
        }
    }

    #[test]
    fn test_cache_insert_and_get() {
        let cache = QueryCache::new(60);
        cache.insert(AggregationQuery::default(), records(1));
        assert_eq!(cache.get(&AggregationQuery::default()), Some(records(1)));
    }

    #[test]
    fn test_cache_keyed_by_descriptor() {
        let cache = QueryCache::new(60);
        cache.insert(AggregationQuery::default(), records(1));
        assert!(cache.get(&monthly()).is_none());

        let with_channel = AggregationQuery {
            channel: Some("email".to_string()),
            ..AggregationQuery::default()
        };
        assert!(cache.get(&with_channel).is_none());
    }

    #[test]
    fn test_cache_disabled_with_zero_ttl() {
        let cache = QueryCache::new(0);
        cache.insert(AggregationQuery::default(), records(1));
        assert!(cache.get(&AggregationQuery::default()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_overwrite() {
        let cache = QueryCache::new(60);
        cache.insert(monthly(), records(1));
        cache.insert(monthly(), records(2));
        assert_eq!(cache.get(&monthly()), Some(records(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cleanup_keeps_fresh_entries() {
        let cache = QueryCache::new(60);
        cache.insert(monthly(), records(1));
        cache.cleanup_expired();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_clone_shares_state() {
        let cache1 = QueryCache::new(60);
        let cache2 = cache1.clone();
        cache1.insert(monthly(), records(3));
        assert_eq!(cache2.get(&monthly()), Some(records(3)));
    }
}
