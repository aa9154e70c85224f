use crate::query::cache::QueryCache;
use crate::query::executor::AggregationExecutor;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Shared application state for the HTTP handlers.
pub struct AppState {
    pub executor: Arc<dyn AggregationExecutor>,
    pub query_cache: QueryCache,
    pub dashboard_origin: Option<String>,
    /// Aggregations answered since startup, cache hits included.
    pub queries_served: AtomicU64,
    /// Aggregations that failed with a data-access error.
    pub query_failures: AtomicU64,
}

impl AppState {
    pub fn new(
        executor: Arc<dyn AggregationExecutor>,
        query_cache: QueryCache,
        dashboard_origin: Option<String>,
    ) -> Self {
        Self {
            executor,
            query_cache,
            dashboard_origin,
            queries_served: AtomicU64::new(0),
            query_failures: AtomicU64::new(0),
        }
    }
}
