use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::query::executor::DataAccessError;
use crate::query::filter::{AggregationQuery, FilterParams, FilterSpec};
use crate::query::metrics::{compute_records, ConversionRecord};
use crate::query::report::ConversionReport;
use axum::extract::{Query, State};
use axum::Json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Run (or reuse) the aggregation for `filter` and derive the records.
///
/// Failures are never cached and leave any cached result untouched.
async fn load_records(
    state: &Arc<AppState>,
    filter: &FilterSpec,
) -> Result<Arc<Vec<ConversionRecord>>, ApiError> {
    let query = AggregationQuery::from_filter(filter);

    if let Some(cached) = state.query_cache.get(&query) {
        state.queries_served.fetch_add(1, Ordering::Relaxed);
        return Ok(cached);
    }

    let executor = Arc::clone(&state.executor);
    let task_query = query.clone();
    let result = tokio::task::spawn_blocking(move || executor.execute(&task_query))
        .await
        .map_err(|e| DataAccessError::Task(e.to_string()))
        .and_then(|r| r);

    let rows = match result {
        Ok(rows) => rows,
        Err(e) => {
            state.query_failures.fetch_add(1, Ordering::Relaxed);
            return Err(e.into());
        }
    };

    let records = Arc::new(compute_records(rows));
    state.query_cache.insert(query, Arc::clone(&records));
    state.queries_served.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(
        group_by = filter.group_by.trunc_unit(),
        channel = filter.channel.as_deref().unwrap_or("*"),
        records = records.len(),
        "Conversion query answered"
    );
    Ok(records)
}

/// GET /conversion-rate - Flat per-(period, channel) records with conversion rate.
pub async fn get_conversion_rate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<ConversionRecord>>, ApiError> {
    let filter = FilterSpec::from_params(&params);
    let records = load_records(&state, &filter).await?;
    Ok(Json(Arc::unwrap_or_clone(records)))
}

/// GET /api/conversion-rate/report - Records plus aligned series, chart rows and totals.
pub async fn get_conversion_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Json<ConversionReport>, ApiError> {
    let filter = FilterSpec::from_params(&params);
    let records = load_records(&state, &filter).await?;
    Ok(Json(ConversionReport::build(Arc::unwrap_or_clone(records))))
}
