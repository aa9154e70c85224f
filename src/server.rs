use crate::api::conversion;
use crate::api::errors::ApiError;
use crate::api::state::AppState;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, Uri};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let report_cors = build_report_cors(state.dashboard_origin.as_deref());

    // `/conversion-rate` is the path existing dashboards call; the `/api` forms sit beside it.
    let report_routes = Router::new()
        .route("/conversion-rate", get(conversion::get_conversion_rate))
        .route("/api/conversion-rate", get(conversion::get_conversion_rate))
        .route(
            "/api/conversion-rate/report",
            get(conversion::get_conversion_report),
        )
        .layer(report_cors);

    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/metrics", get(prometheus_metrics))
        .merge(report_routes)
        .fallback(not_found)
        .layer(axum::middleware::map_response(add_security_headers))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(30),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Inject OWASP-recommended security headers on every HTTP response.
async fn add_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}

/// Build CORS layer for report routes based on configured origin.
fn build_report_cors(dashboard_origin: Option<&str>) -> CorsLayer {
    dashboard_origin.map_or_else(
        || {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET])
                .allow_headers(Any)
        },
        |origin| match origin.parse::<HeaderValue>() {
            Ok(allowed_origin) => CorsLayer::new()
                .allow_origin(allowed_origin)
                .allow_methods([Method::GET])
                .allow_headers([header::CONTENT_TYPE]),
            Err(e) => {
                tracing::warn!(origin, error = %e, "Invalid dashboard_origin, allowing any origin");
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET])
                    .allow_headers(Any)
            }
        },
    )
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

/// GET /health/detailed - Health check including a store round trip.
async fn detailed_health_check(
    State(state): State<Arc<AppState>>,
) -> axum::Json<serde_json::Value> {
    let executor = Arc::clone(&state.executor);
    let store = match tokio::task::spawn_blocking(move || executor.ping()).await {
        Ok(Ok(())) => "ok".to_string(),
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("ping task failed: {e}"),
    };
    let status = if store == "ok" { "ok" } else { "degraded" };

    axum::Json(serde_json::json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "store": store,
        "cache_entries": state.query_cache.len(),
        "queries_served": state.queries_served.load(Ordering::Relaxed),
        "query_failures": state.query_failures.load(Ordering::Relaxed),
    }))
}

/// GET /metrics - Prometheus-compatible metrics endpoint.
async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> ([(header::HeaderName, &'static str); 1], String) {
    use std::fmt::Write;

    let served = state.queries_served.load(Ordering::Relaxed);
    let failures = state.query_failures.load(Ordering::Relaxed);
    let cache_entries = state.query_cache.len();

    let mut out = String::with_capacity(512);
    let _ = writeln!(
        out,
        "# HELP pulse_queries_served_total Conversion aggregations answered since startup"
    );
    let _ = writeln!(out, "# TYPE pulse_queries_served_total counter");
    let _ = writeln!(out, "pulse_queries_served_total {served}");
    let _ = writeln!(
        out,
        "# HELP pulse_query_failures_total Conversion aggregations that failed in the store"
    );
    let _ = writeln!(out, "# TYPE pulse_query_failures_total counter");
    let _ = writeln!(out, "pulse_query_failures_total {failures}");
    let _ = writeln!(
        out,
        "# HELP pulse_cache_entries Number of cached aggregation results"
    );
    let _ = writeln!(out, "# TYPE pulse_cache_entries gauge");
    let _ = writeln!(out, "pulse_cache_entries {cache_entries}");

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], out)
}
