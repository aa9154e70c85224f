use crate::query::executor::DataAccessError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// API error type with HTTP status code mapping.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    /// Aggregation could not be executed. The cause is returned as `details`.
    DataAccess(DataAccessError),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DataAccess(e) => write!(f, "Data access error: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": msg }),
            ),
            Self::DataAccess(e) => {
                tracing::error!(error = %e, "Aggregation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Internal error", "details": e.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<DataAccessError> for ApiError {
    fn from(e: DataAccessError) -> Self {
        Self::DataAccess(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_not_found_status() {
        let err = ApiError::NotFound("no such report".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_data_access_body() {
        let err = ApiError::from(DataAccessError::Connection("DB Error".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal error");
        assert!(json["details"].as_str().unwrap().contains("DB Error"));
    }

    #[test]
    fn test_display() {
        let err = ApiError::DataAccess(DataAccessError::Task("cancelled".to_string()));
        assert_eq!(format!("{err}"), "Data access error: Query task failed: cancelled");
    }
}
