//! Error taxonomy for the tenant data pipeline.
//!
//! Batch-level failures (configuration, connection, query) abort the request
//! and map to an HTTP response here; per-row decode failures never reach this
//! type (see `decode`). Callers get a generic message; full detail goes to
//! the operator logs only, so tenant credentials never leak into responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

// ---

#[derive(Error, Debug)]
pub enum DataSourceError {
    /// App id does not resolve to a configured tenant.
    #[error("app '{0}' is not configured")]
    UnknownApp(String),

    /// Tenant descriptor exists but its JSON does not parse.
    #[error("invalid db_config for app '{app_id}': {source}")]
    BadDescriptor {
        app_id: String,
        source: serde_json::Error,
    },

    /// Tenant database unreachable or credentials rejected.
    #[error("tenant database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    /// A query against the admin or a tenant database failed.
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Generic error body, mirroring `{"message": "..."}` across endpoints.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for DataSourceError {
    fn into_response(self) -> Response {
        // ---
        // Debug output carries the source chain; none of it reaches the body.
        error!("request failed: {self:?}");

        let (status, message) = match self {
            DataSourceError::UnknownApp(_) => (StatusCode::NOT_FOUND, self.to_string()),
            DataSourceError::BadDescriptor { .. }
            | DataSourceError::Connection(_)
            | DataSourceError::Query(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error fetching data".to_string(),
            ),
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}
