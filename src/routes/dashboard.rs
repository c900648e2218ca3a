//! Dashboard data endpoint: the one entry point into the tenant pipeline.
//!
//! `GET /api/data/dashboard` resolves the tenant, opens a request-scoped
//! pool, runs a single raw feed query, and serves both the decoded feed and
//! its hourly aggregation from that one batch. The tenant pool is closed on
//! every exit path before the response leaves the handler.

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{info, warn};

use crate::error::DataSourceError;
use crate::models::DashboardResponse;
use crate::pipeline::{self, RowLimit};
use crate::registry;
use crate::tenant::TenantPool;
use crate::Config;

// ---

pub fn router() -> Router<(MySqlPool, Config)> {
    // ---
    Router::new().route("/api/data/dashboard", get(handler))
}

/// Query parameters for the dashboard endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardQuery {
    app_id: Option<String>,
    device_id: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    /// Row cap: integer, or `"all"` for unbounded. Default 1000.
    limit: Option<String>,
}

async fn handler(
    Query(params): Query<DashboardQuery>,
    State((admin_pool, config)): State<(MySqlPool, Config)>,
) -> impl IntoResponse {
    // ---
    info!(
        "GET /api/data/dashboard - app: {:?}, device: {:?}, range: {:?}..{:?}, limit: {:?}",
        params.app_id, params.device_id, params.from_date, params.to_date, params.limit
    );

    let Some(app_id) = params.app_id.as_deref().filter(|id| !id.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "message": "App ID is required" })),
        )
            .into_response();
    };

    match dashboard_data(&admin_pool, &config, app_id, &params).await {
        Ok(body) => {
            info!(
                "dashboard for app {}: {} raw rows, {} hourly buckets",
                app_id,
                body.raw_data.len(),
                body.hourly_data.len()
            );
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

// ---

/// Resolve, query, aggregate. The tenant pool opened here is closed before
/// the result is returned, whether the pipeline succeeded or not.
async fn dashboard_data(
    admin_pool: &MySqlPool,
    config: &Config,
    app_id: &str,
    params: &DashboardQuery,
) -> Result<DashboardResponse, DataSourceError> {
    // ---
    let descriptor = registry::lookup_app(admin_pool, app_id).await?;
    let dialect = descriptor.dialect();

    let tenant = TenantPool::connect(&descriptor, config.tenant_pool_max).await?;
    let result = assemble(&tenant, dialect, params).await;
    tenant.close().await;
    result
}

async fn assemble(
    tenant: &TenantPool,
    dialect: registry::ReadingDialect,
    params: &DashboardQuery,
) -> Result<DashboardResponse, DataSourceError> {
    // ---
    let range = parse_range(params.from_date.as_deref(), params.to_date.as_deref());
    let limit = RowLimit::parse(params.limit.as_deref());

    let raw_data = pipeline::fetch_raw(
        tenant.pool(),
        dialect,
        params.device_id.as_deref(),
        range,
        limit,
    )
    .await?;
    let hourly_data = pipeline::aggregate(&raw_data);

    Ok(DashboardResponse {
        raw_data,
        hourly_data,
    })
}

// ---

/// Inclusive time range filter, both-or-neither: a lone bound or one that
/// does not parse disables the filter entirely.
fn parse_range(from: Option<&str>, to: Option<&str>) -> Option<(NaiveDateTime, NaiveDateTime)> {
    // ---
    let (from_raw, to_raw) = match (from, to) {
        (Some(f), Some(t)) => (f, t),
        _ => return None,
    };

    match (parse_time(from_raw), parse_time(to_raw)) {
        (Some(from), Some(to)) => Some((from, to)),
        _ => {
            warn!("unparseable date range {from_raw:?}..{to_raw:?}; ignoring range filter");
            None
        }
    }
}

/// Accepts `YYYY-MM-DDTHH:MM[:SS]` (HTML datetime-local), a space-separated
/// variant, or a bare date (midnight).
fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    // ---
    let raw = raw.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(t);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
