//! Device directory endpoint.
//!
//! `GET /api/data/devices?appId=…` lists the active device/location entries
//! from the tenant's `tbllocations` registry table, for building the
//! dashboard's device filter control. No payload decoding is involved.

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;

use crate::error::DataSourceError;
use crate::models::DeviceEntry;
use crate::registry;
use crate::tenant::TenantPool;
use crate::Config;

// ---

pub fn router() -> Router<(MySqlPool, Config)> {
    // ---
    Router::new().route("/api/data/devices", get(handler))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevicesQuery {
    app_id: Option<String>,
}

async fn handler(
    Query(params): Query<DevicesQuery>,
    State((admin_pool, config)): State<(MySqlPool, Config)>,
) -> impl IntoResponse {
    // ---
    let Some(app_id) = params.app_id.as_deref().filter(|id| !id.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "message": "App ID is required" })),
        )
            .into_response();
    };

    match list_devices(&admin_pool, &config, app_id).await {
        Ok(devices) => {
            info!("app {}: {} active devices", app_id, devices.len());
            (StatusCode::OK, Json(devices)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Active (non-soft-deleted) entries from the tenant's location registry.
/// The registry table is the same across dialects.
async fn list_devices(
    admin_pool: &MySqlPool,
    config: &Config,
    app_id: &str,
) -> Result<Vec<DeviceEntry>, DataSourceError> {
    // ---
    let descriptor = registry::lookup_app(admin_pool, app_id).await?;

    let tenant = TenantPool::connect(&descriptor, config.tenant_pool_max).await?;
    let result = sqlx::query_as::<_, DeviceEntry>(
        "SELECT deviceid, location FROM tbllocations WHERE isDeleted = 0",
    )
    .fetch_all(tenant.pool())
    .await
    .map_err(DataSourceError::from);
    tenant.close().await;

    result
}
