//! Tenant registry: resolves an app id to its database descriptor.
//!
//! The admin database holds one row per app with a JSON `db_config` column.
//! Descriptors are looked up fresh on every request so that admin-side
//! configuration changes take effect without a restart; nothing here is
//! cached.

use serde::Deserialize;
use sqlx::MySqlPool;

use crate::error::DataSourceError;

// ---

/// Table-layout differences between tenant databases.
///
/// The AQI deployment writes readings straight into a live table with no
/// soft-delete column; every other tenant archives into a history table
/// where rows are soft-deleted via `isDeleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingDialect {
    Live,
    History,
}

impl ReadingDialect {
    /// Physical table the readings query runs against.
    pub fn table(self) -> &'static str {
        // ---
        match self {
            ReadingDialect::Live => "tbldatareceiver",
            ReadingDialect::History => "tbldatareceiverhistory",
        }
    }

    /// Whether queries must exclude soft-deleted rows.
    pub fn filters_soft_deleted(self) -> bool {
        matches!(self, ReadingDialect::History)
    }
}

/// Connection descriptor for one tenant database, as stored in the
/// registry's `db_config` JSON column. Immutable for the request it was
/// resolved for.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantDescriptor {
    // ---
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3306
}

impl TenantDescriptor {
    /// Dialect is keyed off the tenant database name.
    pub fn dialect(&self) -> ReadingDialect {
        // ---
        if self.database.eq_ignore_ascii_case("aqi") {
            ReadingDialect::Live
        } else {
            ReadingDialect::History
        }
    }
}

// ---

/// Resolve an app id to its tenant descriptor.
///
/// Fails with `UnknownApp` when the id has no registry row and
/// `BadDescriptor` when the stored JSON does not parse.
pub async fn lookup_app(
    admin_pool: &MySqlPool,
    app_id: &str,
) -> Result<TenantDescriptor, DataSourceError> {
    // ---
    let row: Option<(String,)> = sqlx::query_as("SELECT db_config FROM apps WHERE id = ?")
        .bind(app_id)
        .fetch_optional(admin_pool)
        .await?;

    let (raw,) = row.ok_or_else(|| DataSourceError::UnknownApp(app_id.to_string()))?;

    serde_json::from_str(&raw).map_err(|source| DataSourceError::BadDescriptor {
        app_id: app_id.to_string(),
        source,
    })
}
