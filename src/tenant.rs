//! Per-request tenant connection factory.
//!
//! A `TenantPool` is opened from a freshly resolved descriptor, used for the
//! queries of exactly one request, and closed before the response is sent.
//! Handlers run their queries in a helper and await `close` on every exit
//! path; nothing tenant-side survives between requests.

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use crate::error::DataSourceError;
use crate::registry::TenantDescriptor;

// ---

/// A connection pool scoped to one request against one tenant database.
pub struct TenantPool {
    pool: MySqlPool,
}

impl TenantPool {
    /// Open a pool for the described tenant database.
    ///
    /// Establishes an initial connection eagerly, so an unreachable host or
    /// rejected credentials surface here as `DataSourceError::Connection`
    /// rather than on the first query.
    pub async fn connect(
        descriptor: &TenantDescriptor,
        max_connections: u32,
    ) -> Result<Self, DataSourceError> {
        // ---
        let options = MySqlConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .username(&descriptor.user)
            .password(&descriptor.password)
            .database(&descriptor.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(DataSourceError::Connection)?;

        Ok(TenantPool { pool })
    }

    /// Handle for running queries against the tenant database.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Close all connections. Consumes the pool so it cannot be reused.
    pub async fn close(self) {
        // ---
        self.pool.close().await;
    }
}
