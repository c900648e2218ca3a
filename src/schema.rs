//! Admin registry schema management for `envairo-metrics`.
//!
//! Ensures the `apps` registry table exists before serving requests. Tenant
//! databases are owned by external ingestion and are never created or
//! migrated here; only their descriptors live in the admin database.

use anyhow::Result;
use sqlx::MySqlPool;

// ---

/// Create the admin registry schema (idempotent).
///
/// The `apps` table maps an app id to a JSON connection descriptor for the
/// tenant database backing that app. Safe to call on every startup; no-op if
/// the table already exists.
///
/// Errors are propagated if SQL execution fails.
pub async fn create_schema(pool: &MySqlPool) -> Result<()> {
    // ---
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS apps (
            id          INT AUTO_INCREMENT PRIMARY KEY,
            name        VARCHAR(255) NOT NULL,
            description TEXT,
            db_config   TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
