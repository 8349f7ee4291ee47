//! SQLite persistence for the whitelist
//!
//! The database file is created on first run. Existing `vehicles` tables
//! with the same `(plate, note)` layout are reused as-is.

use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

mod whitelist;
pub use whitelist::SqliteWhitelist;

/// Open (creating if needed) the gateway database and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL keeps whitelist reads from blocking on operator writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_vehicles_table(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the schema applied
pub async fn init_memory_database() -> Result<SqlitePool> {
    // One connection: every pooled connection to :memory: would be its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_vehicles_table(&pool).await?;
    Ok(pool)
}

async fn create_vehicles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehicles (
            plate TEXT PRIMARY KEY,
            note TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
