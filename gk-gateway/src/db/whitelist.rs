//! SQLite-backed [`WhitelistStore`]

use crate::whitelist::{WhitelistError, WhitelistResult, WhitelistStore};
use async_trait::async_trait;
use gk_common::api::VehicleEntry;
use gk_common::PlateCode;
use sqlx::SqlitePool;
use tracing::{debug, warn};

/// Whitelist stored in the `vehicles` table, keyed by plate
#[derive(Clone)]
pub struct SqliteWhitelist {
    pool: SqlitePool,
}

impl SqliteWhitelist {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WhitelistStore for SqliteWhitelist {
    async fn add(&self, plate: &PlateCode, note: &str) -> WhitelistResult<()> {
        // Single statement: the conflict check and the insert cannot interleave
        let result = sqlx::query(
            "INSERT INTO vehicles (plate, note) VALUES (?, ?) ON CONFLICT(plate) DO NOTHING",
        )
        .bind(plate.as_str())
        .bind(note)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WhitelistError::AlreadyExists(plate.clone()));
        }
        debug!(plate = %plate, "Whitelist entry added");
        Ok(())
    }

    async fn remove(&self, plate: &PlateCode) -> WhitelistResult<bool> {
        let result = sqlx::query("DELETE FROM vehicles WHERE plate = ?")
            .bind(plate.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn contains(&self, plate: &PlateCode) -> WhitelistResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM vehicles WHERE plate = ?")
            .bind(plate.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn list_all(&self) -> WhitelistResult<Vec<VehicleEntry>> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT plate, note FROM vehicles ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(plate, note)| match PlateCode::new(plate.as_str()) {
                Ok(plate) => Some(VehicleEntry {
                    plate,
                    note: note.unwrap_or_default(),
                }),
                Err(e) => {
                    // Rows written by older tooling may hold raw, un-normalized text
                    warn!(plate = %plate, "Skipping whitelist row with invalid plate: {}", e);
                    None
                }
            })
            .collect())
    }
}
