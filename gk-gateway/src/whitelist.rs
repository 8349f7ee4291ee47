//! Whitelist store contract
//!
//! The gateway only depends on this CRUD contract. The durable
//! implementation lives in [`crate::db::SqliteWhitelist`]; [`MemoryWhitelist`]
//! backs tests and throwaway runs.
//!
//! Every operation is atomic with respect to concurrent operations on the
//! same plate.

use async_trait::async_trait;
use gk_common::api::VehicleEntry;
use gk_common::PlateCode;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Whitelist failures. A duplicate add is reported apart from storage faults.
#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("Plate already whitelisted: {0}")]
    AlreadyExists(PlateCode),

    #[error("Whitelist storage error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type WhitelistResult<T> = std::result::Result<T, WhitelistError>;

/// Durable set of permitted plates with operator notes
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; the gateway shares one instance
/// across all request tasks.
#[async_trait]
pub trait WhitelistStore: Send + Sync {
    /// Insert `plate`; fails with `AlreadyExists` (and changes nothing) if present
    async fn add(&self, plate: &PlateCode, note: &str) -> WhitelistResult<()>;

    /// Delete `plate`; `Ok(false)` when it was not present
    async fn remove(&self, plate: &PlateCode) -> WhitelistResult<bool>;

    async fn contains(&self, plate: &PlateCode) -> WhitelistResult<bool>;

    /// Every entry; order is not part of the contract
    async fn list_all(&self) -> WhitelistResult<Vec<VehicleEntry>>;
}

/// In-memory whitelist
#[derive(Debug, Default)]
pub struct MemoryWhitelist {
    entries: RwLock<BTreeMap<PlateCode, String>>,
}

impl MemoryWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, convenient for tests
    pub fn with_plates<'a>(plates: impl IntoIterator<Item = &'a str>) -> Self {
        let entries = plates
            .into_iter()
            .filter_map(|p| PlateCode::new(p).ok())
            .map(|p| (p, String::new()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl WhitelistStore for MemoryWhitelist {
    async fn add(&self, plate: &PlateCode, note: &str) -> WhitelistResult<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(plate) {
            return Err(WhitelistError::AlreadyExists(plate.clone()));
        }
        entries.insert(plate.clone(), note.to_string());
        Ok(())
    }

    async fn remove(&self, plate: &PlateCode) -> WhitelistResult<bool> {
        Ok(self.entries.write().await.remove(plate).is_some())
    }

    async fn contains(&self, plate: &PlateCode) -> WhitelistResult<bool> {
        Ok(self.entries.read().await.contains_key(plate))
    }

    async fn list_all(&self) -> WhitelistResult<Vec<VehicleEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|(plate, note)| VehicleEntry {
                plate: plate.clone(),
                note: note.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn plate(s: &str) -> PlateCode {
        PlateCode::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_add_contains_remove_round_trip() {
        let store = MemoryWhitelist::new();
        let p = plate("AB1234");

        store.add(&p, "note").await.unwrap();
        assert!(store.contains(&p).await.unwrap());

        let dup = store.add(&p, "other note").await;
        assert!(matches!(dup, Err(WhitelistError::AlreadyExists(ref x)) if x == &p));

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].note, "note", "duplicate add must not overwrite");

        assert!(store.remove(&p).await.unwrap());
        assert!(!store.contains(&p).await.unwrap());
        assert!(!store.remove(&p).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_same_plate_admit_exactly_one() {
        let store = Arc::new(MemoryWhitelist::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.add(&plate("XY98765"), &format!("writer {i}")).await.is_ok()
            }));
        }

        let mut successes = 0;
        for h in handles {
            if h.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_with_plates_skips_invalid_codes() {
        let store = MemoryWhitelist::with_plates(["AB1234", "bad", "XY98765"]);
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }
}
