//! Storage tiers.
//!
//! Each tier speaks its own native API (SQL transactions, flat files, a
//! plain map). The [`Tier`] trait hides that behind one asynchronous
//! contract so nothing above this module ever branches on which tier is in
//! use.

mod directory;
mod memory;
mod sqlite;

pub use self::directory::DirectoryTier;
pub use self::memory::MemoryTier;
pub use self::sqlite::SqliteTier;
use crate::Asset;
use crate::Capability;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub type TierHandle = Arc<dyn Tier + Send + Sync>;

/// Uniform key/value interface over one storage backend.
///
/// Tier errors are allowed here; [`CacheService`](crate::CacheService) is
/// responsible for absorbing them.
#[async_trait]
pub trait Tier: Send + Sync {
    /// Which capability this tier implements.
    fn capability(&self) -> Capability;

    /// Fetch a value. Absent keys are `Ok(None)`, not errors.
    async fn get(&self, key: &str) -> Result<Option<Asset>>;

    /// Insert or overwrite a value.
    async fn put(&self, key: &str, asset: &Asset) -> Result<()>;

    /// Remove a value. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove everything. Returns the number of removed entries.
    async fn clear(&self) -> Result<u64>;

    /// Number of stored entries.
    async fn count(&self) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    //! Behaviour every tier must share.

    use super::*;

    async fn tiers() -> (tempfile::TempDir, Vec<TierHandle>) {
        let dir = tempfile::tempdir().unwrap();
        let sqlite = SqliteTier::connect_in_memory().await.unwrap();
        let directory = DirectoryTier::new(dir.path().join("assets")).await.unwrap();
        let tiers: Vec<TierHandle> = vec![Arc::new(sqlite), Arc::new(directory), Arc::new(MemoryTier::default())];
        (dir, tiers)
    }

    #[tokio::test]
    async fn test_round_trip_on_every_tier() {
        let (_dir, tiers) = tiers().await;
        for tier in tiers {
            let text = Asset::from("body{color:red}");
            let binary = Asset::from(vec![0x89, b'P', b'N', b'G', 0x00]);
            tier.put("archive@-/s.css", &text).await.unwrap();
            tier.put("archive@I/cat.png", &binary).await.unwrap();
            assert_eq!(tier.get("archive@-/s.css").await.unwrap(), Some(text), "{}", tier.capability());
            assert_eq!(tier.get("archive@I/cat.png").await.unwrap(), Some(binary), "{}", tier.capability());
            assert_eq!(tier.get("archive@-/missing.css").await.unwrap(), None);
            assert_eq!(tier.count().await.unwrap(), 2);
        }
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (_dir, tiers) = tiers().await;
        for tier in tiers {
            tier.put("k", &Asset::from("one")).await.unwrap();
            tier.put("k", &Asset::from("two")).await.unwrap();
            assert_eq!(tier.get("k").await.unwrap(), Some(Asset::from("two")));
            assert_eq!(tier.count().await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (_dir, tiers) = tiers().await;
        for tier in tiers {
            tier.put("a", &Asset::from("1")).await.unwrap();
            tier.put("b", &Asset::from("2")).await.unwrap();
            tier.put("c", &Asset::from("3")).await.unwrap();
            assert!(tier.delete("a").await.unwrap());
            assert!(!tier.delete("a").await.unwrap());
            assert_eq!(tier.clear().await.unwrap(), 2, "{}", tier.capability());
            assert_eq!(tier.count().await.unwrap(), 0);
            assert_eq!(tier.get("b").await.unwrap(), None);
        }
    }
}
