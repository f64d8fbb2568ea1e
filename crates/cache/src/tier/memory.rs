//! Memory tier: lives as long as the process and never fails.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::Tier;
use crate::error::Result;
use crate::{Asset, Capability};

/// In-memory key/value store.
///
/// Also used by [`CacheService`](crate::CacheService) as the fast front layer
/// in front of the structured tier.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<String, Asset>>,
}

#[async_trait]
impl Tier for MemoryTier {
    fn capability(&self) -> Capability {
        Capability::Memory
    }

    async fn get(&self, key: &str) -> Result<Option<Asset>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, asset: &Asset) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), asset.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn clear(&self) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries.read().await.len() as u64)
    }
}
