//! The tiered cache store.

use derive_more::Display;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use crate::error::ErrorKind;
use crate::tier::{MemoryTier, Tier, TierHandle};
use crate::{Asset, CacheKey, Capability, Detector, Preferences, is_document_path};

/// Result of a [`CacheService::set`].
///
/// A policy rejection is an expected outcome, not a failure, and is logged
/// as such.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    #[display("accepted")]
    Accepted,
    #[display("rejected by policy")]
    RejectedByPolicy,
    #[display("failed")]
    Failed,
}

/// What [`CacheService::clear`] removes.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    /// Remembered documents and their flag records only.
    #[display("lastpages")]
    LastVisitedPages,
    /// The whole tier, the front layer and all flag records.
    #[display("all")]
    Everything,
}

impl FromStr for ClearScope {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lastpages" | "lastvisitedpages" => Ok(Self::LastVisitedPages),
            "all" | "everything" => Ok(Self::Everything),
            _ => Err(ErrorKind::InvalidScope(s.to_string())),
        }
    }
}

/// Status snapshot returned by [`CacheService::count`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("{capability}: {items} items")]
pub struct CacheCount {
    pub capability: Capability,
    pub items: u64,
}

/// Uniform cache front over whichever tier the [`Detector`] selects.
///
/// Nothing here returns an error: tier failures are logged and reported as
/// [`Outcome::Failed`], an absent value, or a zero count. Callers treat
/// "absent" and "failed" the same way.
///
/// # Examples
///
/// ```
/// use zimview_cache::{Asset, CacheService, Detector, DetectorOptions, Outcome, Preferences};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = CacheService::new(Detector::new(DetectorOptions::default()), Preferences::in_memory());
/// let outcome = cache.set("wiki.zim@-/s.css", Asset::from("body{}")).await;
/// assert_eq!(outcome, Outcome::Accepted);
/// assert_eq!(cache.get("wiki.zim@-/s.css").await, Some(Asset::from("body{}")));
/// # }
/// ```
#[derive(Debug)]
pub struct CacheService {
    detector: Detector,
    preferences: Preferences,
    /// Fast layer in front of the structured tier.
    front: MemoryTier,
}

impl CacheService {
    pub fn new(detector: Detector, preferences: Preferences) -> Self {
        Self { detector, preferences, front: MemoryTier::default() }
    }

    /// Selected capability; [`Capability::Unknown`] until first use.
    pub fn capability(&self) -> Capability {
        self.detector.capability()
    }

    /// Run detection now rather than on first use.
    pub async fn detect(&self) -> Capability {
        self.detector.detect().await
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    async fn tier(&self) -> TierHandle {
        self.detector.tier().await
    }

    fn uses_front(tier: &TierHandle) -> bool {
        tier.capability() == Capability::Structured
    }

    /// Look up a value.
    ///
    /// Document keys are answered from the flag index first: if the archive's
    /// remembered path is a different document, the tier is never touched.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, key: &str) -> Option<Asset> {
        if !self.preferences.cache_assets() {
            return None;
        }
        match CacheKey::parse(key) {
            CacheKey::Document { archive, path } => self.get_document(&archive, &path).await.map(Asset::Text),
            CacheKey::Asset(key) => self.get_asset(&key).await,
        }
    }

    async fn get_asset(&self, key: &str) -> Option<Asset> {
        let tier = self.tier().await;
        let front = Self::uses_front(&tier);
        if front {
            if let Ok(Some(asset)) = self.front.get(key).await {
                debug!(key, "front layer hit");
                return Some(asset);
            }
        }
        match tier.get(key).await {
            Ok(Some(asset)) => {
                debug!(key, tier = %tier.capability(), "cache hit");
                if front {
                    _ = self.front.put(key, &asset).await;
                }
                Some(asset)
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, tier = %tier.capability(), error = ?e, "cache read failed");
                None
            },
        }
    }

    /// Store a value.
    #[instrument(level = "debug", skip(self, asset), fields(bytes = asset.len()))]
    pub async fn set(&self, key: &str, asset: Asset) -> Outcome {
        if !self.preferences.cache_assets() {
            info!(key, "asset caching disabled; not stored");
            return Outcome::RejectedByPolicy;
        }
        match CacheKey::parse(key) {
            CacheKey::Document { archive, path } => self.store_document(&archive, &path, &asset).await,
            CacheKey::Asset(key) => {
                let tier = self.tier().await;
                match tier.put(&key, &asset).await {
                    Ok(()) => {
                        if Self::uses_front(&tier) {
                            _ = self.front.put(&key, &asset).await;
                        }
                        Outcome::Accepted
                    },
                    Err(e) => {
                        warn!(key, tier = %tier.capability(), error = ?e, "cache write failed");
                        Outcome::Failed
                    },
                }
            },
        }
    }

    /// Remember `content` as the last visited document of `archive`.
    ///
    /// Each archive has one slot; storing a new document replaces the
    /// previous one.
    #[instrument(level = "debug", skip(self, content), fields(bytes = content.len()))]
    pub async fn set_document(&self, archive: &str, path: &str, content: &str) -> Outcome {
        self.store_document(archive, path, &Asset::from(content)).await
    }

    async fn store_document(&self, archive: &str, path: &str, asset: &Asset) -> Outcome {
        // Documents are assets too; either flag can veto them.
        if !self.preferences.cache_assets() {
            info!(archive, path, "asset caching disabled; not stored");
            return Outcome::RejectedByPolicy;
        }
        if !self.preferences.remember_last_page() {
            info!(archive, path, "remembering last page disabled; not stored");
            return Outcome::RejectedByPolicy;
        }
        let tier = self.tier().await;
        match tier.put(archive, asset).await {
            Ok(()) => {
                self.preferences.set_last_page(archive, path);
                Outcome::Accepted
            },
            Err(e) => {
                warn!(archive, path, tier = %tier.capability(), error = ?e, "document write failed");
                Outcome::Failed
            },
        }
    }

    /// The remembered document of `archive`, if it is `path`.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_document(&self, archive: &str, path: &str) -> Option<String> {
        if !self.preferences.remember_last_page() {
            return None;
        }
        if self.preferences.last_page(archive).as_deref() != Some(path) {
            return None;
        }
        let tier = self.tier().await;
        match tier.get(archive).await {
            Ok(Some(Asset::Text(content))) => Some(content),
            Ok(Some(Asset::Binary(_))) | Ok(None) => None,
            Err(e) => {
                warn!(archive, tier = %tier.capability(), error = ?e, "document read failed");
                None
            },
        }
    }

    /// Remove one value. Returns whether anything was removed.
    #[instrument(level = "debug", skip(self))]
    pub async fn delete(&self, key: &str) -> bool {
        let tier = self.tier().await;
        let result = match CacheKey::parse(key) {
            CacheKey::Document { archive, path } => {
                if self.preferences.last_page(&archive).as_deref() != Some(path.as_str()) {
                    return false;
                }
                self.preferences.remove_last_page(&archive);
                tier.delete(&archive).await
            },
            CacheKey::Asset(key) => {
                _ = self.front.delete(&key).await;
                tier.delete(&key).await
            },
        };
        result.unwrap_or_else(|e| {
            warn!(key, tier = %tier.capability(), error = ?e, "cache delete failed");
            false
        })
    }

    /// Remove entries and report how many went.
    #[instrument(skip(self))]
    pub async fn clear(&self, scope: ClearScope) -> u64 {
        let tier = self.tier().await;
        let removed = match scope {
            ClearScope::LastVisitedPages => {
                let mut removed = 0;
                for (archive, path) in self.preferences.last_pages() {
                    if !is_document_path(&path) {
                        continue;
                    }
                    if let Err(e) = tier.delete(&archive).await {
                        warn!(archive, tier = %tier.capability(), error = ?e, "could not delete remembered page");
                    }
                    self.preferences.remove_last_page(&archive);
                    removed += 1;
                }
                removed
            },
            ClearScope::Everything => {
                self.preferences.clear_last_pages();
                _ = self.front.clear().await;
                tier.clear().await.unwrap_or_else(|e| {
                    warn!(tier = %tier.capability(), error = ?e, "cache clear failed");
                    0
                })
            },
        };
        info!(%scope, removed, tier = %tier.capability(), "cache cleared");
        removed
    }

    /// Tier name and item count, for status reporting.
    pub async fn count(&self) -> CacheCount {
        let tier = self.tier().await;
        let capability = tier.capability();
        let items = tier.count().await.unwrap_or_else(|e| {
            warn!(tier = %capability, error = ?e, "cache count failed");
            0
        });
        CacheCount { capability, items }
    }

    /// Toggle asset caching.
    pub fn set_cache_assets(&self, enabled: bool) {
        self.preferences.set_cache_assets(enabled);
    }

    /// Toggle last-page memory. Turning it off forgets every remembered page.
    pub async fn set_remember_last_page(&self, enabled: bool) {
        self.preferences.set_remember_last_page(enabled);
        if !enabled {
            self.clear(ClearScope::LastVisitedPages).await;
        }
    }
}
