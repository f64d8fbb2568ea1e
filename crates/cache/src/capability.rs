//! Runtime storage capability detection.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::tier::{DirectoryTier, MemoryTier, SqliteTier, Tier, TierHandle};

/// Which storage tier serves the cache.
///
/// Ranked best-first: [`Structured`](Self::Structured) >
/// [`Simple`](Self::Simple) > [`Memory`](Self::Memory).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Detection has not run yet.
    #[default]
    #[display("No cache")]
    Unknown,
    #[display("SQLite")]
    #[serde(alias = "sqlite")]
    Structured,
    #[display("Directory")]
    #[serde(alias = "directory")]
    Simple,
    #[display("Memory")]
    Memory,
}

/// Where the persistent tiers live, and whether to skip the ranking.
#[derive(Debug, Clone, Default)]
pub struct DetectorOptions {
    /// SQLite database file for the structured tier. `None` disables it.
    pub database: Option<PathBuf>,
    /// Root directory for the simple tier. `None` disables it.
    pub directory: Option<PathBuf>,
    /// Only probe this tier (memory remains the fallback). `Unknown` runs
    /// the full ranking.
    pub force: Capability,
}

/// Probes the storage tiers once and remembers the winner.
///
/// Every probe performs a real operation against the tier (a count inside a
/// read transaction for SQLite, a directory scan for the simple tier), since
/// a tier that can be opened is not necessarily one that can be used. A
/// failing probe is logged and the next tier is tried; detection itself
/// never fails.
///
/// # Examples
///
/// ```
/// use zimview_cache::{Capability, Detector, DetectorOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let detector = Detector::new(DetectorOptions::default());
/// assert_eq!(detector.capability(), Capability::Unknown);
/// assert_eq!(detector.detect().await, Capability::Memory);
/// assert_eq!(detector.detect().await, Capability::Memory);
/// assert_eq!(detector.probes(), 1);
/// # }
/// ```
pub struct Detector {
    options: DetectorOptions,
    selected: OnceCell<(Capability, TierHandle)>,
    probes: AtomicU32,
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("options", &self.options)
            .field("capability", &self.capability())
            .field("probes", &self.probes())
            .finish()
    }
}

impl Detector {
    pub fn new(options: DetectorOptions) -> Self {
        Self { options, selected: OnceCell::new(), probes: AtomicU32::new(0) }
    }

    /// The detected capability, or [`Capability::Unknown`] if detection has
    /// not run yet.
    pub fn capability(&self) -> Capability {
        self.selected.get().map_or(Capability::Unknown, |(capability, _)| *capability)
    }

    /// Number of times the probing sequence actually ran.
    pub fn probes(&self) -> u32 {
        self.probes.load(Ordering::Relaxed)
    }

    /// Detect the best usable tier. Memoized after the first call.
    pub async fn detect(&self) -> Capability {
        self.selected().await.0
    }

    /// The tier selected by detection, running it first if needed.
    pub async fn tier(&self) -> TierHandle {
        Arc::clone(&self.selected().await.1)
    }

    async fn selected(&self) -> &(Capability, TierHandle) {
        self.selected.get_or_init(|| self.probe()).await
    }

    #[instrument(level = "debug", skip(self), fields(force = %self.options.force))]
    async fn probe(&self) -> (Capability, TierHandle) {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let force = self.options.force;
        if matches!(force, Capability::Unknown | Capability::Structured) {
            if let Some(tier) = self.probe_structured().await {
                return Self::select(tier);
            }
        }
        if matches!(force, Capability::Unknown | Capability::Simple) {
            if let Some(tier) = self.probe_simple().await {
                return Self::select(tier);
            }
        }
        Self::select(Arc::new(MemoryTier::default()))
    }

    fn select(tier: TierHandle) -> (Capability, TierHandle) {
        let capability = tier.capability();
        info!(tier = %capability, "cache tier selected");
        (capability, tier)
    }

    async fn probe_structured(&self) -> Option<TierHandle> {
        let path = self.options.database.as_ref()?;
        let tier = match SqliteTier::connect(path).await {
            Ok(tier) => tier,
            Err(e) => {
                warn!(path = %path.display(), error = ?e, "structured tier unavailable");
                return None;
            },
        };
        match tier.count().await {
            Ok(count) => {
                debug!(count, "structured tier probe succeeded");
                Some(Arc::new(tier))
            },
            Err(e) => {
                warn!(path = %path.display(), error = ?e, "structured tier rejected probe");
                tier.close().await;
                None
            },
        }
    }

    async fn probe_simple(&self) -> Option<TierHandle> {
        let path = self.options.directory.as_ref()?;
        let tier = match DirectoryTier::new(path).await {
            Ok(tier) => tier,
            Err(e) => {
                warn!(path = %path.display(), error = ?e, "simple tier unavailable");
                return None;
            },
        };
        match tier.count().await {
            Ok(count) => {
                debug!(count, "simple tier probe succeeded");
                Some(Arc::new(tier))
            },
            Err(e) => {
                warn!(path = %path.display(), error = ?e, "simple tier rejected probe");
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn options(dir: &tempfile::TempDir, force: Capability) -> DetectorOptions {
        DetectorOptions {
            database: Some(dir.path().join("cache.sqlite")),
            directory: Some(dir.path().join("assets")),
            force,
        }
    }

    #[rstest]
    #[case(Capability::Unknown, Capability::Structured)]
    #[case(Capability::Structured, Capability::Structured)]
    #[case(Capability::Simple, Capability::Simple)]
    #[case(Capability::Memory, Capability::Memory)]
    #[tokio::test]
    async fn test_ranking_and_force(#[case] force: Capability, #[case] expected: Capability) {
        let dir = tempfile::tempdir().unwrap();
        let detector = Detector::new(options(&dir, force));
        assert_eq!(detector.detect().await, expected);
        assert_eq!(detector.tier().await.capability(), expected);
    }

    #[tokio::test]
    async fn test_detect_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let detector = Detector::new(options(&dir, Capability::Unknown));
        assert_eq!(detector.capability(), Capability::Unknown);
        assert_eq!(detector.probes(), 0);
        let first = detector.detect().await;
        let second = detector.detect().await;
        let _ = detector.tier().await;
        assert_eq!(first, second);
        assert_eq!(detector.capability(), first);
        assert_eq!(detector.probes(), 1);
    }

    #[tokio::test]
    async fn test_unusable_tiers_fall_through() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where both the database's parent and the asset
        // directory are expected: neither tier can be opened.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let detector = Detector::new(DetectorOptions {
            database: Some(blocker.join("cache.sqlite")),
            directory: Some(blocker.join("assets")),
            force: Capability::Unknown,
        });
        assert_eq!(detector.detect().await, Capability::Memory);
    }

    #[tokio::test]
    async fn test_simple_when_structured_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let detector = Detector::new(DetectorOptions { database: None, ..options(&dir, Capability::Unknown) });
        assert_eq!(detector.detect().await, Capability::Simple);
    }

    #[rstest]
    #[case(Capability::Unknown, "No cache")]
    #[case(Capability::Structured, "SQLite")]
    #[case(Capability::Simple, "Directory")]
    #[case(Capability::Memory, "Memory")]
    fn test_display(#[case] capability: Capability, #[case] name: &str) {
        assert_eq!(capability.to_string(), name);
    }
}
