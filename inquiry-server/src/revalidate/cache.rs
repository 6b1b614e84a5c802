//! In-process record of stale rendered pages.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::CacheScope;

/// Set of page paths whose cached render must be regenerated.
///
/// Invalidation only ever adds paths, so repeating or reordering
/// invalidations yields the same state. The webhook writes through
/// [`invalidate`](Self::invalidate). Whatever renders pages reads through
/// [`is_stale`](Self::is_stale) and [`take_stale`](Self::take_stale) before
/// serving a cached render.
#[derive(Clone, Default)]
pub struct PageCache {
    stale: Arc<RwLock<BTreeSet<&'static str>>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every path in `scope` stale. Returns the paths touched.
    pub async fn invalidate(&self, scope: CacheScope) -> Vec<&'static str> {
        let paths = scope.paths();
        let mut stale = self.stale.write().await;
        stale.extend(paths.iter().copied());

        info!(scope = ?scope, paths = ?paths, stale_total = stale.len(), "cache_invalidated");

        paths
    }

    /// Whether the cached render of `path` is out of date.
    pub async fn is_stale(&self, path: &str) -> bool {
        self.stale.read().await.contains(path)
    }

    /// Claim regeneration of `path`. True only for the first caller after
    /// an invalidation; concurrent renderers serving the same path see false
    /// and keep the previous render.
    pub async fn take_stale(&self, path: &str) -> bool {
        self.stale.write().await.remove(path)
    }

    /// Currently stale paths, sorted.
    pub async fn stale_paths(&self) -> Vec<&'static str> {
        self.stale.read().await.iter().copied().collect()
    }
}
