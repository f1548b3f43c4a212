//! Process-wide memo of children listings
//!
//! The cache maps a parent id to the ordered list of its children. Entries are
//! filled on demand and only dropped by [`CatalogCache::clear`], which the
//! navigator calls when credentials or the endpoint change. Failed fetches are
//! never stored, so the next lookup goes back to the network.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::CatalogSource;
use crate::app::models::CatalogItem;
use crate::errors::CatalogResult;

/// Shared children cache in front of a [`CatalogSource`]
///
/// Cloning is cheap and every clone sees the same entries, so background
/// derivation and propagation tasks can each hold one.
#[derive(Clone)]
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    entries: Arc<RwLock<HashMap<String, Arc<Vec<CatalogItem>>>>>,
}

impl CatalogCache {
    /// Create an empty cache over `source`
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Children of `parent_id`, fetched on a miss
    pub async fn children_of(&self, parent_id: &str) -> CatalogResult<Arc<Vec<CatalogItem>>> {
        if let Some(items) = self.entries.read().await.get(parent_id) {
            return Ok(Arc::clone(items));
        }

        debug!("Cache miss for parent '{}', fetching children", parent_id);
        let items = Arc::new(self.source.fetch_children(parent_id).await?);

        let mut entries = self.entries.write().await;
        // A concurrent fetch of the same parent may have landed first; keep it
        // so every reader sees one snapshot.
        let stored = entries
            .entry(parent_id.to_string())
            .or_insert_with(|| Arc::clone(&items));
        Ok(Arc::clone(stored))
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        debug!("Clearing catalog cache ({} entries)", entries.len());
        entries.clear();
    }

    /// Number of cached parents
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is cached
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// The collaborator behind this cache
    pub fn source(&self) -> &Arc<dyn CatalogSource> {
        &self.source
    }
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache").finish_non_exhaustive()
    }
}
