use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

/// One published rendition of a feed. Entries are never mutated after
/// publication, a refresh swaps in a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub body: String,
    pub content_type: String,
    pub cached_at: i64, // timestamp of publication in UTC
}

impl CacheEntry {
    pub fn new(body: String, content_type: String) -> Self {
        Self {
            body,
            content_type,
            cached_at: Utc::now().timestamp(),
        }
    }
}

/// Feed documents keyed by route.
#[derive(Debug, Default)]
pub struct FeedCache {
    entries: RwLock<HashMap<String, Arc<CacheEntry>>>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, route: &str) -> Option<Arc<CacheEntry>> {
        self.entries.read().await.get(route).cloned()
    }

    /// Replaces the entry for `route` and returns the previous one.
    pub async fn publish(&self, route: &str, entry: CacheEntry) -> Option<Arc<CacheEntry>> {
        self.entries
            .write()
            .await
            .insert(route.to_string(), Arc::new(entry))
    }
}
