//! In-memory query cache.
//!
//! Holds the (query-key -> data) mapping the UI renders from. Entries are
//! written by fetch completions and invalidated by mutation success
//! callbacks or realtime push handlers; those are the only writers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

/// Hierarchical cache key: an entity segment followed by scope segments,
/// e.g. `["messages", "<conversation-id>"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn entity(entity: &str) -> Self {
        Self(vec![entity.to_string()])
    }

    pub fn scoped(mut self, segment: impl ToString) -> Self {
        self.0.push(segment.to_string());
        self
    }

    fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

/// One cached query result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
}

/// The shared cache. Lives behind the client's lock; the embedder's event
/// loop serializes access.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, CacheEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store fresh data for a key, clearing any stale flag.
    pub fn set(&mut self, key: QueryKey, value: Value, fetched_at: DateTime<Utc>) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at,
                stale: false,
            },
        );
    }

    pub fn get(&self, key: &QueryKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Mark one key stale. The entry stays readable until refetched.
    pub fn invalidate(&mut self, key: &QueryKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.stale = true;
            debug!(key = %key, "query invalidated");
        }
    }

    /// Mark every key under a prefix stale, e.g. all message pages of a
    /// conversation.
    pub fn invalidate_prefix(&mut self, prefix: &QueryKey) {
        let mut count = 0;
        for (key, entry) in self.entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.stale = true;
                count += 1;
            }
        }
        if count > 0 {
            debug!(prefix = %prefix, count, "queries invalidated by prefix");
        }
    }

    /// Drop everything, e.g. on sign-out.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_invalidate_marks_stale() {
        let mut cache = QueryCache::new();
        let key = QueryKey::entity("profiles").scoped("abc");

        cache.set(key.clone(), json!({"username": "ada"}), Utc::now());
        assert!(!cache.get(&key).unwrap().stale);

        cache.invalidate(&key);
        let entry = cache.get(&key).unwrap();
        assert!(entry.stale);
        assert_eq!(entry.value["username"], "ada");
    }

    #[test]
    fn prefix_invalidation_spares_other_entities() {
        let mut cache = QueryCache::new();
        let page_one = QueryKey::entity("messages").scoped("conv-1").scoped(0);
        let page_two = QueryKey::entity("messages").scoped("conv-1").scoped(1);
        let other = QueryKey::entity("messages").scoped("conv-2").scoped(0);

        let now = Utc::now();
        cache.set(page_one.clone(), json!([]), now);
        cache.set(page_two.clone(), json!([]), now);
        cache.set(other.clone(), json!([]), now);

        cache.invalidate_prefix(&QueryKey::entity("messages").scoped("conv-1"));

        assert!(cache.get(&page_one).unwrap().stale);
        assert!(cache.get(&page_two).unwrap().stale);
        assert!(!cache.get(&other).unwrap().stale);
    }

    #[test]
    fn refetch_clears_stale_flag() {
        let mut cache = QueryCache::new();
        let key = QueryKey::entity("channels");

        cache.set(key.clone(), json!([]), Utc::now());
        cache.invalidate(&key);
        cache.set(key.clone(), json!([{"name": "general"}]), Utc::now());
        assert!(!cache.get(&key).unwrap().stale);
    }
}
