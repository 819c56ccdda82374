//! Client-side query cache.
//!
//! One entry per query key. Entries are replaced wholesale by explicit
//! `CacheMessage`s and observed through `tokio::sync::watch` receivers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use folder_store_core::Folder;
use tokio::sync::watch;
use tracing::debug;

/// Cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The folder list visible to the current session.
    FolderList,
}

/// A cached folder list and when it was fetched.
#[derive(Debug, Clone)]
pub struct CachedList {
    pub folders: Arc<Vec<Folder>>,
    pub fetched_at: Instant,
}

impl CachedList {
    pub fn is_stale(&self, stale_after: Duration) -> bool {
        self.fetched_at.elapsed() >= stale_after
    }
}

/// Explicit cache update.
#[derive(Debug, Clone)]
pub enum CacheMessage {
    /// The list under `key` changed; its new value is `folders`.
    ListChanged { key: QueryKey, folders: Vec<Folder> },
    /// Drop the entry under `key`; the next read refetches.
    Invalidate { key: QueryKey },
}

impl CacheMessage {
    pub fn folder_list(folders: Vec<Folder>) -> Self {
        CacheMessage::ListChanged {
            key: QueryKey::FolderList,
            folders,
        }
    }
}

type Entry = Option<CachedList>;

/// Query cache shared between the access layer and its readers.
#[derive(Default)]
pub struct QueryCache {
    entries: DashMap<QueryKey, watch::Sender<Entry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a message. Returns the new list for `ListChanged`.
    pub fn apply(&self, message: CacheMessage) -> Option<Arc<Vec<Folder>>> {
        match message {
            CacheMessage::ListChanged { key, folders } => {
                let folders = Arc::new(folders);
                let entry = CachedList {
                    folders: Arc::clone(&folders),
                    fetched_at: Instant::now(),
                };
                debug!("Cache {:?} replaced ({} folders)", key, folders.len());
                self.entries
                    .entry(key)
                    .or_insert_with(|| watch::channel(None).0)
                    .send_replace(Some(entry));
                Some(folders)
            }
            CacheMessage::Invalidate { key } => {
                if let Some(sender) = self.entries.get(&key) {
                    sender.send_replace(None);
                    debug!("Cache {:?} invalidated", key);
                }
                None
            }
        }
    }

    /// Current value under `key`.
    pub fn snapshot(&self, key: QueryKey) -> Option<CachedList> {
        let sender = self.entries.get(&key)?;
        let entry = sender.borrow().clone();
        entry
    }

    /// Observe every replacement of the entry under `key`.
    pub fn subscribe(&self, key: QueryKey) -> watch::Receiver<Option<CachedList>> {
        self.entries
            .entry(key)
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use folder_store_core::FolderStatus;

    fn folder(id: &str, status: FolderStatus) -> Folder {
        Folder {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            name: id.to_string(),
            date: Utc::now(),
            status,
            num_mpr: None,
            documents: Vec::new(),
            products: Vec::new(),
            pdf_link: String::new(),
            simulation_id: String::new(),
            completed: false,
        }
    }

    #[test]
    fn test_replace_is_wholesale() {
        let cache = QueryCache::new();
        cache.apply(CacheMessage::folder_list(vec![
            folder("a", FolderStatus::Pending),
            folder("b", FolderStatus::Pending),
        ]));
        cache.apply(CacheMessage::folder_list(vec![folder("c", FolderStatus::Done)]));

        let cached = cache.snapshot(QueryKey::FolderList).unwrap();
        let ids: Vec<_> = cached.folders.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn test_last_applied_message_wins() {
        // Two refetches resolving out of issue order: whichever is applied last is kept.
        let cache = QueryCache::new();
        let newer = vec![folder("a", FolderStatus::Cancel)];
        let older = vec![folder("a", FolderStatus::Done)];

        cache.apply(CacheMessage::folder_list(newer));
        cache.apply(CacheMessage::folder_list(older));

        let cached = cache.snapshot(QueryKey::FolderList).unwrap();
        assert_eq!(cached.folders[0].status, FolderStatus::Done);
    }

    #[test]
    fn test_invalidate() {
        let cache = QueryCache::new();
        cache.apply(CacheMessage::Invalidate {
            key: QueryKey::FolderList,
        });
        assert!(cache.snapshot(QueryKey::FolderList).is_none());

        cache.apply(CacheMessage::folder_list(vec![]));
        assert!(cache.snapshot(QueryKey::FolderList).is_some());
        cache.apply(CacheMessage::Invalidate {
            key: QueryKey::FolderList,
        });
        assert!(cache.snapshot(QueryKey::FolderList).is_none());
    }

    #[test]
    fn test_staleness() {
        let cache = QueryCache::new();
        cache.apply(CacheMessage::folder_list(vec![]));
        let cached = cache.snapshot(QueryKey::FolderList).unwrap();
        assert!(!cached.is_stale(Duration::from_secs(60)));
        assert!(cached.is_stale(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_subscribers_see_replacements() {
        let cache = QueryCache::new();
        let mut rx = cache.subscribe(QueryKey::FolderList);
        assert!(rx.borrow().is_none());

        cache.apply(CacheMessage::folder_list(vec![folder("a", FolderStatus::Pending)]));
        rx.changed().await.unwrap();
        let seen = rx.borrow_and_update().clone().unwrap();
        assert_eq!(seen.folders.len(), 1);
    }
}
