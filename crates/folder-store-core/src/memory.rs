use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::folder::Folder;
use crate::store::{FolderPatch, FolderStore};

/// In-process folder store.
///
/// Keeps folders in insertion order and assigns IDs on insert. Read and write
/// counters, plus one-shot failure switches, make it usable as a test double
/// for the remote store.
#[derive(Default)]
pub struct MemoryFolderStore {
    folders: RwLock<Vec<Folder>>,
    next_id: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
    fail_next_read: AtomicBool,
    fail_next_write: AtomicBool,
}

impl MemoryFolderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a folder, assigning a fresh ID. Returns the ID.
    pub fn insert(&self, mut folder: Folder) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("folder-{}", n);
        folder.id = id.clone();
        self.folders
            .write()
            .expect("memory store poisoned")
            .push(folder);
        id
    }

    /// Current contents, bypassing counters and failure switches.
    pub fn snapshot(&self) -> Vec<Folder> {
        self.folders.read().expect("memory store poisoned").clone()
    }

    /// Number of read calls served (list or get).
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write calls served (update or delete).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make the next read call fail with a backend error.
    pub fn fail_next_read(&self) {
        self.fail_next_read.store(true, Ordering::SeqCst);
    }

    /// Make the next write call fail with a backend error.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    fn begin_read(&self) -> Result<(), StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected read failure".to_string()));
        }
        Ok(())
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FolderStore for MemoryFolderStore {
    async fn list_by_owner(&self, _token: &str, user_id: &str) -> Result<Vec<Folder>, StoreError> {
        self.begin_read()?;
        let folders = self.folders.read().expect("memory store poisoned");
        Ok(folders
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self, _token: &str) -> Result<Vec<Folder>, StoreError> {
        self.begin_read()?;
        Ok(self.snapshot())
    }

    async fn get(&self, _token: &str, id: &str) -> Result<Option<Folder>, StoreError> {
        self.begin_read()?;
        let folders = self.folders.read().expect("memory store poisoned");
        Ok(folders.iter().find(|f| f.id == id).cloned())
    }

    async fn update(&self, _token: &str, id: &str, patch: &FolderPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Err(StoreError::InvalidData(format!("empty patch for folder {}", id)));
        }
        self.begin_write()?;
        let mut folders = self.folders.write().expect("memory store poisoned");
        let folder = folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply_to(folder);
        debug!("Updated folder {} in memory", id);
        Ok(())
    }

    async fn delete(&self, _token: &str, id: &str) -> Result<(), StoreError> {
        self.begin_write()?;
        let mut folders = self.folders.write().expect("memory store poisoned");
        folders.retain(|f| f.id != id);
        debug!("Deleted folder {} from memory", id);
        Ok(())
    }
}
