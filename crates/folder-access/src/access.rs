//! Folder access layer.
//!
//! Reads go through the owner-filtered list and land in the query cache.
//! Writes follow the mutate-then-refetch protocol: one targeted update or
//! delete, then an unconditional re-read of the collection, then a wholesale
//! replacement of the cached list. There is no optimistic concurrency check:
//! the last write to reach the store wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use folder_store_core::{
    Folder, FolderDocument, FolderPatch, FolderStatus, FolderStore, NewFolder, Session, StoreError,
};
use tokio::sync::watch;

use crate::api::{pdf_file_name, FolderApiClient};
use crate::cache::{CacheMessage, CachedList, QueryCache, QueryKey};
use crate::events::{AccessEvent, EventSink, Operation};
use crate::Result;

/// Which folders the refetch after a mutation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RefetchScope {
    /// Only the session user's folders, like the list operation.
    #[default]
    Owner,
    /// The whole collection, unfiltered.
    All,
}

/// How `attach_documents` combines new documents with the stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachMode {
    /// The stored sequence is replaced by the new one.
    #[default]
    Replace,
    /// The new documents are added after the stored ones.
    Append,
}

#[derive(Debug, Clone)]
pub struct AccessOptions {
    pub refetch_scope: RefetchScope,
    /// Age after which `folders` stops serving the cached list.
    pub stale_after: Duration,
    /// Directory receiving PDF exports.
    pub download_dir: PathBuf,
}

impl Default for AccessOptions {
    fn default() -> Self {
        Self {
            refetch_scope: RefetchScope::Owner,
            stale_after: Duration::from_secs(30),
            download_dir: PathBuf::from("."),
        }
    }
}

enum Mutation {
    Update(FolderPatch),
    AppendDocuments(Vec<FolderDocument>),
    Delete,
}

/// Cached, session-scoped access to the folder store.
pub struct FolderAccessLayer {
    store: Arc<dyn FolderStore>,
    api: FolderApiClient,
    cache: Arc<QueryCache>,
    events: Arc<dyn EventSink>,
    options: AccessOptions,
}

impl FolderAccessLayer {
    pub fn new(
        store: Arc<dyn FolderStore>,
        api: FolderApiClient,
        cache: Arc<QueryCache>,
        events: Arc<dyn EventSink>,
        options: AccessOptions,
    ) -> Self {
        Self {
            store,
            api,
            cache,
            events,
            options,
        }
    }

    pub fn options(&self) -> &AccessOptions {
        &self.options
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fetch the session user's folders and replace the cached list.
    ///
    /// Fails with `AuthenticationMissing` before any store read when nobody is
    /// signed in.
    pub async fn list_folders(&self, session: &dyn Session) -> Result<Arc<Vec<Folder>>> {
        self.events.emit(AccessEvent::FetchStarted {
            user_id: session.user_id(),
        });

        let result = self.fetch_owned(session).await;
        self.report(Operation::List, result)
    }

    async fn fetch_owned(&self, session: &dyn Session) -> Result<Arc<Vec<Folder>>> {
        let user_id = session.require_user()?;
        let token = session.id_token(false).await?;
        let folders = self.store.list_by_owner(&token, &user_id).await?;

        self.events.emit(AccessEvent::FetchCompleted {
            user_id,
            count: folders.len(),
        });
        Ok(self.replace_list(Operation::List, folders))
    }

    /// The cached list when fresh, otherwise a new fetch.
    pub async fn folders(&self, session: &dyn Session) -> Result<Arc<Vec<Folder>>> {
        if let Some(cached) = self.cache.snapshot(QueryKey::FolderList) {
            if !cached.is_stale(self.options.stale_after) {
                return Ok(cached.folders);
            }
        }
        self.list_folders(session).await
    }

    /// The cached list, whatever its age.
    pub fn cached_folders(&self) -> Option<CachedList> {
        self.cache.snapshot(QueryKey::FolderList)
    }

    /// Observe replacements of the cached folder list.
    pub fn subscribe(&self) -> watch::Receiver<Option<CachedList>> {
        self.cache.subscribe(QueryKey::FolderList)
    }

    /// Drop the cached list so the next `folders` call refetches.
    pub fn invalidate(&self) {
        self.cache.apply(CacheMessage::Invalidate {
            key: QueryKey::FolderList,
        });
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn change_status(
        &self,
        session: &dyn Session,
        id: &str,
        status: FolderStatus,
    ) -> Result<Arc<Vec<Folder>>> {
        self.mutate_then_refetch(
            session,
            Operation::ChangeStatus,
            id,
            Mutation::Update(FolderPatch::status(status)),
        )
        .await
    }

    pub async fn change_mpr_number(
        &self,
        session: &dyn Session,
        id: &str,
        num_mpr: &str,
    ) -> Result<Arc<Vec<Folder>>> {
        self.mutate_then_refetch(
            session,
            Operation::ChangeMprNumber,
            id,
            Mutation::Update(FolderPatch::num_mpr(num_mpr)),
        )
        .await
    }

    pub async fn complete_folder(&self, session: &dyn Session, id: &str) -> Result<Arc<Vec<Folder>>> {
        self.mutate_then_refetch(
            session,
            Operation::Complete,
            id,
            Mutation::Update(FolderPatch::completed()),
        )
        .await
    }

    /// Attach documents to a folder; `AttachMode::Replace` overwrites the stored sequence.
    pub async fn attach_documents(
        &self,
        session: &dyn Session,
        id: &str,
        documents: Vec<FolderDocument>,
        mode: AttachMode,
    ) -> Result<Arc<Vec<Folder>>> {
        let mutation = match mode {
            AttachMode::Replace => Mutation::Update(FolderPatch::documents(documents)),
            AttachMode::Append => Mutation::AppendDocuments(documents),
        };
        self.mutate_then_refetch(session, Operation::AttachDocuments, id, mutation)
            .await
    }

    pub async fn delete_folder(&self, session: &dyn Session, id: &str) -> Result<Arc<Vec<Folder>>> {
        self.mutate_then_refetch(session, Operation::Delete, id, Mutation::Delete)
            .await
    }

    async fn mutate_then_refetch(
        &self,
        session: &dyn Session,
        op: Operation,
        id: &str,
        mutation: Mutation,
    ) -> Result<Arc<Vec<Folder>>> {
        self.events.emit(AccessEvent::MutationStarted {
            op,
            folder_id: id.to_string(),
        });

        let result = self.run_mutation(session, op, id, mutation).await;
        self.report(op, result)
    }

    async fn run_mutation(
        &self,
        session: &dyn Session,
        op: Operation,
        id: &str,
        mutation: Mutation,
    ) -> Result<Arc<Vec<Folder>>> {
        let user_id = session.require_user()?;
        let token = session.id_token(false).await?;

        // 1. Write. A failure here leaves the cache untouched.
        match mutation {
            Mutation::Update(patch) => self.store.update(&token, id, &patch).await?,
            Mutation::AppendDocuments(documents) => {
                let folder = self
                    .store
                    .get(&token, id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
                let mut merged = folder.documents;
                merged.extend(documents);
                self.store
                    .update(&token, id, &FolderPatch::documents(merged))
                    .await?
            }
            Mutation::Delete => self.store.delete(&token, id).await?,
        }
        self.events.emit(AccessEvent::MutationApplied {
            op,
            folder_id: id.to_string(),
        });

        // 2. Refetch. A failure here leaves the write in place and the cache stale.
        let folders = match self.options.refetch_scope {
            RefetchScope::Owner => self.store.list_by_owner(&token, &user_id).await?,
            RefetchScope::All => self.store.list_all(&token).await?,
        };

        // 3. Replace.
        Ok(self.replace_list(op, folders))
    }

    fn replace_list(&self, op: Operation, folders: Vec<Folder>) -> Arc<Vec<Folder>> {
        let count = folders.len();
        let folders = self
            .cache
            .apply(CacheMessage::folder_list(folders))
            .unwrap_or_default();
        self.events.emit(AccessEvent::CacheReplaced { op, count });
        folders
    }

    // =========================================================================
    // HTTP operations
    // =========================================================================

    /// Download a folder's PDF export to `<download_dir>/synthese-<id>.pdf`.
    ///
    /// The folder is read first; a missing folder fails with `NotFound`
    /// before the export endpoint is called. The cache is not touched.
    pub async fn download_folder_pdf(&self, session: &dyn Session, id: &str) -> Result<PathBuf> {
        self.events.emit(AccessEvent::ExportStarted {
            folder_id: id.to_string(),
        });

        let result = self
            .export_to(session, id, &self.options.download_dir)
            .await
            .map(|(path, bytes)| {
                self.events.emit(AccessEvent::ExportCompleted {
                    folder_id: id.to_string(),
                    path: path.clone(),
                    bytes,
                });
                path
            });
        self.report(Operation::ExportPdf, result)
    }

    async fn export_to(
        &self,
        session: &dyn Session,
        id: &str,
        dir: &Path,
    ) -> Result<(PathBuf, usize)> {
        session.require_user()?;
        let token = session.id_token(true).await?;

        if self.store.get(&token, id).await?.is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let bytes = self.api.export_pdf(&token, id).await?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(pdf_file_name(id));
        tokio::fs::write(&path, &bytes).await?;
        Ok((path, bytes.len()))
    }

    /// Create a folder through the HTTP API.
    ///
    /// The cached list is left as is; call `list_folders` to pick the new folder up.
    pub async fn create_folder(&self, session: &dyn Session, folder: &NewFolder) -> Result<Folder> {
        let result = async {
            session.require_user()?;
            let token = session.id_token(true).await?;
            self.api.create_folder(&token, folder).await
        }
        .await
        .map(|created| {
            self.events.emit(AccessEvent::FolderCreated {
                folder_id: created.id.clone(),
            });
            created
        });
        self.report(Operation::Create, result)
    }

    /// Emit a failure event for `result` if it is an error, then hand it back.
    fn report<T>(&self, op: Operation, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.events.emit(AccessEvent::OperationFailed {
                op,
                error: e.to_string(),
            });
        }
        result
    }
}
