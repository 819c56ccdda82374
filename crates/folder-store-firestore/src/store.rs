use async_trait::async_trait;
use folder_store_core::{Folder, FolderPatch, FolderStore, StoreError, FOLDERS_COLLECTION};
use tracing::{instrument, warn};

use crate::client::{FirestoreClient, FirestoreDocument};

/// `FolderStore` backed by the Firestore `folders` collection.
#[derive(Clone)]
pub struct FirestoreFolderStore {
    client: FirestoreClient,
}

impl FirestoreFolderStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn decode(document: &FirestoreDocument) -> Result<Folder, StoreError> {
        Folder::from_fields(document.id(), document.decoded_fields()?)
    }

    /// Decode a page of documents, skipping those that do not fit the model.
    fn decode_all(documents: &[FirestoreDocument]) -> Vec<Folder> {
        let mut folders = Vec::with_capacity(documents.len());
        for document in documents {
            match Self::decode(document) {
                Ok(folder) => folders.push(folder),
                Err(e) => warn!("Skipping undecodable folder {}: {}", document.id(), e),
            }
        }
        folders
    }
}

#[async_trait]
impl FolderStore for FirestoreFolderStore {
    #[instrument(skip(self, token), level = "debug")]
    async fn list_by_owner(&self, token: &str, user_id: &str) -> Result<Vec<Folder>, StoreError> {
        let documents = self
            .client
            .query_equal(token, FOLDERS_COLLECTION, "userId", user_id)
            .await?;
        Ok(Self::decode_all(&documents))
    }

    #[instrument(skip(self, token), level = "debug")]
    async fn list_all(&self, token: &str) -> Result<Vec<Folder>, StoreError> {
        let documents = self
            .client
            .list_documents(token, FOLDERS_COLLECTION)
            .await?;
        Ok(Self::decode_all(&documents))
    }

    #[instrument(skip(self, token), level = "debug")]
    async fn get(&self, token: &str, id: &str) -> Result<Option<Folder>, StoreError> {
        match self
            .client
            .get_document(token, FOLDERS_COLLECTION, id)
            .await?
        {
            Some(document) => Ok(Some(Self::decode(&document)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, token, patch), level = "debug")]
    async fn update(&self, token: &str, id: &str, patch: &FolderPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Err(StoreError::InvalidData(format!("empty patch for folder {}", id)));
        }
        let fields = patch.to_fields()?;
        self.client
            .patch_document(token, FOLDERS_COLLECTION, id, &fields)
            .await
    }

    #[instrument(skip(self, token), level = "debug")]
    async fn delete(&self, token: &str, id: &str) -> Result<(), StoreError> {
        self.client
            .delete_document(token, FOLDERS_COLLECTION, id)
            .await
    }
}
