use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::folder::{Folder, FolderDocument, FolderStatus};

/// Name of the collection holding folder documents.
pub const FOLDERS_COLLECTION: &str = "folders";

/// Targeted partial update of a single folder.
///
/// Only the fields that are set are written; everything else is left as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderPatch {
    pub status: Option<FolderStatus>,
    pub num_mpr: Option<String>,
    pub completed: Option<bool>,
    pub documents: Option<Vec<FolderDocument>>,
}

impl FolderPatch {
    pub fn status(status: FolderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn num_mpr(num_mpr: impl Into<String>) -> Self {
        Self {
            num_mpr: Some(num_mpr.into()),
            ..Default::default()
        }
    }

    pub fn completed() -> Self {
        Self {
            completed: Some(true),
            ..Default::default()
        }
    }

    pub fn documents(documents: Vec<FolderDocument>) -> Self {
        Self {
            documents: Some(documents),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.num_mpr.is_none()
            && self.completed.is_none()
            && self.documents.is_none()
    }

    /// Stored field names and values touched by this patch, in a stable order.
    pub fn to_fields(&self) -> Result<Map<String, Value>, StoreError> {
        let mut fields = Map::new();
        if let Some(status) = self.status {
            fields.insert("status".to_string(), serde_json::to_value(status)?);
        }
        if let Some(num_mpr) = &self.num_mpr {
            fields.insert("numMPR".to_string(), Value::String(num_mpr.clone()));
        }
        if let Some(completed) = self.completed {
            fields.insert("completed".to_string(), Value::Bool(completed));
        }
        if let Some(documents) = &self.documents {
            fields.insert("documents".to_string(), serde_json::to_value(documents)?);
        }
        Ok(fields)
    }

    /// Apply the patch to an in-memory folder.
    pub fn apply_to(&self, folder: &mut Folder) {
        if let Some(status) = self.status {
            folder.status = status;
        }
        if let Some(num_mpr) = &self.num_mpr {
            folder.num_mpr = Some(num_mpr.clone());
        }
        if let Some(completed) = self.completed {
            folder.completed = completed;
        }
        if let Some(documents) = &self.documents {
            folder.documents = documents.clone();
        }
    }
}

/// Remote document store holding the `folders` collection.
///
/// Implementations are stateless with respect to credentials: the caller
/// resolves a bearer token from its session and passes it on every call.
#[async_trait]
pub trait FolderStore: Send + Sync {
    /// Read every folder whose `userId` equals `user_id`, in store order.
    async fn list_by_owner(&self, token: &str, user_id: &str) -> Result<Vec<Folder>, StoreError>;

    /// Read the whole collection, in store order.
    async fn list_all(&self, token: &str) -> Result<Vec<Folder>, StoreError>;

    /// Read a single folder.
    async fn get(&self, token: &str, id: &str) -> Result<Option<Folder>, StoreError>;

    /// Write the fields set in `patch` on one folder.
    ///
    /// Returns `StoreError::NotFound` if the folder does not exist and
    /// `StoreError::InvalidData` if the patch sets no field.
    async fn update(&self, token: &str, id: &str, patch: &FolderPatch) -> Result<(), StoreError>;

    /// Delete one folder. Deleting a missing folder is not an error.
    async fn delete(&self, token: &str, id: &str) -> Result<(), StoreError>;
}
