use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StoreError;

/// A user's case file as stored in the `folders` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Store-assigned document ID (not part of the stored fields)
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub status: FolderStatus,
    #[serde(rename = "numMPR", default, skip_serializing_if = "Option::is_none")]
    pub num_mpr: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<FolderDocument>,
    /// Product entries are opaque to this layer.
    #[serde(default, deserialize_with = "null_as_default")]
    pub products: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pdf_link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub simulation_id: String,
    /// Set by the completion operation.
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
}

/// Treat a stored `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Folder {
    /// Decode a folder from its stored fields, attaching the document ID.
    pub fn from_fields(id: &str, fields: serde_json::Value) -> Result<Self, StoreError> {
        let mut folder: Folder = serde_json::from_value(fields)
            .map_err(|e| StoreError::InvalidData(format!("folder {}: {}", id, e)))?;
        folder.id = id.to_string();
        Ok(folder)
    }
}

/// Folder workflow status.
///
/// Written as `{id, color, label}`. Older records hold the bare numeric id, so
/// both shapes are read back; only the `id` is authoritative on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StoredStatus", into = "StatusRecord")]
pub enum FolderStatus {
    Pending,
    Done,
    Completed,
    Cancel,
}

impl FolderStatus {
    pub const ALL: [FolderStatus; 4] = [
        FolderStatus::Pending,
        FolderStatus::Done,
        FolderStatus::Completed,
        FolderStatus::Cancel,
    ];

    /// Numeric tag as stored.
    pub fn id(self) -> u8 {
        match self {
            FolderStatus::Pending => 1,
            FolderStatus::Done => 2,
            FolderStatus::Completed => 3,
            FolderStatus::Cancel => 99,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            FolderStatus::Pending => "#F59E0B",
            FolderStatus::Done => "#10B981",
            FolderStatus::Completed => "#3B82F6",
            FolderStatus::Cancel => "#EF4444",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FolderStatus::Pending => "En attente",
            FolderStatus::Done => "Traité",
            FolderStatus::Completed => "Complété",
            FolderStatus::Cancel => "Annulé",
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }
}

impl fmt::Display for FolderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FolderStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(FolderStatus::Pending),
            "done" => Ok(FolderStatus::Done),
            "completed" => Ok(FolderStatus::Completed),
            "cancel" | "cancelled" | "canceled" => Ok(FolderStatus::Cancel),
            other => Err(StoreError::InvalidData(format!(
                "unknown folder status: {}",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StatusRecord {
    id: u8,
    #[serde(default)]
    color: String,
    #[serde(default)]
    label: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredStatus {
    Id(u8),
    Record(StatusRecord),
}

impl TryFrom<StoredStatus> for FolderStatus {
    type Error = String;

    fn try_from(stored: StoredStatus) -> Result<Self, Self::Error> {
        let id = match stored {
            StoredStatus::Id(id) => id,
            StoredStatus::Record(record) => record.id,
        };
        FolderStatus::from_id(id).ok_or_else(|| format!("invalid status id {}", id))
    }
}

impl From<FolderStatus> for StatusRecord {
    fn from(status: FolderStatus) -> Self {
        StatusRecord {
            id: status.id(),
            color: status.color().to_string(),
            label: status.label().to_string(),
        }
    }
}

/// Category tag of an attached document, stored as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DocumentCategory {
    Identity,
    Taxes,
    PropertyTax,
    Home,
    Other,
}

impl TryFrom<u8> for DocumentCategory {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(DocumentCategory::Identity),
            2 => Ok(DocumentCategory::Taxes),
            3 => Ok(DocumentCategory::PropertyTax),
            4 => Ok(DocumentCategory::Home),
            5 => Ok(DocumentCategory::Other),
            other => Err(format!("invalid document category {}", other)),
        }
    }
}

impl From<DocumentCategory> for u8 {
    fn from(category: DocumentCategory) -> Self {
        match category {
            DocumentCategory::Identity => 1,
            DocumentCategory::Taxes => 2,
            DocumentCategory::PropertyTax => 3,
            DocumentCategory::Home => 4,
            DocumentCategory::Other => 5,
        }
    }
}

impl FromStr for DocumentCategory {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" => Ok(DocumentCategory::Identity),
            "taxes" => Ok(DocumentCategory::Taxes),
            "property_tax" | "propertytax" => Ok(DocumentCategory::PropertyTax),
            "home" => Ok(DocumentCategory::Home),
            "other" => Ok(DocumentCategory::Other),
            other => Err(StoreError::InvalidData(format!(
                "unknown document category: {}",
                other
            ))),
        }
    }
}

/// A document attached to a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub category: DocumentCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FolderDocument {
    pub fn new(name: impl Into<String>, category: DocumentCategory) -> Self {
        Self {
            name: name.into(),
            category,
            url: None,
        }
    }
}

/// Partial folder sent to the creation endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFolder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FolderStatus>,
    #[serde(rename = "numMPR", default, skip_serializing_if = "Option::is_none")]
    pub num_mpr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<FolderDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_id: Option<String>,
}
