//! Observability boundary.
//!
//! The access layer reports what it does as `AccessEvent`s; an `EventSink`
//! decides how to render or store them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, error, info};

/// Folder operations, as named in events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    ChangeStatus,
    ChangeMprNumber,
    Complete,
    AttachDocuments,
    Delete,
    ExportPdf,
    Create,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::ChangeStatus => "change_status",
            Operation::ChangeMprNumber => "change_mpr_number",
            Operation::Complete => "complete",
            Operation::AttachDocuments => "attach_documents",
            Operation::Delete => "delete",
            Operation::ExportPdf => "export_pdf",
            Operation::Create => "create",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccessEvent {
    FetchStarted {
        user_id: Option<String>,
    },
    FetchCompleted {
        user_id: String,
        count: usize,
    },
    MutationStarted {
        op: Operation,
        folder_id: String,
    },
    MutationApplied {
        op: Operation,
        folder_id: String,
    },
    CacheReplaced {
        op: Operation,
        count: usize,
    },
    ExportStarted {
        folder_id: String,
    },
    ExportCompleted {
        folder_id: String,
        path: PathBuf,
        bytes: usize,
    },
    FolderCreated {
        folder_id: String,
    },
    OperationFailed {
        op: Operation,
        error: String,
    },
}

/// Receives events from the access layer.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AccessEvent);
}

/// Renders events as `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: AccessEvent) {
        match event {
            AccessEvent::FetchStarted { user_id } => debug!(
                user_id = user_id.as_deref().unwrap_or("not authenticated"),
                "Fetching folders"
            ),
            AccessEvent::FetchCompleted { user_id, count } => {
                info!(%user_id, count, "Folders fetched")
            }
            AccessEvent::MutationStarted { op, folder_id } => {
                debug!(%op, %folder_id, "Folder mutation started")
            }
            AccessEvent::MutationApplied { op, folder_id } => {
                info!(%op, %folder_id, "Folder mutation applied")
            }
            AccessEvent::CacheReplaced { op, count } => {
                debug!(%op, count, "Folder list cache replaced")
            }
            AccessEvent::ExportStarted { folder_id } => {
                debug!(%folder_id, "PDF export started")
            }
            AccessEvent::ExportCompleted {
                folder_id,
                path,
                bytes,
            } => info!(%folder_id, path = %path.display(), bytes, "PDF downloaded"),
            AccessEvent::FolderCreated { folder_id } => info!(%folder_id, "Folder created"),
            AccessEvent::OperationFailed { op, error } => {
                error!(%op, %error, "Folder operation failed")
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AccessEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AccessEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }

    /// Operations that reported a failure, in order.
    pub fn failures(&self) -> Vec<Operation> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                AccessEvent::OperationFailed { op, .. } => Some(op),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: AccessEvent) {
        self.events.lock().expect("event log poisoned").push(event);
    }
}
