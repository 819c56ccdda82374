//! Core traits and types for folder store backends.
//!
//! This crate defines the abstractions shared between the in-memory and cloud implementations:
//! - `Folder` and its status/document types, with their stored representation
//! - `FolderStore`: filtered/unfiltered reads, partial updates and deletes
//! - `Session`: the explicit authentication context passed to every operation
//! - `MemoryFolderStore`: an in-process backend

mod error;
mod folder;
mod memory;
mod session;
mod store;

pub use error::StoreError;
pub use folder::{DocumentCategory, Folder, FolderDocument, FolderStatus, NewFolder};
pub use memory::MemoryFolderStore;
pub use session::{AnonymousSession, Session, StaticSession};
pub use store::{FolderPatch, FolderStore, FOLDERS_COLLECTION};
