//! Cached folder queries and mutations over a folder store.
//!
//! - `FolderAccessLayer`: list, mutate-then-refetch, PDF export and creation
//! - `QueryCache`: keyed, wholesale-replaced cache with watch subscriptions
//! - `EventSink`: where the layer reports what it does
//! - `FolderApiClient`: HTTP creation and export endpoints

pub mod access;
pub mod api;
pub mod cache;
pub mod config;
pub mod events;

pub use access::{AccessOptions, AttachMode, FolderAccessLayer, RefetchScope};
pub use api::{pdf_file_name, FolderApiClient};
pub use cache::{CacheMessage, CachedList, QueryCache, QueryKey};
pub use events::{AccessEvent, EventSink, Operation, RecordingSink, TracingSink};
pub use folder_store_core::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;
