use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use folder_store_core::{DocumentCategory, FolderDocument, FolderStatus};
use folder_store_firestore::{FIRESTORE_API_URL, SECURE_TOKEN_URL};

use crate::access::{AccessOptions, RefetchScope};

/// Configuration for the folders client.
#[derive(Parser, Debug, Clone)]
#[command(name = "folders")]
#[command(about = "List, update and export folders stored in Cloud Firestore")]
pub struct Config {
    /// Firebase project ID
    #[arg(long, env = "FIRESTORE_PROJECT_ID")]
    pub project_id: String,

    /// Firestore REST endpoint (override for the emulator)
    #[arg(long, default_value = FIRESTORE_API_URL, env = "FIRESTORE_API_URL")]
    pub firestore_url: String,

    /// Firebase Web API key (for token refresh)
    #[arg(long, env = "FIREBASE_API_KEY")]
    pub firebase_api_key: String,

    /// Firebase Auth refresh token of the signed-in user
    #[arg(long, env = "FIREBASE_REFRESH_TOKEN")]
    pub refresh_token: String,

    /// Secure Token endpoint
    #[arg(long, default_value = SECURE_TOKEN_URL, env = "SECURE_TOKEN_URL")]
    pub token_url: String,

    /// Base URL of the folder API (creation)
    #[arg(long, default_value = "http://localhost:3000", env = "FOLDERS_API_URL")]
    pub api_url: String,

    /// Base URL of the PDF export service
    #[arg(long, default_value = "http://localhost:3002", env = "FOLDERS_EXPORT_URL")]
    pub export_url: String,

    /// Directory receiving PDF exports
    #[arg(long, default_value = ".", env = "FOLDERS_DOWNLOAD_DIR")]
    pub download_dir: PathBuf,

    /// Folders re-read after a mutation
    #[arg(long, value_enum, default_value_t = RefetchScope::Owner, env = "FOLDERS_REFETCH_SCOPE")]
    pub refetch_scope: RefetchScope,

    /// Seconds a cached folder list is served without refetching
    #[arg(long, default_value = "30", env = "FOLDERS_STALE_SECS")]
    pub stale_secs: u64,

    /// HTTP client timeout (seconds)
    #[arg(long, default_value = "60", env = "HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the signed-in user's folders
    List,
    /// Set a folder's status
    Status {
        id: String,
        #[arg(value_parser = parse_status)]
        status: FolderStatus,
    },
    /// Set a folder's MPR number
    Mpr { id: String, number: String },
    /// Mark a folder as completed
    Complete { id: String },
    /// Attach documents, given as `name:category`
    Attach {
        id: String,
        #[arg(required = true, value_parser = parse_document)]
        documents: Vec<FolderDocument>,
        /// Keep the documents already attached
        #[arg(long)]
        append: bool,
    },
    /// Delete a folder
    Delete { id: String },
    /// Download a folder's PDF export
    Pdf { id: String },
    /// Create a folder from a JSON object
    Create { json: String },
}

impl Config {
    pub fn access_options(&self) -> AccessOptions {
        AccessOptions {
            refetch_scope: self.refetch_scope,
            stale_after: Duration::from_secs(self.stale_secs),
            download_dir: self.download_dir.clone(),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_status(s: &str) -> Result<FolderStatus, String> {
    s.parse().map_err(|e: folder_store_core::StoreError| e.to_string())
}

/// Parse `name:category`, e.g. `avis-2023.pdf:taxes`.
fn parse_document(s: &str) -> Result<FolderDocument, String> {
    let (name, category) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected name:category, got {}", s))?;
    if name.is_empty() {
        return Err(format!("missing document name in {}", s));
    }
    let category: DocumentCategory = category
        .parse()
        .map_err(|e: folder_store_core::StoreError| e.to_string())?;
    Ok(FolderDocument::new(name, category))
}
