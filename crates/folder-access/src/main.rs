use std::sync::Arc;

use clap::Parser;
use folder_access::config::{Command, Config};
use folder_access::{AttachMode, FolderAccessLayer, FolderApiClient, QueryCache, TracingSink};
use folder_store_core::{Folder, NewFolder};
use folder_store_firestore::{FirebaseSession, FirestoreClient, FirestoreFolderStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (stderr, so stdout stays parseable)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    info!("Starting folders v{}", env!("CARGO_PKG_VERSION"));
    info!("  Project: {}", config.project_id);
    info!("  Refetch scope: {:?}", config.refetch_scope);

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;

    let session = FirebaseSession::sign_in_with_url(
        http.clone(),
        &config.token_url,
        config.firebase_api_key.clone(),
        config.refresh_token.clone(),
    )
    .await?;

    let store = Arc::new(FirestoreFolderStore::new(FirestoreClient::with_base_url(
        http.clone(),
        &config.firestore_url,
        &config.project_id,
    )));
    let api = FolderApiClient::new(http, &config.api_url, &config.export_url);
    let layer = FolderAccessLayer::new(
        store,
        api,
        Arc::new(QueryCache::new()),
        Arc::new(TracingSink),
        config.access_options(),
    );

    match config.command {
        Command::List => print_folders(&layer.list_folders(&session).await?)?,
        Command::Status { id, status } => {
            print_folders(&layer.change_status(&session, &id, status).await?)?
        }
        Command::Mpr { id, number } => {
            print_folders(&layer.change_mpr_number(&session, &id, &number).await?)?
        }
        Command::Complete { id } => print_folders(&layer.complete_folder(&session, &id).await?)?,
        Command::Attach {
            id,
            documents,
            append,
        } => {
            let mode = if append {
                AttachMode::Append
            } else {
                AttachMode::Replace
            };
            print_folders(&layer.attach_documents(&session, &id, documents, mode).await?)?
        }
        Command::Delete { id } => print_folders(&layer.delete_folder(&session, &id).await?)?,
        Command::Pdf { id } => {
            let path = layer.download_folder_pdf(&session, &id).await?;
            println!("{}", path.display());
        }
        Command::Create { json } => {
            let new_folder: NewFolder = serde_json::from_str(&json)?;
            let created = layer.create_folder(&session, &new_folder).await?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
    }

    Ok(())
}

fn print_folders(folders: &[Folder]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(folders)?);
    Ok(())
}
