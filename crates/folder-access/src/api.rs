//! HTTP client for the folder API: creation and PDF export.

use folder_store_core::{Folder, NewFolder, StoreError};
use reqwest::{Client, Response};
use tracing::{debug, instrument};

/// File name under which a folder's PDF export is saved.
pub fn pdf_file_name(folder_id: &str) -> String {
    format!("synthese-{}.pdf", folder_id)
}

/// Client for the folder creation and export endpoints.
///
/// Token is passed per-call.
#[derive(Clone)]
pub struct FolderApiClient {
    http: Client,
    api_url: String,
    export_url: String,
}

impl FolderApiClient {
    /// `api_url` serves `POST /api/folders`; `export_url` serves `GET /api/folders/{id}/pdf`.
    pub fn new(http: Client, api_url: &str, export_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            export_url: export_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a folder. Returns the created folder as sent back by the server.
    #[instrument(skip(self, token, folder), level = "debug")]
    pub async fn create_folder(&self, token: &str, folder: &NewFolder) -> Result<Folder, StoreError> {
        let url = format!("{}/api/folders", self.api_url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(folder)
            .send()
            .await
            .map_err(|e| StoreError::Io(format!("Create request failed: {}", e)))?;
        let resp = ensure_success(resp, "Failed to create folder").await?;

        let created: Folder = resp
            .json()
            .await
            .map_err(|e| StoreError::Serialization(format!("Invalid created folder: {}", e)))?;
        debug!("Created folder {}", created.id);
        Ok(created)
    }

    /// Download the PDF export of a folder.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn export_pdf(&self, token: &str, folder_id: &str) -> Result<Vec<u8>, StoreError> {
        let url = format!("{}/api/folders/{}/pdf", self.export_url, folder_id);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Io(format!("Export request failed: {}", e)))?;
        let resp = ensure_success(resp, "Failed to download PDF").await?;

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StoreError::Io(format!("Failed to read PDF body: {}", e)))?;
        debug!("Downloaded {} bytes for folder {}", bytes.len(), folder_id);
        Ok(bytes.to_vec())
    }
}

async fn ensure_success(resp: Response, context: &str) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Http {
        status: status.as_u16(),
        message: format!("{}: {}", context, body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use folder_store_core::FolderStatus;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> FolderApiClient {
        FolderApiClient::new(Client::new(), &server.uri(), &format!("{}/", server.uri()))
    }

    #[test]
    fn test_pdf_file_name() {
        assert_eq!(pdf_file_name("abc"), "synthese-abc.pdf");
    }

    #[tokio::test]
    async fn test_create_folder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/folders"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({"name": "Achat T3", "simulationId": "sim-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "new-1",
                "userId": "user-1",
                "name": "Achat T3",
                "date": "2024-06-01T00:00:00Z",
                "status": {"id": 1, "color": "#F59E0B", "label": "En attente"},
                "simulationId": "sim-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let new_folder = NewFolder {
            name: Some("Achat T3".to_string()),
            simulation_id: Some("sim-1".to_string()),
            ..Default::default()
        };
        let created = client(&server).create_folder("tok", &new_folder).await.unwrap();
        assert_eq!(created.id, "new-1");
        assert_eq!(created.status, FolderStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_folder_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/folders"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_folder("tok", &NewFolder::default())
            .await
            .unwrap_err();
        match err {
            StoreError::Http { status, message } => {
                assert_eq!(status, 500);
                assert!(message.starts_with("Failed to create folder"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_export_pdf() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/folders/f1/pdf"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
            .mount(&server)
            .await;

        let bytes = client(&server).export_pdf("tok", "f1").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_export_pdf_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/folders/f1/pdf"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).export_pdf("tok", "f1").await.unwrap_err();
        assert!(matches!(err, StoreError::Http { status: 401, .. }));
    }
}
