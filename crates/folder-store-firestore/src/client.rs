//! Firestore v1 REST client.
//!
//! Token is passed per-call by the caller (the session resolves it).
//! Document URLs: `{base}/{collection}/{document_id}`

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use folder_store_core::StoreError;

use crate::codec::{decode_fields, encode_fields};

/// Public Firestore REST endpoint.
pub const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1";

/// Page size used when walking a whole collection.
const LIST_PAGE_SIZE: u32 = 300;

/// A document as returned by the Firestore REST API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreDocument {
    /// Full resource name: `projects/{p}/databases/{d}/documents/{collection}/{id}`
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl FirestoreDocument {
    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Fields decoded to plain JSON.
    pub fn decoded_fields(&self) -> Result<Value, StoreError> {
        decode_fields(&self.fields)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// One element of a `runQuery` response stream.
#[derive(Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<FirestoreDocument>,
}

#[derive(Serialize)]
struct PatchBody {
    fields: Map<String, Value>,
}

/// Firestore REST client (stateless, token provided per-call).
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    documents_url: String,
}

impl FirestoreClient {
    /// Client for the `(default)` database of a project on the public endpoint.
    pub fn new(http: Client, project_id: &str) -> Self {
        Self::with_base_url(http, FIRESTORE_API_URL, project_id)
    }

    /// Client against a custom endpoint (emulator, tests).
    pub fn with_base_url(http: Client, base_url: &str, project_id: &str) -> Self {
        Self {
            http,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                base_url.trim_end_matches('/'),
                project_id
            ),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.documents_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, collection, id)
    }

    /// Run a single-field equality query over a collection.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn query_equal(
        &self,
        token: &str,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<FirestoreDocument>, StoreError> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = json!({
            "structuredQuery": {
                "from": [{"collectionId": collection}],
                "where": {
                    "fieldFilter": {
                        "field": {"fieldPath": field},
                        "op": "EQUAL",
                        "value": {"stringValue": value}
                    }
                }
            }
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let resp = ensure_success(resp, "runQuery").await?;

        let items: Vec<RunQueryItem> = resp.json().await.map_err(decode_error)?;
        let documents: Vec<FirestoreDocument> =
            items.into_iter().filter_map(|item| item.document).collect();
        debug!(
            "Query {} where {} == {} returned {} documents",
            collection,
            field,
            value,
            documents.len()
        );
        Ok(documents)
    }

    /// List every document of a collection, following pagination.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn list_documents(
        &self,
        token: &str,
        collection: &str,
    ) -> Result<Vec<FirestoreDocument>, StoreError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .bearer_auth(token)
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let resp = request.send().await.map_err(transport_error)?;
            let resp = ensure_success(resp, "list").await?;
            let page: ListDocumentsResponse = resp.json().await.map_err(decode_error)?;

            documents.extend(page.documents);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!("Listed {} documents in {}", documents.len(), collection);
        Ok(documents)
    }

    /// Read one document. `None` if it does not exist.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn get_document(
        &self,
        token: &str,
        collection: &str,
        id: &str,
    ) -> Result<Option<FirestoreDocument>, StoreError> {
        let resp = self
            .http
            .get(self.document_url(collection, id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = ensure_success(resp, "get").await?;
        let document: FirestoreDocument = resp.json().await.map_err(decode_error)?;
        Ok(Some(document))
    }

    /// Write the given plain-JSON fields on an existing document.
    ///
    /// Only the named fields are touched (update mask); the document must exist.
    /// An empty field set is rejected: without a mask Firestore overwrites the
    /// whole document.
    #[instrument(skip(self, token, fields), level = "debug", fields(field_count = fields.len()))]
    pub async fn patch_document(
        &self,
        token: &str,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Err(StoreError::InvalidData(format!(
                "empty patch for {}/{}",
                collection, id
            )));
        }

        let mut params: Vec<(&str, &str)> = fields
            .keys()
            .map(|name| ("updateMask.fieldPaths", name.as_str()))
            .collect();
        params.push(("currentDocument.exists", "true"));

        let resp = self
            .http
            .patch(self.document_url(collection, id))
            .bearer_auth(token)
            .query(&params)
            .json(&PatchBody {
                fields: encode_fields(fields),
            })
            .send()
            .await
            .map_err(transport_error)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }

        ensure_success(resp, "patch").await?;
        debug!("Patched {}/{}", collection, id);
        Ok(())
    }

    /// Delete one document.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn delete_document(
        &self,
        token: &str,
        collection: &str,
        id: &str,
    ) -> Result<(), StoreError> {
        let resp = self
            .http
            .delete(self.document_url(collection, id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(resp, "delete").await?;
        debug!("Deleted {}/{}", collection, id);
        Ok(())
    }
}

async fn ensure_success(resp: Response, op: &str) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Backend(format!(
        "Firestore {} failed with status {}: {}",
        op, status, body
    )))
}

fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::Io(format!("Firestore request failed: {}", e))
}

fn decode_error(e: reqwest::Error) -> StoreError {
    StoreError::Serialization(format!("Failed to decode Firestore response: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOCS: &str = "/projects/demo/databases/(default)/documents";

    fn doc(id: &str, name: &str) -> Value {
        json!({
            "name": format!("projects/demo/databases/(default)/documents/folders/{}", id),
            "fields": {"name": {"stringValue": name}}
        })
    }

    async fn client(server: &MockServer) -> FirestoreClient {
        FirestoreClient::with_base_url(Client::new(), &server.uri(), "demo")
    }

    #[test]
    fn test_document_id() {
        let document: FirestoreDocument = serde_json::from_value(doc("abc123", "x")).unwrap();
        assert_eq!(document.id(), "abc123");
    }

    #[tokio::test]
    async fn test_query_equal_skips_empty_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}:runQuery", DOCS)))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(json!({
                "structuredQuery": {"where": {"fieldFilter": {
                    "field": {"fieldPath": "userId"},
                    "value": {"stringValue": "user-1"}
                }}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"document": doc("a", "A"), "readTime": "2024-01-01T00:00:00Z"},
                {"readTime": "2024-01-01T00:00:00Z"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let documents = client(&server)
            .await
            .query_equal("tok", "folders", "userId", "user-1")
            .await
            .unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id(), "a");
    }

    #[tokio::test]
    async fn test_list_documents_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/folders", DOCS)))
            .and(query_param("pageToken", "p2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"documents": [doc("b", "B")]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/folders", DOCS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [doc("a", "A")],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;

        let documents = client(&server)
            .await
            .list_documents("tok", "folders")
            .await
            .unwrap();
        let ids: Vec<_> = documents.iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_get_document_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/folders/missing", DOCS)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client(&server)
            .await
            .get_document("tok", "folders", "missing")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_patch_document_sends_mask() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/folders/a", DOCS)))
            .and(query_param("updateMask.fieldPaths", "numMPR"))
            .and(query_param("currentDocument.exists", "true"))
            .and(body_partial_json(json!({
                "fields": {"numMPR": {"stringValue": "MPR-1"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(doc("a", "A")))
            .expect(1)
            .mount(&server)
            .await;

        let mut fields = Map::new();
        fields.insert("numMPR".to_string(), json!("MPR-1"));
        client(&server)
            .await
            .patch_document("tok", "folders", "a", &fields)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_patch_missing_document() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/folders/gone", DOCS)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut fields = Map::new();
        fields.insert("completed".to_string(), json!(true));
        let err = client(&server)
            .await
            .patch_document("tok", "folders", "gone", &fields)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_patch_without_fields_is_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .patch_document("tok", "folders", "a", &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_backend_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{}/folders/a", DOCS)))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .delete_document("tok", "folders", "a")
            .await
            .unwrap_err();
        match err {
            StoreError::Backend(msg) => assert!(msg.contains("PERMISSION_DENIED")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
