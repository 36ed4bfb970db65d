//! Google Drive API v3 client wrapper.
//!
//! Token is passed per-call by the delivery session.
//! Destinations are folder IDs; files are addressed by name inside a folder.

use std::time::Duration;

use async_trait::async_trait;
use docsync_core::{DeliveryTransport, PutOutcome, TransportError};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

const GOOGLE_API_BASE: &str = "https://www.googleapis.com";

/// File entry returned by a Drive `files.list` query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Google Drive API client (stateless: token provided per-call).
pub struct GDriveClient {
    http: Client,
    api_base: String,
}

impl GDriveClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(GOOGLE_API_BASE, timeout)
    }

    /// Point the client at another host (used by tests).
    pub fn with_base_url(base: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Find a non-trashed file called `name` directly inside `folder_id`.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn find_in_folder(
        &self,
        token: &str,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<DriveFile>, TransportError> {
        let url = format!("{}/drive/v3/files", self.api_base);
        let query = format!(
            "name = '{}' and '{}' in parents and trashed = false",
            escape_query(name),
            escape_query(folder_id)
        );

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id)"),
                ("pageSize", "10"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await
            .map_err(network)?;

        let list: FileList = check(resp, "Google Drive lookup")
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Rejected(format!("Unexpected lookup response: {}", e)))?;

        if list.files.len() > 1 {
            warn!(
                "{} files named {} in folder {}, replacing the first",
                list.files.len(),
                name,
                folder_id
            );
        }
        Ok(list.files.into_iter().next())
    }

    /// Create an empty file called `name` in `folder_id` and return its ID.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn create_file(
        &self,
        token: &str,
        folder_id: &str,
        name: &str,
        mime_type: &str,
    ) -> Result<String, TransportError> {
        let url = format!("{}/drive/v3/files", self.api_base);
        let metadata = json!({
            "name": name,
            "parents": [folder_id],
            "mimeType": mime_type,
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(network)?;

        let created: DriveFile = check(resp, "Google Drive create")
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Rejected(format!("Unexpected create response: {}", e)))?;

        debug!("Created file {} ({}) in folder {}", name, created.id, folder_id);
        Ok(created.id)
    }

    /// Upload (replace) file content on Google Drive.
    #[instrument(skip(self, token, data), level = "debug", fields(data_len = data.len()))]
    pub async fn update_file(
        &self,
        token: &str,
        file_id: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let url = format!("{}/upload/drive/v3/files/{}", self.api_base, file_id);

        let resp = self
            .http
            .patch(&url)
            .bearer_auth(token)
            .query(&[("uploadType", "media"), ("supportsAllDrives", "true")])
            .header("Content-Type", mime_type)
            .body(data.to_vec())
            .send()
            .await
            .map_err(network)?;

        check(resp, "Google Drive upload").await?;
        debug!("Updated file {} ({} bytes)", file_id, data.len());
        Ok(())
    }
}

#[async_trait]
impl DeliveryTransport for GDriveClient {
    async fn put(
        &self,
        token: &str,
        destination_id: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<PutOutcome, TransportError> {
        let mime_type = mime_type_for(file_name);

        let (file_id, outcome) = match self.find_in_folder(token, destination_id, file_name).await? {
            Some(existing) => (existing.id, PutOutcome::Replaced),
            None => (
                self.create_file(token, destination_id, file_name, mime_type)
                    .await?,
                PutOutcome::Created,
            ),
        };

        self.update_file(token, &file_id, mime_type, data).await?;
        Ok(outcome)
    }
}

/// Map a non-success response to a transport error. 401 means the bearer
/// token was rejected and is the only status the session retries.
async fn check(resp: Response, what: &str) -> Result<Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(TransportError::Unauthorized(format!("{} {}: {}", what, status, body)));
    }
    Err(TransportError::Rejected(format!("{} error {}: {}", what, status, body)))
}

fn network(e: reqwest::Error) -> TransportError {
    TransportError::Network(e.to_string())
}

/// Escape a value for a single-quoted Drive query string literal.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Content type sent with uploads, from the file extension.
pub fn mime_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "md" | "markdown" => "text/markdown",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "odt" => "application/vnd.oasis.opendocument.text",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GDriveClient {
        GDriveClient::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_escape_query() {
        assert_eq!(escape_query("plain.md"), "plain.md");
        assert_eq!(escape_query("it's.md"), "it\\'s.md");
        assert_eq!(escape_query("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for("a.md"), "text/markdown");
        assert_eq!(mime_type_for("A.DOCX"), mime_type_for("a.docx"));
        assert_eq!(mime_type_for("Makefile"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_put_creates_missing_file() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param(
                "q",
                "name = 'a.md' and 'F1' in parents and trashed = false",
            ))
            .and(query_param("fields", "files(id)"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new-id" })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/upload/drive/v3/files/new-id"))
            .and(query_param("uploadType", "media"))
            .and(header("content-type", "text/markdown"))
            .and(body_bytes(b"# hello".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new-id" })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).put("tok", "F1", "a.md", b"# hello").await.unwrap();
        assert_eq!(outcome, PutOutcome::Created);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_file() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{ "id": "existing", "name": "a.md" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "dup" })))
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/upload/drive/v3/files/existing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "existing" })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).put("tok", "F1", "a.md", b"v2").await.unwrap();
        assert_eq!(outcome, PutOutcome::Replaced);
    }

    #[tokio::test]
    async fn test_unauthorized_is_reported_distinctly() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
            .mount(&server)
            .await;

        let err = client(&server).put("stale", "F1", "a.md", b"x").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("Invalid Credentials"));
    }

    #[tokio::test]
    async fn test_upload_failure_is_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{ "id": "existing" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/upload/drive/v3/files/existing"))
            .respond_with(ResponseTemplate::new(403).set_body_string("storageQuotaExceeded"))
            .mount(&server)
            .await;

        let err = client(&server).put("tok", "F1", "a.md", b"x").await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let client = GDriveClient::with_base_url(&uri, Duration::from_secs(2)).unwrap();
        let err = client.put("tok", "F1", "a.md", b"x").await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
