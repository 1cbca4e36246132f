//! REST client for the file listing endpoints.

use fileshelf_protocol::{AuthStatusResponse, FileRecord, GetUploadsResponse};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Errors from the REST API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Client for `/files` and `/users/{id}/auth-status`.
#[derive(Clone)]
pub struct FileApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl FileApi {
    /// Creates an unauthenticated client rooted at `base_url`
    /// (e.g. `http://127.0.0.1:8080/api/v1`).
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Returns a copy that sends `token` as a bearer credential.
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..self.clone()
        }
    }

    /// Lists stored files, optionally filtered by name.
    ///
    /// An empty `name` is treated like no filter.
    pub async fn list_files(&self, name: Option<&str>) -> Result<Vec<FileRecord>, ApiError> {
        let url = self.files_url(name);
        let resp: GetUploadsResponse = self.get_json(&url).await?;
        debug!(count = resp.count, returned = resp.files.len(), "listed files");
        Ok(resp.files)
    }

    /// Deletes a stored file.
    pub async fn delete_file(&self, file_id: u64) -> Result<(), ApiError> {
        let url = format!("{}/files/{file_id}", self.base_url);
        let resp = self.authorize(self.http.delete(&url)).send().await?;
        check_status(resp).await?;
        debug!(file_id, "file deleted");
        Ok(())
    }

    /// Returns whether the server still accepts the token for `user_id`.
    pub async fn auth_status(&self, user_id: u64) -> Result<bool, ApiError> {
        let url = format!("{}/users/{user_id}/auth-status", self.base_url);
        let resp: AuthStatusResponse = self.get_json(&url).await?;
        Ok(resp.is_authenticated)
    }

    fn files_url(&self, name: Option<&str>) -> String {
        match name.filter(|n| !n.is_empty()) {
            Some(name) => format!(
                "{}/files?fileName={}",
                self.base_url,
                utf8_percent_encode(name, NON_ALPHANUMERIC)
            ),
            None => format!("{}/files", self.base_url),
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let resp = self.authorize(self.http.get(url)).send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.json::<T>().await?)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}
