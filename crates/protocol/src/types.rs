use serde::{Deserialize, Serialize};

/// A file stored on the server, as listed by `GET /files`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: u64,
    pub name: String,
    pub created_date: String,
    #[serde(rename = "ownerID")]
    pub owner_id: u64,
    pub owner_username: String,
}

/// Response body of `GET /files`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetUploadsResponse {
    pub count: u64,
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

/// Response body of `GET /users/{id}/auth-status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub is_authenticated: bool,
}
