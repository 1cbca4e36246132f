use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// First outbound message of an upload session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInit {
    pub total_chunks: u64,
    pub file_name: String,
    #[serde(rename = "userID")]
    pub user_id: u64,
}

/// Server acknowledgment for one received chunk.
///
/// The server may attach extra fields; only the percentage is consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAck {
    pub upload_percentage: f64,
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// First inbound message of a download session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadMetadata {
    pub file_name: String,
}
