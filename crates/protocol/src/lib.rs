//! Wire protocol types shared by the Fileshelf transfer client.
//!
//! Two surfaces are described here: the WebSocket messages exchanged
//! during a chunked upload or download, and the JSON bodies of the
//! REST file API.

pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{CLOSE_NORMAL, DOWNLOAD_COMPLETE_REASON, EventName, TRANSFER_CHUNK_SIZE};
pub use messages::{DownloadMetadata, UploadAck, UploadInit};
pub use types::{AuthStatusResponse, FileRecord, GetUploadsResponse};
