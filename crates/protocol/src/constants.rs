use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Size of one upload chunk (1 MiB).
///
/// Every binary upload message carries at most this many bytes; only the
/// last chunk of a file may be shorter.
pub const TRANSFER_CHUNK_SIZE: usize = 1024 * 1024;

/// WebSocket close code for a normal, expected completion.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the stream ends without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Close reason the server sends once every download fragment is out.
///
/// A download is only saved to disk when the close carries exactly this
/// reason together with [`CLOSE_NORMAL`].
pub const DOWNLOAD_COMPLETE_REASON: &str = "file sent";

/// Time allowed for the WebSocket handshake.
pub const WS_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Time to wait for the server to acknowledge one upload chunk.
///
/// The server writes the chunk to storage before answering, so this is
/// generous on purpose.
pub const WS_ACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Time to wait for the next inbound message during a download.
pub const WS_FRAGMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Time to wait for the server's close frame once all data is exchanged.
pub const WS_CLOSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum accepted WebSocket message size (64 MiB).
pub const WS_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Default base URL of the REST API.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/api/v1";

/// Default base URL of the transfer WebSocket endpoints.
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8080/api/v1";

/// Query parameter carrying the bearer token on WebSocket URLs.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Name of an event published on the client event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "user-login")]
    UserLogin,
    #[serde(rename = "user-logout")]
    UserLogout,
    #[serde(rename = "upload-progress")]
    UploadProgress,
}

impl EventName {
    /// Returns the wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::UserLogin => "user-login",
            EventName::UserLogout => "user-logout",
            EventName::UploadProgress => "upload-progress",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
