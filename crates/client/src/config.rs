//! Transfer pipeline configuration.

use std::time::Duration;

use fileshelf_protocol::constants::{
    DEFAULT_WS_URL, TRANSFER_CHUNK_SIZE, WS_ACK_TIMEOUT, WS_CLOSE_TIMEOUT, WS_CONNECT_TIMEOUT,
    WS_FRAGMENT_TIMEOUT,
};

/// Settings shared by the upload and download pipelines.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Base URL of the transfer WebSocket endpoints (`ws://` or `wss://`).
    pub ws_url: String,
    /// Upload chunk size in bytes.
    pub chunk_size: usize,
    /// Time allowed for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Time allowed for the server to acknowledge one chunk.
    pub ack_timeout: Duration,
    /// Time allowed between two inbound download messages.
    pub fragment_timeout: Duration,
    /// Time allowed for the server's close once all data is exchanged.
    pub close_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.into(),
            chunk_size: TRANSFER_CHUNK_SIZE,
            connect_timeout: WS_CONNECT_TIMEOUT,
            ack_timeout: WS_ACK_TIMEOUT,
            fragment_timeout: WS_FRAGMENT_TIMEOUT,
            close_timeout: WS_CLOSE_TIMEOUT,
        }
    }
}

impl TransferConfig {
    /// Creates a config pointing at `ws_url` with default timeouts.
    pub fn with_ws_url(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            ..Self::default()
        }
    }
}
