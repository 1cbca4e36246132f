//! Transfer client error types.

use fileshelf_protocol::constants::CLOSE_ABNORMAL;

/// Protocol phase a pipeline was suspended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// WebSocket handshake.
    Connect,
    /// First message of a download.
    Metadata,
    /// Acknowledgment of an upload chunk.
    ChunkAck,
    /// Next download fragment.
    Fragment,
    /// Server close after all data was exchanged.
    Close,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Connect => "connection",
            Phase::Metadata => "download metadata",
            Phase::ChunkAck => "chunk acknowledgment",
            Phase::Fragment => "download fragment",
            Phase::Close => "server close",
        })
    }
}

/// Coarse classification of a [`TransferClientError`] for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No authenticated identity was available.
    Authentication,
    /// The session never reached the open state.
    Connection,
    /// The transfer was aborted after the session opened.
    Transfer,
    /// The server sent something the client could not interpret.
    Protocol,
    /// The caller cancelled the transfer.
    Cancelled,
    /// A local problem: unreadable source file, unwritable target, bad name.
    Local,
}

/// Errors produced by the upload and download pipelines.
#[derive(Debug, thiserror::Error)]
pub enum TransferClientError {
    #[error("not authenticated: no user identity available")]
    Authentication,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transfer failed (close code {code}): {reason}")]
    Transfer { code: u16, reason: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("timed out waiting for {0}")]
    Timeout(Phase),

    #[error("cancelled")]
    Cancelled,

    #[error("transport session is closed")]
    SessionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file error: {0}")]
    File(#[from] fileshelf_transfer::TransferError),
}

impl TransferClientError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferClientError::Authentication => ErrorKind::Authentication,
            TransferClientError::Connection(_) => ErrorKind::Connection,
            TransferClientError::Timeout(Phase::Connect) => ErrorKind::Connection,
            TransferClientError::Transfer { .. }
            | TransferClientError::Timeout(_)
            | TransferClientError::SessionClosed => ErrorKind::Transfer,
            TransferClientError::Protocol(_) => ErrorKind::Protocol,
            TransferClientError::Cancelled => ErrorKind::Cancelled,
            TransferClientError::Io(_)
            | TransferClientError::Json(_)
            | TransferClientError::File(_) => ErrorKind::Local,
        }
    }

    /// Builds a transfer error for a socket-level failure.
    pub(crate) fn socket(reason: impl Into<String>) -> Self {
        TransferClientError::Transfer {
            code: CLOSE_ABNORMAL,
            reason: reason.into(),
        }
    }
}
