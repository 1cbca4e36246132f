//! Transport session: one WebSocket connection owned by one transfer.
//!
//! A session is opened with [`TransportSession::connect`], drives its
//! socket through a read pump and a write pump, and is torn down by
//! [`TransportSession::close`] or on drop. It is never reopened.

use std::time::Duration;

use futures_util::StreamExt;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fileshelf_protocol::constants::{CLOSE_NORMAL, TOKEN_QUERY_PARAM, WS_MAX_MESSAGE_SIZE};

use crate::error::{Phase, TransferClientError};

/// Capacity of the outbound message queue.
const WRITE_QUEUE: usize = 16;

/// Capacity of the inbound event queue.
const EVENT_QUEUE: usize = 64;

/// Time granted to the write pump to flush the close frame.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle of a [`TransportSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Open,
    Closed,
    Errored,
}

impl SessionState {
    /// Returns `true` once the session can no longer be used.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Errored)
    }
}

/// Close code and reason delivered with a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    /// Returns `true` for close code 1000.
    pub fn is_normal(&self) -> bool {
        self.code == CLOSE_NORMAL
    }
}

/// Inbound traffic surfaced by the read pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Text(String),
    Binary(Vec<u8>),
    Closed(CloseInfo),
    Failed(String),
}

impl SessionEvent {
    /// Returns `true` for events after which nothing else arrives.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Closed(_) | SessionEvent::Failed(_))
    }
}

/// A single open WebSocket connection.
pub struct TransportSession {
    endpoint: String,
    state: SessionState,
    write_tx: mpsc::Sender<tungstenite::Message>,
    events_rx: Option<mpsc::Receiver<SessionEvent>>,
    cancel: CancellationToken,
    read_handle: tokio::task::JoinHandle<()>,
    write_handle: tokio::task::JoinHandle<()>,
}

impl TransportSession {
    /// Opens a connection to `url`.
    ///
    /// Makes exactly one attempt. The handshake is bounded by
    /// `connect_timeout` and aborted when `cancel` fires; cancelling
    /// `cancel` later also tears down the pumps.
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Self, TransferClientError> {
        let endpoint = redact_token(url);
        debug!(%endpoint, "connecting");

        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);

        let handshake = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferClientError::Cancelled),
            r = tokio::time::timeout(
                connect_timeout,
                tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false),
            ) => r,
        };

        let ws_stream = match handshake {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => {
                warn!(%endpoint, error = %e, "WebSocket handshake failed");
                return Err(TransferClientError::Connection(e.to_string()));
            }
            Err(_) => {
                warn!(%endpoint, "WebSocket handshake timed out");
                return Err(TransferClientError::Timeout(Phase::Connect));
            }
        };
        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(WRITE_QUEUE);
        let (events_tx, events_rx) = mpsc::channel::<SessionEvent>(EVENT_QUEUE);
        let cancel = cancel.child_token();

        let write_handle = {
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::write::write_pump(write, write_rx, cancel))
        };

        let read_handle = {
            let cancel = cancel.clone();
            let write_tx = write_tx.clone();
            tokio::spawn(crate::pumps::read::read_pump(
                read, events_tx, write_tx, cancel,
            ))
        };

        info!(%endpoint, "session open");
        Ok(Self {
            endpoint,
            state: SessionState::Open,
            write_tx,
            events_rx: Some(events_rx),
            cancel,
            read_handle,
            write_handle,
        })
    }

    /// Serialises `value` and sends it as a text message.
    pub async fn send_json<T: Serialize>(&self, value: &T) -> Result<(), TransferClientError> {
        let json = serde_json::to_string(value)?;
        self.send_text(json).await
    }

    /// Sends a text message.
    pub async fn send_text(&self, text: String) -> Result<(), TransferClientError> {
        self.send(tungstenite::Message::Text(text.into())).await
    }

    /// Sends a binary message.
    pub async fn send_binary(&self, data: Vec<u8>) -> Result<(), TransferClientError> {
        self.send(tungstenite::Message::Binary(data.into())).await
    }

    async fn send(&self, msg: tungstenite::Message) -> Result<(), TransferClientError> {
        if self.state != SessionState::Open {
            return Err(TransferClientError::SessionClosed);
        }
        self.write_tx
            .send(msg)
            .await
            .map_err(|_| TransferClientError::SessionClosed)
    }

    /// Takes the inbound event receiver. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.events_rx.take()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Endpoint URL with the token redacted.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Records that the connection failed.
    pub fn mark_errored(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Errored;
        }
    }

    /// Closes the session, sending a normal close frame if the socket is
    /// still writable. Idempotent.
    pub async fn close(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Closed;
        }
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut self.write_handle)
            .await
            .is_err()
        {
            debug!(endpoint = %self.endpoint, "write pump did not stop in time");
        }
        debug!(endpoint = %self.endpoint, state = ?self.state, "session closed");
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.read_handle.abort();
        self.write_handle.abort();
    }
}

/// Waits for the next item on `rx`, bounded by `within` and `cancel`.
///
/// Returns `Ok(None)` when the channel closed.
pub(crate) async fn recv_within<T>(
    rx: &mut mpsc::Receiver<T>,
    within: Duration,
    phase: Phase,
    cancel: &CancellationToken,
) -> Result<Option<T>, TransferClientError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransferClientError::Cancelled),
        r = tokio::time::timeout(within, rx.recv()) => {
            r.map_err(|_| TransferClientError::Timeout(phase))
        }
    }
}

/// Builds the upload endpoint URL.
pub fn upload_url(ws_base: &str, token: &str) -> String {
    format!(
        "{}/files/upload?{TOKEN_QUERY_PARAM}={}",
        ws_base.trim_end_matches('/'),
        utf8_percent_encode(token, NON_ALPHANUMERIC)
    )
}

/// Builds the download endpoint URL for `file_id`.
pub fn download_url(ws_base: &str, file_id: u64, token: &str) -> String {
    format!(
        "{}/files/{file_id}/download?{TOKEN_QUERY_PARAM}={}",
        ws_base.trim_end_matches('/'),
        utf8_percent_encode(token, NON_ALPHANUMERIC)
    )
}

/// Replaces the token query value in `url` for logging.
pub fn redact_token(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let query: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key == TOKEN_QUERY_PARAM => format!("{key}=<redacted>"),
            _ => pair.to_string(),
        })
        .collect();
    format!("{base}?{}", query.join("&"))
}
