//! WebSocket write pump — serialises outbound messages.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Writes queued messages to the WebSocket until cancelled or the queue closes.
///
/// Messages already queued when the session is cancelled are still written,
/// then a normal close frame follows. A failed write ends the pump without a
/// close frame.
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        let msg = tokio::select! {
            biased;
            msg = write_rx.recv() => msg,
            _ = cancel.cancelled() => break,
        };
        let Some(msg) = msg else { break };
        if let Err(e) = write.send(msg).await {
            error!("WebSocket write error: {e}");
            return;
        }
    }

    // Refuse new messages, then flush whatever is still buffered.
    write_rx.close();
    let mut flushed = 0usize;
    while let Some(msg) = write_rx.recv().await {
        if let Err(e) = write.send(msg).await {
            error!("WebSocket write error while flushing: {e}");
            return;
        }
        flushed += 1;
    }
    if flushed > 0 {
        trace!(flushed, "flushed queued messages before close");
    }

    let close = tungstenite::Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: String::new().into(),
    }));
    if write.send(close).await.is_err() {
        debug!("close frame not sent; connection already closed");
    }
}
