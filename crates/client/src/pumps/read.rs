//! WebSocket read pump — turns inbound frames into session events.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use fileshelf_protocol::constants::CLOSE_ABNORMAL;

use crate::session::{CloseInfo, SessionEvent};

/// Close code reported for a close frame that carried no status.
const CLOSE_NO_STATUS: u16 = 1005;

/// Reads messages from the WebSocket and forwards them as [`SessionEvent`]s.
///
/// Exactly one terminal event (`Closed` or `Failed`) is forwarded before
/// the pump exits, unless it was cancelled or the consumer went away.
pub(crate) async fn read_pump<S>(
    mut read: S,
    events_tx: mpsc::Sender<SessionEvent>,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = read.next() => match msg {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    trace!(len = text.len(), "received text message");
                    SessionEvent::Text(text.as_str().to_owned())
                }
                Some(Ok(tungstenite::Message::Binary(data))) => {
                    trace!(len = data.len(), "received binary message");
                    SessionEvent::Binary(data.to_vec())
                }
                Some(Ok(tungstenite::Message::Ping(data))) => {
                    trace!("received ping, sending pong");
                    let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                    continue;
                }
                Some(Ok(tungstenite::Message::Pong(_))) => {
                    trace!("received pong");
                    continue;
                }
                Some(Ok(tungstenite::Message::Close(frame))) => {
                    let info = match frame {
                        Some(f) => CloseInfo {
                            code: u16::from(f.code),
                            reason: f.reason.as_str().to_owned(),
                        },
                        None => CloseInfo {
                            code: CLOSE_NO_STATUS,
                            reason: String::new(),
                        },
                    };
                    debug!(code = info.code, reason = %info.reason, "received close frame");
                    SessionEvent::Closed(info)
                }
                Some(Ok(tungstenite::Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    warn!("WebSocket read error: {e}");
                    SessionEvent::Failed(e.to_string())
                }
                None => {
                    debug!("WebSocket stream ended without close frame");
                    SessionEvent::Closed(CloseInfo {
                        code: CLOSE_ABNORMAL,
                        reason: String::new(),
                    })
                }
            },
        };

        let terminal = event.is_terminal();
        if events_tx.send(event).await.is_err() {
            debug!("session events receiver dropped; stopping read pump");
            break;
        }
        if terminal {
            break;
        }
    }
}
