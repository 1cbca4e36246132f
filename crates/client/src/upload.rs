//! Upload pipeline: announce, then one chunk per acknowledgment.

use std::path::Path;

use fileshelf_protocol::{EventName, UploadAck, UploadInit};
use fileshelf_transfer::{ChunkReader, upload_file_name};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::client::TransferClient;
use crate::error::{Phase, TransferClientError};
use crate::events::ProgressEvent;
use crate::identity::Identity;
use crate::session::{CloseInfo, SessionEvent, TransportSession, recv_within, upload_url};
use crate::state::{StateTracker, TransferState};

/// Summary of a finished upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    pub file_name: String,
    pub total_chunks: u64,
    pub chunks_acknowledged: u64,
    pub bytes_sent: u64,
    /// Percentage reported by the last acknowledgment (0 when no chunk was sent).
    pub last_percentage: f64,
}

impl UploadReport {
    /// Whether the server acknowledged every chunk before closing.
    ///
    /// A server may close normally before that; the upload still resolves
    /// successfully and this returns `false`.
    pub fn is_complete(&self) -> bool {
        self.chunks_acknowledged == self.total_chunks
    }
}

/// What the acknowledgment listener hands to the chunk producer.
#[derive(Debug)]
enum AckSignal {
    Ack(UploadAck),
    Malformed(String),
    Closed(CloseInfo),
    Failed(String),
}

impl TransferClient {
    /// Uploads the file at `path`.
    ///
    /// Chunks go out strictly one at a time: chunk `i + 1` is only sent
    /// after the server acknowledged chunk `i`. Each acknowledgment is
    /// published as an `upload-progress` event. The upload succeeds when
    /// the server closes the connection with code 1000, even if that close
    /// comes before the last acknowledgment (see
    /// [`UploadReport::is_complete`]).
    pub async fn upload(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<UploadReport, TransferClientError> {
        let mut tracker = StateTracker::new("upload");
        let result = self.run_upload(path, cancel, &mut tracker).await;
        tracker.finish(&result);

        match &result {
            Ok(report) if report.is_complete() => info!(
                file = %report.file_name,
                chunks = report.total_chunks,
                bytes = report.bytes_sent,
                "upload complete"
            ),
            Ok(report) => warn!(
                file = %report.file_name,
                acknowledged = report.chunks_acknowledged,
                total = report.total_chunks,
                "server closed the upload before acknowledging every chunk"
            ),
            Err(e) => warn!(path = %path.display(), error = %e, "upload failed"),
        }
        result
    }

    async fn run_upload(
        &self,
        path: &Path,
        cancel: &CancellationToken,
        tracker: &mut StateTracker,
    ) -> Result<UploadReport, TransferClientError> {
        let identity = self
            .identity
            .identity()
            .ok_or(TransferClientError::Authentication)?;
        let file_name = upload_file_name(path)?;
        let mut reader = ChunkReader::open(path, self.config.chunk_size).await?;

        tracker.advance(TransferState::Connecting);
        let url = upload_url(&self.config.ws_url, &identity.token);
        let mut session =
            TransportSession::connect(&url, self.config.connect_timeout, cancel).await?;

        let events = session
            .take_events()
            .ok_or(TransferClientError::SessionClosed)?;
        let (ack_tx, ack_rx) = mpsc::channel::<AckSignal>(1);
        let listener = tokio::spawn(ack_listener(events, ack_tx));

        let result = self
            .drive_upload(
                &session, &mut reader, ack_rx, &identity, file_name, cancel, tracker,
            )
            .await;

        if result.is_err() {
            session.mark_errored();
        }
        session.close().await;
        listener.abort();
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn drive_upload(
        &self,
        session: &TransportSession,
        reader: &mut ChunkReader,
        mut ack_rx: mpsc::Receiver<AckSignal>,
        identity: &Identity,
        file_name: String,
        cancel: &CancellationToken,
        tracker: &mut StateTracker,
    ) -> Result<UploadReport, TransferClientError> {
        let total_chunks = reader.total_chunks();
        tracker.advance(TransferState::Active { step: 0 });

        session
            .send_json(&UploadInit {
                total_chunks,
                file_name: file_name.clone(),
                user_id: identity.user_id,
            })
            .await?;
        debug!(file = %file_name, total_chunks, size = reader.file_size(), "upload announced");

        let mut report = UploadReport {
            file_name,
            total_chunks,
            chunks_acknowledged: 0,
            bytes_sent: 0,
            last_percentage: 0.0,
        };

        while let Some(chunk) = reader.next_chunk().await? {
            let len = chunk.data.len() as u64;
            trace!(index = chunk.index, offset = chunk.offset, len, "sending chunk");
            session.send_binary(chunk.data).await?;

            let ack = match recv_within(
                &mut ack_rx,
                self.config.ack_timeout,
                Phase::ChunkAck,
                cancel,
            )
            .await?
            {
                Some(AckSignal::Ack(ack)) => ack,
                Some(AckSignal::Malformed(text)) => {
                    return Err(TransferClientError::Protocol(format!(
                        "malformed chunk acknowledgment: {text}"
                    )));
                }
                Some(AckSignal::Closed(info)) if info.is_normal() => {
                    debug!(
                        index = chunk.index,
                        reason = %info.reason,
                        "normal close while waiting for an acknowledgment"
                    );
                    return Ok(report);
                }
                Some(AckSignal::Closed(info)) => {
                    return Err(TransferClientError::Transfer {
                        code: info.code,
                        reason: info.reason,
                    });
                }
                Some(AckSignal::Failed(reason)) => {
                    return Err(TransferClientError::socket(reason));
                }
                None => return Err(TransferClientError::socket("connection lost")),
            };

            report.chunks_acknowledged += 1;
            report.bytes_sent += len;
            report.last_percentage = ack.upload_percentage;
            debug!(
                index = chunk.index,
                percentage = ack.upload_percentage,
                "chunk acknowledged"
            );

            let progress = ProgressEvent {
                file_name: report.file_name.clone(),
                upload_percentage: ack.upload_percentage,
            };
            self.bus
                .publish(EventName::UploadProgress, &progress.to_payload());
            tracker.advance(TransferState::Active {
                step: chunk.index + 1,
            });
        }

        tracker.advance(TransferState::Closing);
        loop {
            match recv_within(&mut ack_rx, self.config.close_timeout, Phase::Close, cancel).await? {
                Some(AckSignal::Closed(info)) if info.is_normal() => return Ok(report),
                Some(AckSignal::Closed(info)) => {
                    return Err(TransferClientError::Transfer {
                        code: info.code,
                        reason: info.reason,
                    });
                }
                Some(AckSignal::Failed(reason)) => {
                    return Err(TransferClientError::socket(reason));
                }
                Some(AckSignal::Ack(_)) | Some(AckSignal::Malformed(_)) => {
                    warn!("ignoring message received after the last acknowledgment");
                }
                None => return Err(TransferClientError::socket("connection lost")),
            }
        }
    }
}

/// Converts session events into acknowledgment signals.
///
/// The channel to the producer has capacity 1, so at most one signal is
/// ever buffered.
async fn ack_listener(mut events: mpsc::Receiver<SessionEvent>, acks: mpsc::Sender<AckSignal>) {
    while let Some(event) = events.recv().await {
        let signal = match event {
            SessionEvent::Text(text) => match serde_json::from_str::<UploadAck>(&text) {
                Ok(ack) => AckSignal::Ack(ack),
                Err(e) => AckSignal::Malformed(format!("{e}: {text}")),
            },
            SessionEvent::Binary(data) => {
                warn!(len = data.len(), "ignoring binary message during upload");
                continue;
            }
            SessionEvent::Closed(info) => AckSignal::Closed(info),
            SessionEvent::Failed(reason) => AckSignal::Failed(reason),
        };

        let terminal = matches!(signal, AckSignal::Closed(_) | AckSignal::Failed(_));
        if acks.send(signal).await.is_err() || terminal {
            break;
        }
    }
}
