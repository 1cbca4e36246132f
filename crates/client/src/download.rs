//! Download pipeline: metadata first, then fragments until the server
//! closes.

use std::path::PathBuf;

use fileshelf_protocol::{DOWNLOAD_COMPLETE_REASON, DownloadMetadata};
use fileshelf_transfer::{FragmentAssembler, checksum_bytes, validate_save_name};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::client::TransferClient;
use crate::error::{Phase, TransferClientError};
use crate::session::{SessionEvent, TransportSession, download_url, recv_within};
use crate::state::{StateTracker, TransferState};

/// How a download that ended with a normal close was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    /// The server confirmed completion and the file was saved.
    Saved {
        path: PathBuf,
        file_name: String,
        bytes: u64,
        /// Hex SHA-256 of the saved bytes.
        sha256: String,
    },
    /// The server closed normally without confirming completion, so the
    /// received bytes were discarded.
    NotMaterialized {
        file_name: String,
        reason: String,
        bytes_received: u64,
    },
}

impl TransferClient {
    /// Downloads stored file `file_id` and saves it through the client's
    /// [`FileSaver`](crate::FileSaver).
    pub async fn download(
        &self,
        file_id: u64,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, TransferClientError> {
        let mut tracker = StateTracker::new("download");
        let result = self.run_download(file_id, cancel, &mut tracker).await;
        tracker.finish(&result);

        match &result {
            Ok(DownloadOutcome::Saved { path, bytes, .. }) => {
                info!(file_id, path = %path.display(), bytes, "download complete")
            }
            Ok(DownloadOutcome::NotMaterialized { reason, .. }) => {
                warn!(file_id, %reason, "server closed without confirming the download; nothing saved")
            }
            Err(e) => warn!(file_id, error = %e, "download failed"),
        }
        result
    }

    async fn run_download(
        &self,
        file_id: u64,
        cancel: &CancellationToken,
        tracker: &mut StateTracker,
    ) -> Result<DownloadOutcome, TransferClientError> {
        let identity = self
            .identity
            .identity()
            .ok_or(TransferClientError::Authentication)?;

        tracker.advance(TransferState::Connecting);
        let url = download_url(&self.config.ws_url, file_id, &identity.token);
        let mut session =
            TransportSession::connect(&url, self.config.connect_timeout, cancel).await?;

        let result = match session.take_events() {
            Some(events) => self.drive_download(events, cancel, tracker).await,
            None => Err(TransferClientError::SessionClosed),
        };

        if result.is_err() {
            session.mark_errored();
        }
        session.close().await;
        result
    }

    async fn drive_download(
        &self,
        mut events: mpsc::Receiver<SessionEvent>,
        cancel: &CancellationToken,
        tracker: &mut StateTracker,
    ) -> Result<DownloadOutcome, TransferClientError> {
        tracker.advance(TransferState::Active { step: 0 });

        let metadata = match recv_within(
            &mut events,
            self.config.fragment_timeout,
            Phase::Metadata,
            cancel,
        )
        .await?
        {
            Some(SessionEvent::Text(text)) => parse_metadata(text.as_bytes())?,
            Some(SessionEvent::Binary(data)) => parse_metadata(&data)?,
            Some(SessionEvent::Closed(info)) if info.is_normal() => {
                return Err(TransferClientError::Protocol(
                    "server closed before sending download metadata".into(),
                ));
            }
            Some(SessionEvent::Closed(info)) => {
                return Err(TransferClientError::Transfer {
                    code: info.code,
                    reason: info.reason,
                });
            }
            Some(SessionEvent::Failed(reason)) => {
                return Err(TransferClientError::socket(reason));
            }
            None => return Err(TransferClientError::socket("connection lost")),
        };
        let file_name = validate_save_name(&metadata.file_name)?.to_string();
        debug!(file = %file_name, "download metadata received");

        let mut assembler = FragmentAssembler::new();
        let close = loop {
            let event = recv_within(
                &mut events,
                self.config.fragment_timeout,
                Phase::Fragment,
                cancel,
            )
            .await?;

            let fragment = match event {
                Some(SessionEvent::Binary(data)) => data,
                Some(SessionEvent::Text(text)) => text.into_bytes(),
                Some(SessionEvent::Closed(info)) => break info,
                Some(SessionEvent::Failed(reason)) => {
                    return Err(TransferClientError::socket(reason));
                }
                None => return Err(TransferClientError::socket("connection lost")),
            };

            trace!(len = fragment.len(), total = assembler.len(), "fragment received");
            assembler.push(fragment);
            tracker.advance(TransferState::Active {
                step: assembler.fragment_count() as u64,
            });
        };

        tracker.advance(TransferState::Closing);
        if !close.is_normal() {
            return Err(TransferClientError::Transfer {
                code: close.code,
                reason: close.reason,
            });
        }

        let bytes_received = assembler.len() as u64;
        if close.reason != DOWNLOAD_COMPLETE_REASON {
            return Ok(DownloadOutcome::NotMaterialized {
                file_name,
                reason: close.reason,
                bytes_received,
            });
        }

        debug!(
            file = %file_name,
            fragments = assembler.fragment_count(),
            bytes = bytes_received,
            "assembling download"
        );
        let data = assembler.assemble();
        let sha256 = checksum_bytes(&data);
        let path = self.saver.save(&file_name, &data).await?;

        Ok(DownloadOutcome::Saved {
            path,
            file_name,
            bytes: bytes_received,
            sha256,
        })
    }
}

fn parse_metadata(raw: &[u8]) -> Result<DownloadMetadata, TransferClientError> {
    serde_json::from_slice(raw).map_err(|e| {
        let preview: String = String::from_utf8_lossy(raw).chars().take(64).collect();
        TransferClientError::Protocol(format!("malformed download metadata ({e}): {preview}"))
    })
}
