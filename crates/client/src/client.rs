//! Transfer client facade.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::TransferConfig;
use crate::error::TransferClientError;
use crate::events::EventBus;
use crate::identity::IdentityProvider;
use crate::saver::FileSaver;
use crate::upload::UploadReport;

/// Runs uploads and downloads against one server.
///
/// Cheap to share behind an `Arc`; every transfer opens its own
/// [`TransportSession`](crate::TransportSession), so several transfers may
/// run concurrently.
pub struct TransferClient {
    pub(crate) config: TransferConfig,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) saver: Arc<dyn FileSaver>,
}

impl TransferClient {
    pub fn new(
        config: TransferConfig,
        identity: Arc<dyn IdentityProvider>,
        bus: Arc<EventBus>,
        saver: Arc<dyn FileSaver>,
    ) -> Self {
        Self {
            config,
            identity,
            bus,
            saver,
        }
    }

    /// Event bus receiving `upload-progress` events.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Uploads the first of `paths`; the rest are ignored.
    ///
    /// Returns `Ok(None)` when `paths` is empty.
    pub async fn upload_first(
        &self,
        paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<Option<UploadReport>, TransferClientError> {
        match select_upload_source(paths) {
            Some(path) => self.upload(path, cancel).await.map(Some),
            None => Ok(None),
        }
    }
}

/// Picks the file to upload from a multi-file selection.
///
/// Only one file is uploaded per action; extra selections are logged and
/// dropped.
pub fn select_upload_source(paths: &[PathBuf]) -> Option<&Path> {
    let (first, rest) = paths.split_first()?;
    if !rest.is_empty() {
        warn!(
            selected = %first.display(),
            ignored = rest.len(),
            "only one file is uploaded per action; ignoring the rest"
        );
    }
    Some(first.as_path())
}
