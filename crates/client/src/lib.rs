//! Fileshelf transfer client.
//!
//! Moves files to and from a Fileshelf server over a dedicated WebSocket
//! per transfer:
//!
//! 1. **Upload** — announce the file, send 1 MiB chunks one at a time and
//!    wait for the server's acknowledgment after each
//! 2. **Download** — read the metadata message, collect binary fragments
//!    in arrival order, save the file when the server closes with
//!    `"file sent"`
//!
//! Listing, searching and deleting stored files goes through the REST
//! API in [`api`].

pub mod api;
pub mod client;
pub mod config;
mod download;
pub mod error;
pub mod events;
pub mod identity;
mod pumps;
pub mod saver;
pub mod session;
pub mod state;
mod upload;

#[cfg(test)]
mod testutil;

pub use api::{ApiError, FileApi};
pub use client::{TransferClient, select_upload_source};
pub use config::TransferConfig;
pub use download::DownloadOutcome;
pub use error::{ErrorKind, Phase, TransferClientError};
pub use events::{EventBus, EventPayload, ProgressEvent, SubscriberId};
pub use identity::{
    CredentialError, CredentialStore, Identity, IdentityProvider, StaticIdentity, config_dir,
    default_credentials_path, refresh_authentication,
};
pub use saver::{DiskSaver, FileSaver};
pub use session::{CloseInfo, SessionEvent, SessionState, TransportSession};
pub use state::TransferState;
pub use upload::UploadReport;
