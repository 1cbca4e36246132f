//! Command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use fileshelf_client::{
    CredentialStore, DiskSaver, DownloadOutcome, EventBus, FileApi, Identity, IdentityProvider,
    ProgressEvent, TransferClient, default_credentials_path, refresh_authentication,
};
use fileshelf_protocol::EventName;
use tokio_util::sync::CancellationToken;

use crate::config::{CliConfig, default_config_path};
use crate::{Cli, Command};

/// Everything a command needs.
struct App {
    config: CliConfig,
    credentials: Arc<CredentialStore>,
    bus: Arc<EventBus>,
}

impl App {
    fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = match &cli.config {
            Some(p) => p.clone(),
            None => default_config_path()?,
        };
        let config = match CliConfig::load_or_create(&config_path) {
            Ok(c) => {
                tracing::debug!(path = %config_path.display(), "configuration loaded");
                c
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load config, using defaults");
                CliConfig::default()
            }
        };

        let credentials_path = match &cli.credentials {
            Some(p) => p.clone(),
            None => default_credentials_path()
                .context("cannot determine the credentials path (HOME is not set)")?,
        };
        let credentials = CredentialStore::open(credentials_path)
            .context("failed to read stored credentials")?;

        Ok(Self {
            config,
            credentials: Arc::new(credentials),
            bus: Arc::new(EventBus::new()),
        })
    }

    fn api(&self) -> FileApi {
        let api = FileApi::new(reqwest::Client::new(), &self.config.api_url);
        match self.credentials.identity() {
            Some(identity) => api.with_token(&identity.token),
            None => api,
        }
    }

    fn transfer_client(&self, download_dir: PathBuf) -> TransferClient {
        TransferClient::new(
            self.config.transfer_config(),
            self.credentials.clone(),
            self.bus.clone(),
            Arc::new(DiskSaver::new(download_dir)),
        )
    }
}

/// Returns a token that is cancelled on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling transfer");
            token.cancel();
        }
    });
    cancel
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let app = App::load(&cli)?;

    match cli.command {
        Command::Upload { paths } => {
            app.bus.subscribe(EventName::UploadProgress, |payload| {
                if let Some(progress) = ProgressEvent::from_payload(payload) {
                    println!(
                        "{}: {:.1}%",
                        progress.file_name, progress.upload_percentage
                    );
                }
            });

            let client = app.transfer_client(app.config.download_dir.clone());
            let cancel = cancel_on_ctrl_c();
            if let Some(report) = client.upload_first(&paths, &cancel).await? {
                if !report.is_complete() {
                    bail!(
                        "server ended the upload of {} after {} of {} chunks",
                        report.file_name,
                        report.chunks_acknowledged,
                        report.total_chunks
                    );
                }
                println!(
                    "uploaded {} ({} bytes in {} chunks)",
                    report.file_name, report.bytes_sent, report.total_chunks
                );
            }
        }

        Command::Download { file_id, out } => {
            let dir = out.unwrap_or_else(|| app.config.download_dir.clone());
            let client = app.transfer_client(dir);
            let cancel = cancel_on_ctrl_c();
            match client.download(file_id, &cancel).await? {
                DownloadOutcome::Saved {
                    path,
                    bytes,
                    sha256,
                    ..
                } => {
                    println!("saved {} ({bytes} bytes, sha256 {sha256})", path.display());
                }
                DownloadOutcome::NotMaterialized { reason, .. } => {
                    bail!("server ended the download without completing it: {reason}");
                }
            }
        }

        Command::List { name } => {
            let files = app.api().list_files(name.as_deref()).await?;
            if files.is_empty() {
                println!("no files");
            }
            for file in files {
                println!(
                    "{:>6}  {:<40}  {:<20}  {}",
                    file.id, file.name, file.owner_username, file.created_date
                );
            }
        }

        Command::Delete { file_id } => {
            app.api().delete_file(file_id).await?;
            println!("deleted file {file_id}");
        }

        Command::Status => {
            let authenticated =
                refresh_authentication(&app.api(), &*app.credentials, &app.bus).await;
            match (authenticated, app.credentials.identity()) {
                (true, Some(identity)) => println!("authenticated as user {}", identity.user_id),
                (false, Some(_)) => println!("stored credentials were rejected"),
                (_, None) => println!("not logged in"),
            }
        }

        Command::Login { user_id, token } => {
            app.credentials
                .login(Identity { user_id, token }, &app.bus)?;
            println!(
                "credentials for user {user_id} saved to {}",
                app.credentials.path().display()
            );
        }

        Command::Logout => {
            app.credentials.logout(&app.bus)?;
            println!("logged out");
        }
    }

    Ok(())
}
