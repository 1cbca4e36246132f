//! Fileshelf command-line client.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Upload, download and manage files on a Fileshelf server
#[derive(Parser)]
#[command(name = "fileshelf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (default: ~/.config/fileshelf/config.toml)
    #[arg(long, global = true, env = "FILESHELF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Credentials file (default: ~/.config/fileshelf/credentials.json)
    #[arg(long, global = true, env = "FILESHELF_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Upload a file (only the first of several paths is uploaded)
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Download a stored file by id
    Download {
        file_id: u64,

        /// Directory to save into (default: download_dir from the config)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List stored files
    List {
        /// Only files whose name matches
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a stored file by id
    Delete { file_id: u64 },

    /// Check whether the stored credentials are still accepted
    Status,

    /// Store credentials for later commands
    Login {
        #[arg(long)]
        user_id: u64,

        #[arg(long, env = "FILESHELF_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Forget the stored credentials
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(cli).await
}
