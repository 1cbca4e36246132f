//! CLI configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `$XDG_CONFIG_HOME/fileshelf/config.toml` (or `~/.config/...`)
//! - Windows: `%APPDATA%/fileshelf/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use fileshelf_client::TransferConfig;
use fileshelf_protocol::constants::{
    DEFAULT_API_URL, DEFAULT_WS_URL, WS_ACK_TIMEOUT, WS_CLOSE_TIMEOUT, WS_CONNECT_TIMEOUT,
    WS_FRAGMENT_TIMEOUT,
};
use serde::{Deserialize, Serialize};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Base URL of the REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the transfer WebSocket endpoints.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Where downloads are saved unless `--out` is given.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_secs: u64,

    #[serde(default = "default_fragment_timeout")]
    pub fragment_timeout_secs: u64,

    #[serde(default = "default_close_timeout")]
    pub close_timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.into()
}

fn default_download_dir() -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join("Downloads"))
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn default_connect_timeout() -> u64 {
    WS_CONNECT_TIMEOUT.as_secs()
}

fn default_ack_timeout() -> u64 {
    WS_ACK_TIMEOUT.as_secs()
}

fn default_fragment_timeout() -> u64 {
    WS_FRAGMENT_TIMEOUT.as_secs()
}

fn default_close_timeout() -> u64 {
    WS_CLOSE_TIMEOUT.as_secs()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
            download_dir: default_download_dir(),
            connect_timeout_secs: default_connect_timeout(),
            ack_timeout_secs: default_ack_timeout(),
            fragment_timeout_secs: default_fragment_timeout(),
            close_timeout_secs: default_close_timeout(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from `path`, or writes and returns the defaults
    /// if the file does not exist yet.
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: CliConfig = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            let config = CliConfig::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Pipeline settings derived from this configuration.
    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            ws_url: self.ws_url.clone(),
            connect_timeout: secs(self.connect_timeout_secs),
            ack_timeout: secs(self.ack_timeout_secs),
            fragment_timeout: secs(self.fragment_timeout_secs),
            close_timeout: secs(self.close_timeout_secs),
            ..TransferConfig::default()
        }
    }
}

/// Seconds to a duration, clamped to at least one second.
fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

/// Returns the default configuration file path.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    fileshelf_client::config_dir()
        .map(|d| d.join("fileshelf").join("config.toml"))
        .context("cannot determine the configuration directory (HOME is not set)")
}
