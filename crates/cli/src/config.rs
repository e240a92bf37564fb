//! Configuration for the `tradedesk` binary.
//!
//! Loaded from a TOML file; command-line flags override individual values.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tradedesk_api::{ApiClientConfig, DEFAULT_BASE_URL};
use tradedesk_engine::SyncConfig;

pub const DEFAULT_CONFIG_FILE: &str = "tradedesk.toml";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub api: ApiClientConfig,
    pub sync: SyncConfig,
    /// Where the signed-in session is kept between runs. `None` means
    /// `$HOME/.tradedesk/session.json`.
    pub session_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlConfig = toml::from_str(content).context("Failed to parse TOML config")?;
        Ok(Self::from(file))
    }

    /// Load `path` if given, else the default file if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(&mut self, base_url: Option<String>, session_file: Option<PathBuf>) {
        if let Some(url) = base_url {
            self.api.base_url = url;
        }
        if let Some(path) = session_file {
            self.session_file = Some(path);
        }
    }

    /// The session file path, falling back to the home directory.
    pub fn session_file(&self) -> Result<PathBuf> {
        resolve_session_file(self.session_file.as_deref(), std::env::var_os("HOME"))
    }
}

fn resolve_session_file(explicit: Option<&Path>, home: Option<OsString>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match home.filter(|h| !h.is_empty()) {
        Some(home) => Ok(PathBuf::from(home).join(".tradedesk").join("session.json")),
        None => bail!("HOME is not set; pass --session-file or set [session] file in the config"),
    }
}

/// TOML file structure for deserialization.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    api: ApiToml,
    #[serde(default)]
    sync: SyncConfig,
    #[serde(default)]
    session: SessionToml,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ApiToml {
    base_url: String,
    timeout_secs: u64,
}

impl Default for ApiToml {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SessionToml {
    file: Option<PathBuf>,
}

impl From<TomlConfig> for AppConfig {
    fn from(toml: TomlConfig) -> Self {
        Self {
            api: ApiClientConfig::default()
                .with_base_url(toml.api.base_url)
                .with_timeout_secs(toml.api.timeout_secs),
            sync: toml.sync,
            session_file: toml.session.file,
        }
    }
}
