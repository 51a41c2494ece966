//! Configuration loading for nlip-agent.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Get the nlip-agent home directory (~/.nlip-agent).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".nlip-agent"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.nlip-agent/settings.json.
///
/// A worker needs no mandatory configuration, so a missing file yields
/// defaults instead of an error.
pub fn load_settings() -> Result<Settings> {
    let path = get_settings_path()?;
    load_settings_from(&path)
}

pub(crate) fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Persist settings to ~/.nlip-agent/settings.json.
pub fn save_settings(settings: &Settings) -> Result<()> {
    let path = get_settings_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(settings)?)?;
    Ok(())
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.server.host.trim().is_empty() {
        return Err(Error::Config("server.host must not be empty".to_string()));
    }
    if settings.http.timeout_secs == 0 {
        return Err(Error::Config("http.timeout_secs must be positive".to_string()));
    }
    for (name, url) in &settings.peers {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(format!(
                "peer '{}' has a non-HTTP base URL: {}",
                name, url
            )));
        }
    }
    Ok(())
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub http: HttpSettings,

    /// Named peer workers: peer name -> base URL.
    #[serde(default)]
    pub peers: HashMap<String, String>,
}

impl Settings {
    /// Resolve a peer operand: a configured peer name or a raw base URL.
    pub fn resolve_peer(&self, peer: &str) -> Result<String> {
        if peer.starts_with("http://") || peer.starts_with("https://") {
            return Ok(peer.to_string());
        }
        self.peers
            .get(peer)
            .cloned()
            .ok_or_else(|| Error::Config(format!("Unknown peer '{}' (not in settings.peers)", peer)))
    }
}

/// Worker bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Outbound HTTP behavior for the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8010
}

fn default_timeout_secs() -> u64 {
    60
}
