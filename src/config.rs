// Configuration management module
// Handles loading and validating configuration

use crate::error::{Result, ScrobbleError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROTOCOL_VERSION: &str = "1.2.1";
pub const LASTFM_AUTH_URL: &str = "http://post.audioscrobbler.com";
pub const LIBREFM_AUTH_URL: &str = "http://turtle.libre.fm";

const APP_DIR: &str = "scrobble-hook";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Client identifier sent with the handshake
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Client version sent with the handshake
    #[serde(default = "default_client_version")]
    pub client_version: String,

    /// Timeout in seconds for every HTTP request
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Last.fm account
    pub lastfm: Option<ServiceConfig>,

    /// Libre.fm account
    pub librefm: Option<ServiceConfig>,
}

/// Credentials and endpoints of one Audioscrobbler-compatible service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub user: String,

    /// Bare password, or `md5:<hex digest>` of it
    #[serde(default)]
    pub password: String,

    /// Handshake URL, defaults to the service's public endpoint
    pub url: Option<String>,

    #[serde(default = "default_protocol_version")]
    pub version: String,

    /// Journal of scrobbles awaiting submission; no caching when unset
    pub journal: Option<PathBuf>,
}

/// A validated service ready to be handed to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: &'static str,
    pub auth_url: String,
    pub version: String,
    pub user: String,
    pub password: String,
    pub journal: Option<PathBuf>,
}

fn default_client_id() -> String {
    "tst".to_string()
}

fn default_client_version() -> String {
    "1.0".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            client_version: default_client_version(),
            timeout_secs: default_timeout(),
            lastfm: None,
            librefm: None,
        }
    }
}

impl Config {
    /// Get the default path of the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| ScrobbleError::config("Failed to get config directory"))?;

        Ok(config_dir.join(APP_DIR).join("config.toml"))
    }

    /// Get the default directory holding the playback settings file
    pub fn state_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| ScrobbleError::config("Failed to get data directory"))?;

        Ok(data_dir.join(APP_DIR))
    }

    /// Load and validate configuration from a file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScrobbleError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| ScrobbleError::config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ScrobbleError::config("timeout_secs must be greater than 0"));
        }
        if self.client_id.is_empty() {
            return Err(ScrobbleError::config("client_id must not be empty"));
        }

        if self.lastfm.is_none() && self.librefm.is_none() {
            log::warn!("No scrobbling services are configured");
        }

        if let Some(lastfm) = &self.lastfm {
            lastfm.validate("lastfm")?;
        }
        if let Some(librefm) = &self.librefm {
            librefm.validate("librefm")?;
        }

        Ok(())
    }

    /// The configured services in submission order
    pub fn services(&self) -> Vec<Service> {
        let mut services = Vec::new();
        if let Some(librefm) = &self.librefm {
            services.push(librefm.to_service("Libre.fm", LIBREFM_AUTH_URL));
        }
        if let Some(lastfm) = &self.lastfm {
            services.push(lastfm.to_service("Last.fm", LASTFM_AUTH_URL));
        }
        services
    }
}

impl ServiceConfig {
    fn validate(&self, section: &str) -> Result<()> {
        if self.user.is_empty() {
            return Err(ScrobbleError::config(format!("{}.user is required", section)));
        }
        if self.password.is_empty() {
            return Err(ScrobbleError::config(format!("{}.password is required", section)));
        }
        if self.version.is_empty() {
            return Err(ScrobbleError::config(format!("{}.version must not be empty", section)));
        }
        if matches!(&self.url, Some(url) if url.is_empty()) {
            return Err(ScrobbleError::config(format!("{}.url must not be empty", section)));
        }
        Ok(())
    }

    fn to_service(&self, name: &'static str, default_url: &str) -> Service {
        Service {
            name,
            auth_url: self.url.clone().unwrap_or_else(|| default_url.to_string()),
            version: self.version.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            journal: self.journal.clone(),
        }
    }
}
