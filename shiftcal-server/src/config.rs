//! Server configuration.
//!
//! Loaded from `~/.config/shiftcal/config.toml` (override with the
//! `SHIFTCAL_CONFIG` environment variable). A default file is written on
//! first start so the knobs are discoverable.

use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use shiftcal_core::AccessPolicy;

const DEFAULT_PORT: u16 = 4820;
const DEFAULT_SESSION_TTL_HOURS: i64 = 720;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_session_ttl_hours() -> i64 {
    DEFAULT_SESSION_TTL_HOURS
}

fn default_auth_enabled() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shiftcal")
        .join("shiftcal.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// When false the server runs accountless; every caller is a guest.
    #[serde(default = "default_auth_enabled")]
    pub auth_enabled: bool,

    /// Global switch for anonymous access to public calendars.
    #[serde(default)]
    pub allow_guest_access: bool,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: DEFAULT_PORT,
            database_path: default_database_path(),
            auth_enabled: true,
            allow_guest_access: false,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
        }
    }
}

impl ServerConfig {
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("SHIFTCAL_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("shiftcal");

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::write_default(&config_path)?;
        }

        let config: ServerConfig = Config::builder()
            .add_source(File::from(config_path).required(false))
            .build()
            .context("Failed to read config")?
            .try_deserialize()
            .context("Failed to parse config")?;

        Ok(config)
    }

    fn write_default(path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(&ServerConfig::default())
            .context("Failed to serialize default config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// The access policy slice injected into the permission resolver.
    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy {
            auth_enabled: self.auth_enabled,
            allow_guest_access: self.allow_guest_access,
        }
    }
}
