//! TOML configuration file loading
//!
//! Supports `~/.config/smarthome-fulfillment/config.toml` as a persistent config
//! source. Every field is optional; the file only overlays defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct FulfillmentConfigFile {
    #[serde(default)]
    pub server: ServerFileConfig,

    #[serde(default)]
    pub auth: AuthFileConfig,

    #[serde(default)]
    pub homegraph: HomeGraphFileConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Port the fulfillment endpoint listens on
    pub port: Option<u16>,
}

/// Access token validation
#[derive(Debug, Default, Deserialize)]
pub struct AuthFileConfig {
    /// OpenID Connect userinfo endpoint; static tokens are used when unset
    pub userinfo_url: Option<String>,

    /// Agent user id for push commands
    pub agent_user_id: Option<String>,

    /// Static access token to user id table
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HomeGraphFileConfig {
    /// Path to the service account key JSON
    pub service_account: Option<String>,

    /// API root override
    pub base_url: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `FulfillmentConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> FulfillmentConfigFile {
    config_file_path().map_or_else(FulfillmentConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_file_from(path: &Path) -> FulfillmentConfigFile {
    if !path.exists() {
        return FulfillmentConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                FulfillmentConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read config file");
            FulfillmentConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/smarthome-fulfillment/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.config_dir().join("smarthome-fulfillment").join("config.toml"))
}
