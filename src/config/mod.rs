//! Configuration management for the fulfillment service
//!
//! Values resolve as environment variable, then config file, then default.

pub mod file;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::{Error, Result};

/// Default fulfillment listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Fulfillment service configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Port to listen on (`FULFILLMENT_PORT`)
    pub port: u16,

    /// Agent user id push commands act on (`FULFILLMENT_AGENT_USER_ID`)
    pub agent_user_id: Option<String>,

    /// Userinfo endpoint for token validation (`FULFILLMENT_USERINFO_URL`)
    pub userinfo_url: Option<String>,

    /// Static access tokens, used when no userinfo endpoint is configured
    pub access_tokens: HashMap<String, String>,

    /// HomeGraph service account key (`HOMEGRAPH_SERVICE_ACCOUNT`)
    pub homegraph_service_account: Option<PathBuf>,

    /// HomeGraph API root override
    pub homegraph_url: Option<String>,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is malformed
    pub fn load() -> Result<Self> {
        Self::resolve(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with values from `env`
    ///
    /// # Errors
    ///
    /// Returns error if `FULFILLMENT_PORT` is not a valid port
    pub fn resolve(
        fc: file::FulfillmentConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let port = match env("FULFILLMENT_PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| Error::Config(format!("invalid FULFILLMENT_PORT: {port}")))?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };

        Ok(Self {
            port,
            agent_user_id: env("FULFILLMENT_AGENT_USER_ID").or(fc.auth.agent_user_id),
            userinfo_url: env("FULFILLMENT_USERINFO_URL").or(fc.auth.userinfo_url),
            access_tokens: fc.auth.tokens,
            homegraph_service_account: env("HOMEGRAPH_SERVICE_ACCOUNT")
                .or(fc.homegraph.service_account)
                .map(PathBuf::from),
            homegraph_url: fc.homegraph.base_url,
        })
    }
}
