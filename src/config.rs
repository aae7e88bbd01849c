use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::directory::nmcli::DEFAULT_NOT_FOUND_EXIT_CODE;

/// System-wide configuration file, optional.
pub const CONFIG_FILE: &str = "/etc/nmconn.toml";
/// Prefix of the environment variables overriding the configuration.
pub const ENV_PREFIX: &str = "NMCONN_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    pub nmcli_path: String,
    /// Deadline for the whole reconciliation, lookup included.
    pub timeout_secs: u64,
    /// Exit code `nmcli connection show` returns for an unknown connection.
    pub not_found_exit_code: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nmcli_path: "nmcli".into(),
            timeout_secs: 10,
            not_found_exit_code: DEFAULT_NOT_FOUND_EXIT_CODE,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file(CONFIG_FILE))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        if config.timeout_secs == 0 {
            anyhow::bail!("Invalid timeout_secs: must be greater than zero");
        }
        if config.nmcli_path.trim().is_empty() {
            anyhow::bail!("Invalid nmcli_path: must not be empty");
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
