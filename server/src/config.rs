//! Layered configuration: a `server.toml` file overlaid with CLI flags.
//!
//! Modeled on the server settings file the upstream TUI/server pair uses
//! (`ServerSettings` loaded through a [`Figment`]), trimmed to the handful of
//! knobs this backend actually needs and without the version-migration
//! machinery that settings format doesn't require here.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use figment::providers::{Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Args;

pub const FILE_NAME: &str = "server.toml";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_all: bool,
    pub database: PathBuf,
    pub snapshot: PathBuf,
    pub api_key_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9009,
            bind_all: false,
            database: PathBuf::from("./ytbox.db"),
            snapshot: PathBuf::from("/tmp/ytbox.queue"),
            api_key_file: None,
        }
    }
}

impl ServerConfig {
    /// Merge an optional `server.toml` with CLI overrides, CLI taking
    /// precedence over the file and the file taking precedence over the
    /// struct's defaults.
    pub fn load(config_path: Option<&PathBuf>, args: &Args) -> Result<Self> {
        let mut figment = Figment::from(figment::providers::Serialized::defaults(
            ServerConfig::default(),
        ));

        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        let mut config: ServerConfig = figment
            .extract()
            .context("failed to parse server configuration")?;

        // CLI flags win over the file, but only the ones the user actually
        // passed -- every overridable field is an `Option` (or a flag that
        // only ever turns a setting on) precisely so an unset flag doesn't
        // shadow a value the config file set with clap's own default.
        if let Some(port) = args.port {
            config.port = port;
        }
        if args.all {
            config.bind_all = true;
        }
        if let Some(database) = &args.database {
            config.database = database.clone();
        }
        if let Some(snapshot) = &args.snapshot {
            config.snapshot = snapshot.clone();
        }
        if args.api_key.is_some() {
            config.api_key_file = args.api_key.clone();
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> SocketAddr {
        let ip = if self.bind_all {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        };
        SocketAddr::new(ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_to_loopback() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn bind_all_uses_unspecified_address() {
        let mut config = ServerConfig::default();
        config.bind_all = true;
        assert_eq!(
            config.bind_address().ip(),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
    }
}
