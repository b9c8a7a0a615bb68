//! Wallet view configuration
//!
//! Layers, later wins: built-in defaults, an optional TOML file, then
//! `WALLET_VIEW_*` environment variables (`WALLET_VIEW_ELECTRUM_URI`,
//! `WALLET_VIEW_DESCRIPTOR`, `WALLET_VIEW_NETWORK`).

use crate::constants::*;
use crate::descriptor::Expander;
use crate::endpoint::{parse_endpoint, ElectrumEndpoint};
use crate::error::{Result, WalletError};
use crate::session::WalletSession;
use crate::types::Network;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub electrum_uri: String,
    pub descriptor: String,
    pub network: Network,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            electrum_uri: DEFAULT_ELECTRUM_URI.to_string(),
            descriptor: DEFAULT_DESCRIPTOR.to_string(),
            network: Network::Bitcoin,
        }
    }
}

impl WalletConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::build(path).map_err(|e| WalletError::Config(e.to_string()))?;
        debug!(?config, "loaded configuration");
        Ok(config)
    }

    fn build(path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("electrum_uri", DEFAULT_ELECTRUM_URI)?
            .set_default("descriptor", DEFAULT_DESCRIPTOR)?
            .set_default("network", "bitcoin")?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }

    /// The configured endpoint, rejected here if malformed
    pub fn endpoint(&self) -> Result<ElectrumEndpoint> {
        Ok(parse_endpoint(&self.electrum_uri)?)
    }

    pub fn expander(&self) -> Expander {
        Expander::new(self.network)
    }

    /// A disconnected session for the configured descriptor
    pub fn session(&self) -> WalletSession {
        WalletSession::new(&self.descriptor, &self.expander())
    }
}
