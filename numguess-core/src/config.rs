use crate::error::{LotteryError, Result};
use crate::types::{Address, Wei};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Address of the deployed lottery contract.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xcad3fcd3eff63f44384f4ee79256b028eabffe46";

/// Stake sent with every play, in ether.
pub const DEFAULT_PLAY_COST: &str = "0.001";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    /// JSON-RPC endpoint of the wallet provider. `None` means no provider.
    pub rpc_url: Option<String>,
    pub contract_address: Address,
    pub play_cost: Wei,
    pub confirmation_timeout: Duration,
    pub event_timeout: Duration,
    pub poll_interval: Duration,
    pub animation_interval: Duration,
    pub animate: bool,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            contract_address: DEFAULT_CONTRACT_ADDRESS
                .parse()
                .unwrap_or(Address::ZERO),
            play_cost: Wei::from_wei(1_000_000_000_000_000),
            confirmation_timeout: Duration::from_secs(300),
            event_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
            animation_interval: Duration::from_millis(42),
            animate: true,
        }
    }
}

impl LotteryConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: Some(rpc_url.into()),
            ..Self::default()
        }
    }

    pub fn with_contract(mut self, address: Address) -> Self {
        self.contract_address = address;
        self
    }

    pub fn with_play_cost(mut self, cost: Wei) -> Self {
        self.play_cost = cost;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.rpc_url {
            if url.is_empty() {
                return Err(LotteryError::config("RPC URL cannot be empty"));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(LotteryError::config(format!(
                    "RPC URL must be http(s): {}",
                    url
                )));
            }
        }

        if self.contract_address == Address::ZERO {
            return Err(LotteryError::config("Contract address cannot be zero"));
        }

        if self.play_cost == Wei::ZERO {
            return Err(LotteryError::config("Play cost must be greater than 0"));
        }

        if self.poll_interval.is_zero() || self.animation_interval.is_zero() {
            return Err(LotteryError::config("Intervals must be greater than 0"));
        }

        Ok(())
    }
}
