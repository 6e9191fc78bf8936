//! Bridge configuration: deployed addresses, endpoints, and confirmation tuning.

use std::fs;
use std::path::Path;
use std::time::Duration;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::{
    balance::BalanceKey,
    confirm::{BackoffPolicy, PollConfig},
    error::{Error, ErrorCode, Result},
};

pub const DEFAULT_API_URL: &str = "https://api.pusdc.xyz";
pub const DEFAULT_RPC_URL: &str = "https://mainnet.base.org/";
/// Base mainnet.
pub const DEFAULT_CHAIN_ID: u64 = 8453;
pub const DEFAULT_USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const DEFAULT_POOL: Address = address!("9c2f26F7Da88A8B9b0C35332510AB3763C73BD61");
pub const DEFAULT_INBOX: Address = address!("5F40E750B1c5dCe3c55942e35DA0D4Ec83cBd80D");

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub factor: f64,
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            initial_ms: policy.initial.as_millis() as u64,
            factor: policy.factor,
            max_ms: policy.max.as_millis() as u64,
        }
    }
}

impl From<&BackoffConfig> for BackoffPolicy {
    fn from(config: &BackoffConfig) -> Self {
        BackoffPolicy {
            initial: Duration::from_millis(config.initial_ms),
            factor: config.factor,
            max: Duration::from_millis(config.max_ms),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub api_url: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub usdc: Address,
    pub pool: Address,
    pub inbox: Address,
    pub confirmation_timeout_secs: u64,
    pub backoff: BackoffConfig,
    pub http_timeout_secs: u64,
    pub receipt_poll_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            usdc: DEFAULT_USDC,
            pool: DEFAULT_POOL,
            inbox: DEFAULT_INBOX,
            confirmation_timeout_secs: 300,
            backoff: BackoffConfig::default(),
            http_timeout_secs: 20,
            receipt_poll_ms: 2_000,
        }
    }
}

impl BridgeConfig {
    /// Reads a JSON file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorCode::Config, format!("{}: {err}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| {
            Error::new(ErrorCode::Config, format!("{}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("api_url", &self.api_url), ("rpc_url", &self.rpc_url)] {
            reqwest::Url::parse(url)
                .map_err(|err| Error::new(ErrorCode::Config, format!("{name} {url}: {err}")))?;
        }
        if self.confirmation_timeout_secs == 0 {
            return Err(Error::new(
                ErrorCode::Config,
                "confirmation_timeout_secs must be positive",
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(Error::new(ErrorCode::Config, "http_timeout_secs must be positive"));
        }
        let backoff = &self.backoff;
        if backoff.initial_ms == 0 || backoff.max_ms < backoff.initial_ms {
            return Err(Error::new(
                ErrorCode::Config,
                format!(
                    "backoff needs 0 < initial_ms <= max_ms (got {} / {})",
                    backoff.initial_ms, backoff.max_ms
                ),
            ));
        }
        if !backoff.factor.is_finite() || backoff.factor < 1.0 {
            return Err(Error::new(
                ErrorCode::Config,
                format!("backoff factor must be >= 1.0 (got {})", backoff.factor),
            ));
        }
        Ok(())
    }

    pub fn poll_config(&self, key: BalanceKey) -> PollConfig {
        PollConfig {
            timeout: Duration::from_secs(self.confirmation_timeout_secs),
            key,
            backoff: BackoffPolicy::from(&self.backoff),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }
}
