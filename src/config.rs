/// Portal configuration from environment variables
///
/// Controls which wallet bridge is used, which WavePortal contract is
/// addressed, and how transactions and live notifications are polled.

use std::env;
use std::time::Duration;

use crate::error::WavePortalError;
use crate::types::Address;
use crate::Result;

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x2362401Ed1DE68d3164916ACE827229eB1aC35D1";
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_CONFIRMATION_ATTEMPTS: u32 = 150;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Contract-facing settings shared by the session and its subscriptions
#[derive(Clone, Debug)]
pub struct ContractSettings {
    /// Deployed WavePortal contract
    pub address: Address,
    /// Gas limit hint attached to every `wave` transaction
    pub gas_limit: u64,
    /// Interval between receipt and filter polls
    pub poll_interval: Duration,
    /// Receipt polls before a submission is reported unconfirmed
    pub confirmation_attempts: u32,
}

impl Default for ContractSettings {
    fn default() -> Self {
        Self {
            address: Address([
                0x23, 0x62, 0x40, 0x1e, 0xd1, 0xde, 0x68, 0xd3, 0x16, 0x49, 0x16, 0xac, 0xe8,
                0x27, 0x22, 0x9e, 0xb1, 0xac, 0x35, 0xd1,
            ]),
            gas_limit: DEFAULT_GAS_LIMIT,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            confirmation_attempts: DEFAULT_CONFIRMATION_ATTEMPTS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PortalConfig {
    /// JSON-RPC endpoint of the wallet bridge; `None` means no wallet
    pub rpc_url: Option<String>,
    pub contract: ContractSettings,
    /// Listen address of the HTTP surface
    pub bind_address: String,
    /// CORS origins; empty allows any origin
    pub allowed_origins: Vec<String>,
}

impl PortalConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `WAVE_PORTAL_RPC_URL`: wallet bridge endpoint (unset: no wallet)
    /// - `WAVE_PORTAL_CONTRACT`: contract address
    /// - `WAVE_PORTAL_GAS_LIMIT`: gas limit hint for `wave`
    /// - `WAVE_PORTAL_POLL_INTERVAL_MS`: receipt/filter poll interval
    /// - `WAVE_PORTAL_CONFIRMATION_ATTEMPTS`: receipt polls before giving up
    /// - `BIND_ADDRESS`: HTTP listen address
    /// - `ALLOWED_ORIGINS`: comma-separated CORS origins
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Local anvil node with the contract deployed
    /// WAVE_PORTAL_RPC_URL=http://localhost:8545 \
    /// WAVE_PORTAL_CONTRACT=0x5FbDB2315678afecb367f032d93F642f64180aa3 cargo run
    /// ```
    pub fn from_env() -> Result<Self> {
        let rpc_url = env::var("WAVE_PORTAL_RPC_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let address = env::var("WAVE_PORTAL_CONTRACT")
            .unwrap_or_else(|_| DEFAULT_CONTRACT_ADDRESS.to_string())
            .parse()?;
        log::info!("📜 WavePortal contract: {}", address);

        let gas_limit = parse_var("WAVE_PORTAL_GAS_LIMIT", DEFAULT_GAS_LIMIT)?;
        let poll_ms = at_least_one(
            "WAVE_PORTAL_POLL_INTERVAL_MS",
            parse_var("WAVE_PORTAL_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
        )?;
        let confirmation_attempts = at_least_one(
            "WAVE_PORTAL_CONFIRMATION_ATTEMPTS",
            parse_var(
                "WAVE_PORTAL_CONFIRMATION_ATTEMPTS",
                DEFAULT_CONFIRMATION_ATTEMPTS,
            )?,
        )?;

        let bind_address =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|origins| split_origins(&origins))
            .unwrap_or_default();

        Ok(Self {
            rpc_url,
            contract: ContractSettings {
                address,
                gas_limit,
                poll_interval: Duration::from_millis(poll_ms),
                confirmation_attempts,
            },
            bind_address,
            allowed_origins,
        })
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            contract: ContractSettings::default(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WavePortalError::Config(format!("invalid {}: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

/// Zero would make the receipt and filter loops spin
fn at_least_one<T: PartialEq + Default>(name: &str, value: T) -> Result<T> {
    if value == T::default() {
        return Err(WavePortalError::Config(format!("{} must be at least 1", name)));
    }
    Ok(value)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
