//! Typed handle on the deployed WavePortal contract
//!
//! The handle is cheap to build: it borrows nothing but an `Arc` to the
//! bridge, so callers construct one per operation.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::abi;
use crate::bridge::WalletBridge;
use crate::config::ContractSettings;
use crate::error::WavePortalError;
use crate::types::{Account, Address, WaveRecord};
use crate::Result;

/// Subset of a transaction receipt the portal needs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

/// A `wave` transaction accepted by the wallet but not yet confirmed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingWave {
    pub tx_hash: String,
}

pub struct WavePortalContract {
    bridge: Arc<dyn WalletBridge>,
    settings: ContractSettings,
    /// Sender for calls and transactions
    from: Option<Account>,
}

impl WavePortalContract {
    pub fn new(bridge: Arc<dyn WalletBridge>, settings: ContractSettings) -> Self {
        Self {
            bridge,
            settings,
            from: None,
        }
    }

    /// Attach the account used as `from`
    pub fn with_account(mut self, account: Option<Account>) -> Self {
        self.from = account;
        self
    }

    pub fn address(&self) -> Address {
        self.settings.address
    }

    /// Read every wave ever recorded, in contract order
    pub async fn get_all_waves(&self) -> Result<Vec<WaveRecord>> {
        let data = self.call(abi::encode_get_all_waves()).await?;
        abi::decode_wave_list(&data)
    }

    pub async fn get_total_waves(&self) -> Result<u64> {
        let data = self.call(abi::encode_get_total_waves()).await?;
        abi::decode_uint(&data)
    }

    /// Submit `wave(message)` with the configured gas limit hint
    pub async fn wave(&self, message: &str) -> Result<PendingWave> {
        let from = self.from.as_ref().ok_or(WavePortalError::NotConnected)?;

        let tx = json!({
            "from": from.as_str(),
            "to": self.settings.address.to_hex(),
            "data": abi::to_hex_data(&abi::encode_wave(message)),
            "gas": abi::to_quantity(self.settings.gas_limit),
        });

        let result = self
            .bridge
            .request("eth_sendTransaction", json!([tx]))
            .await?;
        let tx_hash = result
            .as_str()
            .ok_or_else(|| {
                WavePortalError::remote_call(format!(
                    "eth_sendTransaction returned non-string: {}",
                    result
                ))
            })?
            .to_string();

        Ok(PendingWave { tx_hash })
    }

    /// Wait for the transaction to be mined
    ///
    /// Polls for the receipt at the configured interval. A receipt with
    /// status `0x0` is reported as [`WavePortalError::Reverted`].
    pub async fn wait(&self, pending: &PendingWave) -> Result<()> {
        let attempts = self.settings.confirmation_attempts;
        for attempt in 1..=attempts {
            let value = self
                .bridge
                .request("eth_getTransactionReceipt", json!([pending.tx_hash]))
                .await?;

            if !value.is_null() {
                let receipt: Receipt = serde_json::from_value(value)?;
                if receipt.status.as_deref() == Some("0x0") {
                    return Err(WavePortalError::Reverted {
                        tx_hash: pending.tx_hash.clone(),
                    });
                }
                log::debug!(
                    "Receipt for {} in block {}",
                    pending.tx_hash,
                    receipt.block_number.as_deref().unwrap_or("?")
                );
                return Ok(());
            }

            log::debug!(
                "Receipt for {} not available (attempt {}/{})",
                pending.tx_hash,
                attempt,
                attempts
            );
            if attempt < attempts {
                tokio::time::sleep(self.settings.poll_interval).await;
            }
        }

        Err(WavePortalError::NotConfirmed {
            tx_hash: pending.tx_hash.clone(),
            attempts,
        })
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let mut call = json!({
            "to": self.settings.address.to_hex(),
            "data": abi::to_hex_data(&data),
        });
        if let Some(from) = &self.from {
            call["from"] = Value::String(from.as_str().to_string());
        }

        let result = self.bridge.request("eth_call", json!([call, "latest"])).await?;
        let hex = result.as_str().ok_or_else(|| {
            WavePortalError::remote_call(format!("eth_call returned non-string: {}", result))
        })?;
        abi::from_hex_data(hex)
    }
}
