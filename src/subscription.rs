//! Live `NewWave` notifications
//!
//! A subscription installs a log filter on the bridge and polls it from a
//! background task. Decoded waves are delivered over a channel held by the
//! returned [`WaveSubscription`]; dropping or closing the handle stops the
//! task.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::abi;
use crate::bridge::WalletBridge;
use crate::config::ContractSettings;
use crate::error::WavePortalError;
use crate::types::WaveRecord;
use crate::Result;

#[derive(Debug, Deserialize)]
struct FilterLog {
    topics: Vec<String>,
    data: String,
    /// Set by the node when a reorg drops the log
    #[serde(default)]
    removed: bool,
}

pub struct WaveSubscription {
    bridge: Arc<dyn WalletBridge>,
    filter_id: String,
    receiver: mpsc::UnboundedReceiver<WaveRecord>,
    task: Option<JoinHandle<()>>,
}

impl WaveSubscription {
    /// Install a `NewWave` filter for the configured contract and start polling
    pub async fn install(
        bridge: Arc<dyn WalletBridge>,
        settings: &ContractSettings,
    ) -> Result<Self> {
        let filter = json!({
            "address": settings.address.to_hex(),
            "topics": [abi::to_hex_data(&abi::event_topic(abi::NEW_WAVE_EVENT))],
        });

        let result = bridge.request("eth_newFilter", json!([filter])).await?;
        let filter_id = result
            .as_str()
            .ok_or_else(|| {
                WavePortalError::remote_call(format!("eth_newFilter returned {}", result))
            })?
            .to_string();
        log::info!("👂 Listening for NewWave events (filter {})", filter_id);

        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(poll_filter(
            bridge.clone(),
            filter_id.clone(),
            settings.poll_interval,
            sender,
        ));

        Ok(Self {
            bridge,
            filter_id,
            receiver,
            task: Some(task),
        })
    }

    pub fn filter_id(&self) -> &str {
        &self.filter_id
    }

    /// Next wave, waiting until one arrives
    ///
    /// Returns `None` once the subscription has stopped and every delivered
    /// wave has been consumed.
    pub async fn next(&mut self) -> Option<WaveRecord> {
        self.receiver.recv().await
    }

    /// Next already-delivered wave, without waiting
    pub fn try_next(&mut self) -> Option<WaveRecord> {
        self.receiver.try_recv().ok()
    }

    /// Stop polling and uninstall the filter
    pub async fn close(mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let removed = self
            .bridge
            .request("eth_uninstallFilter", json!([self.filter_id]))
            .await?;
        log::info!(
            "🔇 NewWave filter {} uninstalled ({})",
            self.filter_id,
            removed
        );
        Ok(())
    }
}

impl Drop for WaveSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn poll_filter(
    bridge: Arc<dyn WalletBridge>,
    filter_id: String,
    interval: Duration,
    sender: mpsc::UnboundedSender<WaveRecord>,
) {
    loop {
        match bridge
            .request("eth_getFilterChanges", json!([filter_id]))
            .await
        {
            Ok(Value::Array(entries)) => {
                for entry in entries {
                    let Some(wave) = decode_entry(entry) else {
                        continue;
                    };
                    log::info!("🌊 New wave from {}", wave.sender);
                    if sender.send(wave).is_err() {
                        log::debug!("Subscription receiver dropped, stopping filter poll");
                        return;
                    }
                }
            }
            Ok(other) => {
                log::warn!("Unexpected eth_getFilterChanges result: {}", other);
            }
            Err(e) => {
                log::warn!("Polling NewWave filter {} failed: {}", filter_id, e);
            }
        }

        if sender.is_closed() {
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

fn decode_entry(entry: Value) -> Option<WaveRecord> {
    let log_entry: FilterLog = match serde_json::from_value(entry) {
        Ok(log_entry) => log_entry,
        Err(e) => {
            log::warn!("Skipping malformed filter entry: {}", e);
            return None;
        }
    };
    if log_entry.removed {
        log::debug!("Skipping NewWave log removed by reorg");
        return None;
    }

    let decoded = log_entry
        .topics
        .iter()
        .map(|topic| abi::parse_word(topic))
        .collect::<Result<Vec<_>>>()
        .and_then(|topics| {
            let data = abi::from_hex_data(&log_entry.data)?;
            abi::decode_new_wave_log(&topics, &data)
        });

    match decoded {
        Ok(wave) => Some(wave),
        Err(e) => {
            log::warn!("Skipping undecodable NewWave log: {}", e);
            None
        }
    }
}
