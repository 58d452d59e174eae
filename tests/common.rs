#![allow(dead_code)]

/// Common test utilities for Wave Portal integration tests
///
/// This module provides shared test infrastructure including:
/// - An in-memory WavePortal node speaking the wallet bridge's JSON-RPC
/// - Knobs to simulate rejections, reverts, slow mining and read failures
/// - Logging setup and session constructors with fast polling
use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wave_portal::abi;
use wave_portal::error::USER_REJECTED_CODE;
use wave_portal::{
    Address, ContractSettings, Result, WalletBridge, WavePortalError, WaveRecord, WaveSession,
};

pub const ALICE: &str = "0x00000000000000000000000000000000000a11ce";
pub const BOB: &str = "0x0000000000000000000000000000000000000b0b";

/// Initialize logging (only once, subsequent calls are no-ops)
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

pub fn fast_settings() -> ContractSettings {
    ContractSettings {
        poll_interval: Duration::from_millis(10),
        confirmation_attempts: 5,
        ..Default::default()
    }
}

pub fn wave(sender: &str, secs: i64, message: &str) -> WaveRecord {
    WaveRecord {
        sender: sender.parse().expect("valid test address"),
        sent_at: DateTime::from_timestamp(secs, 0).expect("valid timestamp"),
        message: message.to_string(),
    }
}

/// Sent transaction as observed by the node
#[derive(Clone, Debug)]
pub struct SentTransaction {
    pub from: String,
    pub to: String,
    pub gas: String,
    pub message: String,
}

#[derive(Default)]
pub struct NodeState {
    /// Accounts reported by `eth_accounts`
    pub authorized: Vec<String>,
    /// Accounts granted when `eth_requestAccounts` is approved
    pub wallet_accounts: Vec<String>,
    pub approve_requests: bool,
    pub waves: Vec<WaveRecord>,
    pub fail_reads: bool,
    pub revert_transactions: bool,
    pub reject_transactions: bool,
    /// Receipt polls answered with `null` before the receipt appears
    pub unmined_polls: u32,
    /// `eth_getFilterChanges` calls answered with an error
    pub failing_filter_polls: u32,
    pub receipts: HashMap<String, Value>,
    pub filters: HashMap<String, Vec<Value>>,
    pub sent: Vec<SentTransaction>,
    pub calls: Vec<String>,
    pub clock: i64,
    next_id: u64,
}

/// In-memory WavePortal deployment behind a wallet bridge
pub struct MockNode {
    pub contract: Address,
    state: Mutex<NodeState>,
}

impl MockNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            contract: ContractSettings::default().address,
            state: Mutex::new(NodeState {
                wallet_accounts: vec![ALICE.to_string()],
                approve_requests: true,
                clock: 1_700_000_000,
                ..Default::default()
            }),
        })
    }

    pub fn with_waves(waves: Vec<WaveRecord>) -> Arc<Self> {
        let node = Self::new();
        node.state().waves = waves;
        node
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, NodeState> {
        self.state.lock().expect("node state poisoned")
    }

    pub fn session(self: &Arc<Self>) -> WaveSession {
        WaveSession::new(Some(self.clone() as Arc<dyn WalletBridge>), fast_settings())
    }

    pub fn calls_of(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|m| *m == method).count()
    }

    /// Another user waves; recorded and broadcast to installed filters
    pub fn external_wave(&self, sender: &str, message: &str) {
        let mut state = self.state();
        state.clock += 60;
        let record = wave(sender, state.clock, message);
        Self::record(&mut state, self.contract, record);
    }

    /// Queue a raw entry on every installed filter
    pub fn inject_filter_entry(&self, entry: Value) {
        for pending in self.state().filters.values_mut() {
            pending.push(entry.clone());
        }
    }

    /// A well-formed `NewWave` log entry for the given wave
    pub fn new_wave_entry(&self, record: &WaveRecord) -> Value {
        let (topics, data) = abi::encode_new_wave_log(record);
        json!({
            "address": self.contract.to_hex(),
            "topics": topics.iter().map(|t| abi::to_hex_data(t)).collect::<Vec<_>>(),
            "data": abi::to_hex_data(&data),
            "removed": false,
        })
    }

    fn record(state: &mut NodeState, contract: Address, record: WaveRecord) {
        let (topics, data) = abi::encode_new_wave_log(&record);
        let log_entry = json!({
            "address": contract.to_hex(),
            "topics": topics.iter().map(|t| abi::to_hex_data(t)).collect::<Vec<_>>(),
            "data": abi::to_hex_data(&data),
            "removed": false,
        });
        for pending in state.filters.values_mut() {
            pending.push(log_entry.clone());
        }
        state.waves.push(record);
    }

    fn next_hex(state: &mut NodeState, width: usize) -> String {
        state.next_id += 1;
        format!("0x{:0width$x}", state.next_id, width = width)
    }

    fn handle(&self, method: &str, params: &Value) -> Result<Value> {
        let mut state = self.state();
        state.calls.push(method.to_string());

        match method {
            "eth_accounts" => Ok(json!(state.authorized)),
            "eth_requestAccounts" => {
                if !state.approve_requests {
                    return Err(WavePortalError::rpc(
                        USER_REJECTED_CODE,
                        "User rejected the request.",
                    ));
                }
                state.authorized = state.wallet_accounts.clone();
                Ok(json!(state.authorized))
            }
            "eth_call" => {
                if state.fail_reads {
                    return Err(WavePortalError::rpc(-32000, "execution reverted"));
                }
                let data = abi::from_hex_data(params[0]["data"].as_str().unwrap_or_default())?;
                let output = if data == abi::encode_get_all_waves() {
                    abi::encode_wave_list(&state.waves)
                } else if data == abi::encode_get_total_waves() {
                    abi::encode_uint(state.waves.len() as u64)
                } else {
                    return Err(WavePortalError::rpc(-32000, "unknown selector"));
                };
                Ok(json!(abi::to_hex_data(&output)))
            }
            "eth_sendTransaction" => {
                if state.reject_transactions {
                    return Err(WavePortalError::rpc(
                        USER_REJECTED_CODE,
                        "User denied transaction signature.",
                    ));
                }
                let tx = &params[0];
                let data = abi::from_hex_data(tx["data"].as_str().unwrap_or_default())?;
                let message = abi::decode_wave_call(&data)?;
                let from = tx["from"].as_str().unwrap_or_default().to_string();
                state.sent.push(SentTransaction {
                    from: from.clone(),
                    to: tx["to"].as_str().unwrap_or_default().to_string(),
                    gas: tx["gas"].as_str().unwrap_or_default().to_string(),
                    message: message.clone(),
                });

                let tx_hash = Self::next_hex(&mut state, 64);
                let status = if state.revert_transactions {
                    "0x0"
                } else {
                    state.clock += 15;
                    let record = wave(&from, state.clock, &message);
                    Self::record(&mut state, self.contract, record);
                    "0x1"
                };
                let receipt = json!({
                    "transactionHash": tx_hash,
                    "blockNumber": "0x10",
                    "status": status,
                });
                state.receipts.insert(tx_hash.clone(), receipt);
                Ok(json!(tx_hash))
            }
            "eth_getTransactionReceipt" => {
                if state.unmined_polls > 0 {
                    state.unmined_polls -= 1;
                    return Ok(Value::Null);
                }
                let hash = params[0].as_str().unwrap_or_default();
                Ok(state.receipts.get(hash).cloned().unwrap_or(Value::Null))
            }
            "eth_newFilter" => {
                let id = Self::next_hex(&mut state, 1);
                state.filters.insert(id.clone(), Vec::new());
                Ok(json!(id))
            }
            "eth_getFilterChanges" => {
                if state.failing_filter_polls > 0 {
                    state.failing_filter_polls -= 1;
                    return Err(WavePortalError::rpc(-32000, "node temporarily unavailable"));
                }
                let id = params[0].as_str().unwrap_or_default();
                match state.filters.get_mut(id) {
                    Some(pending) => Ok(Value::Array(std::mem::take(pending))),
                    None => Err(WavePortalError::rpc(-32000, "filter not found")),
                }
            }
            "eth_uninstallFilter" => {
                let id = params[0].as_str().unwrap_or_default();
                Ok(json!(state.filters.remove(id).is_some()))
            }
            other => Err(WavePortalError::rpc(
                -32601,
                format!("the method {} does not exist", other),
            )),
        }
    }
}

#[async_trait]
impl WalletBridge for MockNode {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.handle(method, &params)
    }

    fn name(&self) -> &str {
        "mock-node"
    }
}
