use serde::{Deserialize, Serialize};

use crate::types::Account;

#[derive(Debug, Deserialize, Serialize)]
pub struct WaveRequest {
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WaveResponse {
    pub tx_hash: String,
    pub total: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ConnectResponse {
    pub account: Account,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshResponse {
    pub loaded: usize,
    pub total: u64,
}
