//! Error types for WavePortal operations
//!
//! Covers wallet detection and authorization, JSON-RPC failures reported
//! by the bridge, contract call decoding, and submission validation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// EIP-1193 code returned by wallets when the user declines a request
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC "method not found"
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum WavePortalError {
    /// No wallet bridge is available in this environment
    #[error("No wallet installed: configure WAVE_PORTAL_RPC_URL to use a wallet")]
    NoWalletInstalled,

    /// The wallet declined the authorization request
    #[error("User rejected the request")]
    UserRejected,

    /// A contract call was attempted without a wallet bridge
    #[error("Network unavailable: no wallet bridge to reach the contract")]
    NetworkUnavailable,

    /// Transport or decoding failure while talking to the contract
    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    /// JSON-RPC error object returned by the bridge
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Submitted message was empty after trimming
    #[error("Enter a valid message")]
    EmptyMessage,

    /// Submission attempted before an account was connected
    #[error("No connected account")]
    NotConnected,

    /// Transaction was mined but reverted
    #[error("Transaction reverted: {tx_hash}")]
    Reverted { tx_hash: String },

    /// Transaction receipt never appeared
    #[error("Transaction {tx_hash} not confirmed after {attempts} attempts")]
    NotConfirmed { tx_hash: String, attempts: u32 },

    /// Malformed ABI payload
    #[error("ABI error: {0}")]
    Abi(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WavePortalError {
    pub fn remote_call(msg: impl Into<String>) -> Self {
        Self::RemoteCall(msg.into())
    }

    pub fn abi(msg: impl Into<String>) -> Self {
        Self::Abi(msg.into())
    }

    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
        }
    }

    /// Fold bridge and decoding failures of a contract read into `RemoteCall`
    pub fn into_remote_call(self) -> Self {
        match self {
            Self::Rpc { code, message } => {
                Self::RemoteCall(format!("RPC error {}: {}", code, message))
            }
            Self::Abi(msg) => Self::RemoteCall(format!("undecodable response: {}", msg)),
            other => other,
        }
    }

    /// True when the bridge reported an EIP-1193 user rejection
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected)
            || matches!(self, Self::Rpc { code, .. } if *code == USER_REJECTED_CODE)
    }
}

impl From<reqwest::Error> for WavePortalError {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteCall(err.to_string())
    }
}

impl From<serde_json::Error> for WavePortalError {
    fn from(err: serde_json::Error) -> Self {
        Self::RemoteCall(format!("invalid JSON: {}", err))
    }
}

impl IntoResponse for WavePortalError {
    fn into_response(self) -> Response {
        let status = match self {
            WavePortalError::EmptyMessage | WavePortalError::NotConnected => {
                StatusCode::BAD_REQUEST
            }
            WavePortalError::UserRejected => StatusCode::FORBIDDEN,
            WavePortalError::NoWalletInstalled | WavePortalError::NetworkUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            WavePortalError::Rpc { .. }
            | WavePortalError::RemoteCall(_)
            | WavePortalError::Reverted { .. }
            | WavePortalError::NotConfirmed { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
