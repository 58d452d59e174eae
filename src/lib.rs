//! Wave Portal: a wallet-connected client for the WavePortal contract
//!
//! This crate lets a user connect a wallet, send short messages ("waves")
//! to a deployed WavePortal contract, and follow the list of waves as new
//! ones are mined. All authoritative state lives in the contract; the
//! crate owns only the session that mirrors it.
//!
//! # Architecture
//!
//! - **Wallet bridge**: EIP-1193 style request interface to the wallet
//! - **Contract handle**: typed `getAllWaves`, `getTotalWaves` and `wave` calls
//! - **Subscription**: live `NewWave` events delivered over a channel
//! - **Session**: owned account, wave list, total and submission state
//! - **HTTP surface**: the portal page and a JSON API served with axum
//!
//! # Example
//!
//! ```ignore
//! use wave_portal::{PortalConfig, WaveSession};
//!
//! let config = PortalConfig::from_env()?;
//! let mut session = WaveSession::from_config(&config);
//! session.initialize().await;
//!
//! let mut live = session.subscribe_new_waves().await?;
//! session.connect().await?;
//! session.submit_wave("gm").await?;
//!
//! while let Some(wave) = live.next().await {
//!     session.record_new_wave(wave);
//! }
//! ```

// Public modules
pub mod abi;
pub mod api;
pub mod bridge;
pub mod config;
pub mod contract;
pub mod error;
pub mod session;
pub mod subscription;
pub mod types;
pub mod view;

// Re-exports for convenience
pub use bridge::{detect_bridge, HttpBridge, WalletBridge};
pub use config::{ContractSettings, PortalConfig};
pub use contract::{PendingWave, WavePortalContract};
pub use error::WavePortalError;
pub use session::{SessionEvent, SessionEventReceiver, WaveReceipt, WaveSession};
pub use subscription::WaveSubscription;
pub use types::{Account, Address, Notice, SubmissionState, WaveRecord};
pub use view::PortalView;

// Common result type
pub type Result<T> = std::result::Result<T, WavePortalError>;
