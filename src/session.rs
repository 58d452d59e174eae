//! Wave session: the state one user sees while using the portal
//!
//! [`WaveSession`] owns the connected account, the wave list, the total
//! count, and the state of the in-flight submission. Every mutation is
//! published as a [`SessionEvent`] to observers registered with
//! [`WaveSession::observe`], which is how UI surfaces stay in sync without
//! borrowing the session.
//!
//! # Example
//!
//! ```rust,no_run
//! # use wave_portal::{PortalConfig, WaveSession};
//! # async fn example() -> wave_portal::Result<()> {
//! let config = PortalConfig::from_env()?;
//! let mut session = WaveSession::from_config(&config);
//! session.initialize().await;
//!
//! session.connect().await?;
//! let receipt = session.submit_wave("hello").await?;
//! println!("{} waves so far", receipt.total);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::bridge::{detect_bridge, WalletBridge};
use crate::config::{ContractSettings, PortalConfig};
use crate::contract::WavePortalContract;
use crate::error::WavePortalError;
use crate::subscription::WaveSubscription;
use crate::types::{Account, Notice, SubmissionState, WaveRecord};
use crate::Result;

/// State change published by a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    AccountChanged(Account),
    /// The wave list was reloaded from the contract
    WavesReplaced { waves: Vec<WaveRecord>, total: u64 },
    /// A live notification added one wave
    WaveAppended(WaveRecord),
    TotalRefreshed(u64),
    SubmissionChanged(SubmissionState),
    NoticeChanged(Option<Notice>),
}

pub type SessionEventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Outcome of a confirmed wave
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaveReceipt {
    pub tx_hash: String,
    /// Total wave count read after confirmation
    pub total: u64,
}

pub struct WaveSession {
    bridge: Option<Arc<dyn WalletBridge>>,
    settings: ContractSettings,
    account: Option<Account>,
    waves: Vec<WaveRecord>,
    total: u64,
    submission: SubmissionState,
    notice: Option<Notice>,
    observers: Vec<mpsc::UnboundedSender<SessionEvent>>,
}

impl WaveSession {
    /// Create a session; `bridge` is `None` when no wallet is available
    pub fn new(bridge: Option<Arc<dyn WalletBridge>>, settings: ContractSettings) -> Self {
        Self {
            bridge,
            settings,
            account: None,
            waves: Vec::new(),
            total: 0,
            submission: SubmissionState::Idle,
            notice: None,
            observers: Vec::new(),
        }
    }

    /// Create a session using the bridge detected from configuration
    pub fn from_config(config: &PortalConfig) -> Self {
        Self::new(detect_bridge(config), config.contract.clone())
    }

    pub fn has_bridge(&self) -> bool {
        self.bridge.is_some()
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn waves(&self) -> &[WaveRecord] {
        &self.waves
    }

    /// Total count observed at the last refresh
    pub fn total_waves(&self) -> u64 {
        self.total
    }

    pub fn submission(&self) -> SubmissionState {
        self.submission
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notice
    }

    /// Register an observer for every subsequent state change
    pub fn observe(&mut self) -> SessionEventReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.observers.push(sender);
        receiver
    }

    /// Startup sequence: restore a pre-authorized account, then load waves
    pub async fn initialize(&mut self) {
        self.restore_session().await;
        if let Err(e) = self.load_waves().await {
            log::warn!("Initial wave load failed: {}", e);
        }
    }

    /// Ask the wallet to authorize an account
    pub async fn connect(&mut self) -> Result<Account> {
        let Some(bridge) = self.bridge.clone() else {
            log::warn!("⚠️  Get a wallet! No wallet bridge available");
            self.set_notice(Some(Notice::InstallWallet));
            return Err(WavePortalError::NoWalletInstalled);
        };

        let accounts = match bridge.request_accounts().await {
            Ok(accounts) => accounts,
            Err(e) if e.is_user_rejection() => {
                log::info!("Wallet authorization rejected");
                return Err(WavePortalError::UserRejected);
            }
            Err(e) => {
                log::warn!("Wallet authorization failed: {}", e);
                return Err(e);
            }
        };

        let account = accounts
            .into_iter()
            .next()
            .map(Account::new)
            .ok_or(WavePortalError::UserRejected)?;

        log::info!("✅ Connected {}", account);
        self.set_account(account.clone());
        Ok(account)
    }

    /// Adopt an already-authorized account without prompting
    ///
    /// Failures are logged and leave the session unchanged.
    pub async fn restore_session(&mut self) -> Option<Account> {
        let Some(bridge) = self.bridge.clone() else {
            log::warn!("Make sure you have a wallet! No wallet bridge available");
            return None;
        };
        log::debug!("Wallet bridge present: {}", bridge.name());

        match bridge.accounts().await {
            Ok(accounts) => match accounts.into_iter().next() {
                Some(id) => {
                    let account = Account::new(id);
                    log::info!("Found an authorized account: {}", account);
                    self.set_account(account.clone());
                    Some(account)
                }
                None => {
                    log::info!("No authorized account found");
                    None
                }
            },
            Err(e) => {
                log::warn!("Checking authorized accounts failed: {}", e);
                None
            }
        }
    }

    /// Replace the wave list and total with the contract's current state
    ///
    /// Returns the number of waves loaded.
    pub async fn load_waves(&mut self) -> Result<usize> {
        let contract = self.contract()?;

        let waves = contract
            .get_all_waves()
            .await
            .map_err(WavePortalError::into_remote_call)?;
        let total = contract
            .get_total_waves()
            .await
            .map_err(WavePortalError::into_remote_call)?;

        log::info!("Loaded {} waves (total {})", waves.len(), total);
        let count = waves.len();
        self.waves = waves.clone();
        self.total = total;
        self.emit(SessionEvent::WavesReplaced { waves, total });
        Ok(count)
    }

    /// Start listening for `NewWave` events
    ///
    /// Feed each received wave back with [`WaveSession::record_new_wave`].
    /// The subscription stops when the handle is closed or dropped.
    pub async fn subscribe_new_waves(&self) -> Result<WaveSubscription> {
        let bridge = self
            .bridge
            .clone()
            .ok_or(WavePortalError::NetworkUnavailable)?;
        WaveSubscription::install(bridge, &self.settings).await
    }

    /// Append one wave delivered by a live notification
    ///
    /// Waves already present from a reload are not deduplicated.
    pub fn record_new_wave(&mut self, wave: WaveRecord) {
        self.waves.push(wave.clone());
        self.emit(SessionEvent::WaveAppended(wave));
    }

    /// Send a wave and wait for it to be mined
    ///
    /// The message is trimmed; an empty message raises
    /// [`Notice::EnterValidMessage`] and never reaches the contract. On
    /// success the total is refreshed and the wave list reloaded. The
    /// submission state always returns to `Idle` once the call settles.
    pub async fn submit_wave(&mut self, message: &str) -> Result<WaveReceipt> {
        let message = message.trim();
        if message.is_empty() {
            log::info!("Empty wave rejected");
            self.set_notice(Some(Notice::EnterValidMessage));
            return Err(WavePortalError::EmptyMessage);
        }
        self.set_notice(None);

        let contract = self.contract()?;
        if self.account.is_none() {
            return Err(WavePortalError::NotConnected);
        }

        self.set_submission(SubmissionState::Pending);
        let outcome = send_wave(&contract, message).await.map_err(|e| {
            if e.is_user_rejection() {
                WavePortalError::UserRejected
            } else {
                e
            }
        });

        match &outcome {
            Ok(receipt) => {
                self.total = receipt.total;
                self.emit(SessionEvent::TotalRefreshed(receipt.total));
                self.set_submission(SubmissionState::Succeeded);
                if let Err(e) = self.load_waves().await {
                    log::warn!("Reloading waves after submission failed: {}", e);
                }
            }
            Err(e) => {
                log::warn!("Wave submission failed: {}", e);
                self.set_submission(SubmissionState::Failed);
            }
        }

        self.set_submission(SubmissionState::Idle);
        outcome
    }

    fn contract(&self) -> Result<WavePortalContract> {
        let bridge = self
            .bridge
            .clone()
            .ok_or(WavePortalError::NetworkUnavailable)?;
        Ok(WavePortalContract::new(bridge, self.settings.clone())
            .with_account(self.account.clone()))
    }

    fn set_account(&mut self, account: Account) {
        self.account = Some(account.clone());
        self.emit(SessionEvent::AccountChanged(account));
    }

    fn set_submission(&mut self, state: SubmissionState) {
        self.submission = state;
        self.emit(SessionEvent::SubmissionChanged(state));
    }

    fn set_notice(&mut self, notice: Option<Notice>) {
        if self.notice != notice {
            self.notice = notice;
            self.emit(SessionEvent::NoticeChanged(notice));
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        self.observers
            .retain(|observer| observer.send(event.clone()).is_ok());
    }
}

async fn send_wave(contract: &WavePortalContract, message: &str) -> Result<WaveReceipt> {
    let count = contract.get_total_waves().await?;
    log::info!("Retrieved total wave count... {}", count);

    let pending = contract.wave(message).await?;
    log::info!("⛏️  Mining... {}", pending.tx_hash);

    contract.wait(&pending).await?;
    log::info!("✅ Mined -- {}", pending.tx_hash);

    let total = contract.get_total_waves().await?;
    log::info!("Retrieved total wave count... {}", total);

    Ok(WaveReceipt {
        tx_hash: pending.tx_hash,
        total,
    })
}
