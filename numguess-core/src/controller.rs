//! Lottery session controller.
//!
//! All display state lives in one [`ControllerState`] record. The record only
//! changes through its transition methods; the controller performs the I/O
//! and applies the matching transition afterwards.

use crate::animation::Animation;
use crate::config::LotteryConfig;
use crate::contract::ContractHandle;
use crate::error::{LotteryError, Result};
use crate::events::{EventBus, EventFilter, Subscription};
use crate::jackpot::{refresh_jackpot, Jackpot};
use crate::play::{self, validate_number, DrawResult, PlayOutcome};
use crate::provider::{JsonRpcProvider, WalletProvider};
use crate::session::Session;
use crate::types::{Address, TxHash, Wei};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Everything a front-end needs to render the lottery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerState {
    pub account: Option<Address>,
    pub message: String,
    pub jackpot: Option<Jackpot>,
    pub in_progress: bool,
    /// Token of the attempt that owns `in_progress`.
    pub pending_attempt: Option<Uuid>,
    pub result: Option<DrawResult>,
    /// Number currently shown: animated while pending, drawn number after.
    pub displayed_number: Option<u64>,
    pub last_tx: Option<TxHash>,
}

impl ControllerState {
    pub fn connected(&mut self, account: Address) {
        self.account = Some(account);
        self.message = "Wallet connected.".to_string();
    }

    /// Connection failures only touch the message.
    pub fn connect_failed(&mut self, error: &LotteryError) {
        self.message = error.user_message();
    }

    pub fn jackpot_refreshed(&mut self, jackpot: Jackpot) {
        self.jackpot = Some(jackpot);
    }

    pub fn query_failed(&mut self, error: &LotteryError) {
        self.message = error.user_message();
    }

    /// Idle -> Pending. Returns the token the later transitions must present.
    pub fn begin_play(&mut self) -> Result<Uuid> {
        if self.in_progress {
            return Err(LotteryError::PlayInProgress);
        }
        let token = Uuid::new_v4();
        self.in_progress = true;
        self.pending_attempt = Some(token);
        self.result = None;
        self.displayed_number = None;
        self.message = "Processing transaction...".to_string();
        Ok(token)
    }

    fn owns_pending(&self, token: Uuid) -> bool {
        self.in_progress && self.pending_attempt == Some(token)
    }

    /// Back to idle, unless a newer attempt has taken over since.
    fn release(&mut self, token: Uuid) -> bool {
        if !self.owns_pending(token) {
            return false;
        }
        self.in_progress = false;
        self.pending_attempt = None;
        true
    }

    /// Pending -> Resolved -> Idle. Ignored for a superseded attempt.
    pub fn play_resolved(&mut self, token: Uuid, outcome: &PlayOutcome) {
        if !self.release(token) {
            return;
        }
        self.last_tx = outcome.attempt.tx_hash;
        self.displayed_number = Some(outcome.result.contract_number);
        self.message = format!(
            "Your Number: {}, Contract Number: {}",
            outcome.result.player_number, outcome.result.contract_number
        );
        self.result = Some(outcome.result.clone());
    }

    /// Pending -> Failed -> Idle. Ignored for a superseded attempt.
    pub fn play_failed(&mut self, token: Uuid, error: &LotteryError) {
        if !self.release(token) {
            return;
        }
        self.displayed_number = None;
        self.message = error.user_message();
    }

    /// Play rejected before it started; only the message changes.
    pub fn play_refused(&mut self, error: &LotteryError) {
        self.message = error.user_message();
    }

    pub fn animation_tick(&mut self, token: Uuid, number: u64) {
        if self.owns_pending(token) {
            self.displayed_number = Some(number);
        }
    }

    pub fn outcome_message(&self) -> Option<&'static str> {
        self.result.as_ref().map(|r| r.outcome().message())
    }
}

/// Contract state beyond the jackpot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryInfo {
    pub contract: Address,
    pub play_cost: Wei,
    pub owner: Address,
    pub last_jackpot: DateTime<Utc>,
    pub jackpot: Jackpot,
    pub recent_players: Vec<Address>,
}

#[derive(Clone)]
struct Connection {
    session: Session,
    contract: ContractHandle,
    events: EventBus,
}

pub struct LotteryController {
    config: LotteryConfig,
    provider: Option<Arc<dyn WalletProvider>>,
    state: Arc<RwLock<ControllerState>>,
    connection: RwLock<Option<Connection>>,
}

impl LotteryController {
    pub fn new(config: LotteryConfig, provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            config,
            provider,
            state: Arc::new(RwLock::new(ControllerState::default())),
            connection: RwLock::new(None),
        }
    }

    /// Build a controller talking JSON-RPC to `config.rpc_url`. Without a URL
    /// the controller has no wallet provider.
    pub fn from_config(config: LotteryConfig) -> Result<Self> {
        config.validate()?;
        let provider: Option<Arc<dyn WalletProvider>> = match &config.rpc_url {
            Some(url) => Some(Arc::new(JsonRpcProvider::new(url.clone())?)),
            None => None,
        };
        Ok(Self::new(config, provider))
    }

    pub fn config(&self) -> &LotteryConfig {
        &self.config
    }

    /// Snapshot of the display state.
    pub fn state(&self) -> ControllerState {
        self.state.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    pub fn contract(&self) -> Option<ContractHandle> {
        self.connection.read().as_ref().map(|c| c.contract.clone())
    }

    pub fn session(&self) -> Option<Session> {
        self.connection.read().as_ref().map(|c| c.session.clone())
    }

    /// Live event subscriptions held by this controller.
    pub fn active_subscriptions(&self) -> usize {
        self.connection
            .read()
            .as_ref()
            .map_or(0, |c| c.events.active())
    }

    fn require_connection(&self) -> Result<Connection> {
        self.connection
            .read()
            .clone()
            .ok_or(LotteryError::NotConnected)
    }

    /// Connect the wallet and load the jackpot once.
    pub async fn connect(&self) -> Result<Address> {
        let (session, contract) = match Session::connect(self.provider.clone(), &self.config).await
        {
            Ok(connected) => connected,
            Err(e) => {
                tracing::warn!("Wallet connection failed: {}", e);
                self.state.write().connect_failed(&e);
                return Err(e);
            }
        };

        let account = session.account();
        let events = EventBus::new(
            session.provider().clone(),
            contract.address(),
            self.config.poll_interval,
        );
        let previous = self.connection.write().replace(Connection {
            session,
            contract,
            events,
        });
        if let Some(previous) = previous {
            previous.events.cancel_all();
        }
        self.state.write().connected(account);

        if let Err(e) = self.refresh_jackpot().await {
            tracing::warn!("Initial jackpot refresh failed: {}", e);
        }
        Ok(account)
    }

    pub async fn refresh_jackpot(&self) -> Result<Jackpot> {
        let connection = self.require_connection()?;
        match refresh_jackpot(&connection.contract).await {
            Ok(jackpot) => {
                self.state.write().jackpot_refreshed(jackpot.clone());
                Ok(jackpot)
            }
            Err(e) => {
                self.state.write().query_failed(&e);
                Err(e)
            }
        }
    }

    /// Play one round. At most one play runs at a time per controller.
    pub async fn play(&self, number: u64) -> Result<PlayOutcome> {
        let connection = match self.require_connection().and_then(|c| {
            validate_number(number)?;
            Ok(c)
        }) {
            Ok(connection) => connection,
            Err(e) => {
                self.state.write().play_refused(&e);
                return Err(e);
            }
        };
        let token = self.state.write().begin_play()?;

        let _pending = PendingGuard {
            state: self.state.clone(),
            token,
        };
        let _animation = self.config.animate.then(|| {
            let state = self.state.clone();
            Animation::start(self.config.animation_interval, move |n| {
                state.write().animation_tick(token, n)
            })
        });

        let result = play::play(&connection.contract, &connection.events, &self.config, number).await;
        match &result {
            Ok(outcome) => self.state.write().play_resolved(token, outcome),
            Err(e) => {
                tracing::warn!("Play failed: {}", e);
                self.state.write().play_failed(token, e);
            }
        }
        result
    }

    pub async fn info(&self, max_players: usize) -> Result<LotteryInfo> {
        let connection = self.require_connection()?;
        let contract = &connection.contract;

        let jackpot = self.refresh_jackpot().await?;
        let (play_cost, owner, last_jackpot, recent_players) = futures::try_join!(
            contract.play_cost(),
            contract.owner(),
            contract.last_jackpot_timestamp(),
            contract.recent_players(max_players),
        )?;
        Ok(LotteryInfo {
            contract: contract.address(),
            play_cost,
            owner,
            last_jackpot,
            jackpot,
            recent_players,
        })
    }

    /// Owner-only withdrawal. Waits for the transaction to be mined.
    pub async fn withdraw(&self) -> Result<TxHash> {
        let connection = self.require_connection()?;
        let tx_hash = connection.contract.withdraw().await?;
        let receipt = crate::provider::wait_for_receipt(
            connection.contract.provider().as_ref(),
            tx_hash,
            self.config.poll_interval,
            self.config.confirmation_timeout,
        )
        .await?;
        if !receipt.success {
            return Err(LotteryError::TransactionReverted {
                tx_hash: tx_hash.to_string(),
            });
        }
        self.state.write().message = format!("Withdrawal successful. Hash: {}", tx_hash);
        Ok(tx_hash)
    }

    /// Subscribe to contract events from the current block on.
    pub async fn watch(&self, filter: EventFilter) -> Result<Subscription> {
        let connection = self.require_connection()?;
        let from_block = connection.contract.provider().block_number().await?;
        Ok(connection
            .events
            .subscribe(Uuid::new_v4(), filter, from_block))
    }

    /// Drop the connection and every subscription tied to it.
    pub fn disconnect(&self) {
        if let Some(connection) = self.connection.write().take() {
            connection.events.cancel_all();
            tracing::info!("Disconnected {}", connection.session.account());
        }
        *self.state.write() = ControllerState::default();
    }
}

impl Drop for LotteryController {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.events.cancel_all();
        }
    }
}

/// Returns the controller to idle even when the play future is dropped.
/// A guard outlived by `disconnect` and a newer play leaves that play alone.
struct PendingGuard {
    state: Arc<RwLock<ControllerState>>,
    token: Uuid,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.state.write().release(self.token);
    }
}
