use crate::abi::{self, JackpotEvent, LotteryCall, LotteryEvent, PlayedEvent};
use crate::error::{LotteryError, Result};
use crate::provider::WalletProvider;
use crate::types::{Address, LogFilter, TransactionRequest, TxHash, Wei};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Deployed lottery contract bound to the signing account of a session.
#[derive(Clone)]
pub struct ContractHandle {
    address: Address,
    signer: Address,
    provider: Arc<dyn WalletProvider>,
}

impl ContractHandle {
    pub fn new(address: Address, signer: Address, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            address,
            signer,
            provider,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    /// `eth_call` a view function. Reverts stay `Rpc` errors, anything else
    /// the node reports is a failed read.
    async fn read(&self, call: LotteryCall) -> Result<abi::Word> {
        let output = self
            .provider
            .call(self.address, call.encode())
            .await
            .map_err(|e| {
                if e.is_revert() {
                    e
                } else {
                    LotteryError::query(format!("{}: {}", call.signature(), e))
                }
            })?;
        abi::word_at(&output, 0)
            .map_err(|e| LotteryError::query(format!("{}: {}", call.signature(), e)))
    }

    async fn transact(&self, call: LotteryCall, value: Wei) -> Result<TxHash> {
        let tx = TransactionRequest {
            from: self.signer,
            to: self.address,
            value,
            data: call.encode(),
        };
        let tx_hash = self.provider.send_transaction(tx).await?;
        tracing::info!("Submitted {} from {}: {}", call.signature(), self.signer, tx_hash);
        Ok(tx_hash)
    }

    /// Native balance held by the contract.
    pub async fn balance(&self) -> Result<Wei> {
        self.provider.get_balance(self.address).await
    }

    pub async fn play_cost(&self) -> Result<Wei> {
        let word = self.read(LotteryCall::PlayCost).await?;
        Ok(Wei::from_wei(abi::decode_u128(&word)?))
    }

    pub async fn owner(&self) -> Result<Address> {
        let word = self.read(LotteryCall::Owner).await?;
        abi::decode_address(&word)
    }

    pub async fn last_jackpot_timestamp(&self) -> Result<DateTime<Utc>> {
        let word = self.read(LotteryCall::LastJackpotTimestamp).await?;
        let secs = abi::decode_u64(&word)?;
        let secs = i64::try_from(secs)
            .map_err(|_| LotteryError::abi(format!("Timestamp out of range: {}", secs)))?;
        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| LotteryError::abi(format!("Timestamp out of range: {}", secs)))
    }

    pub async fn players_since_last_jackpot(&self, index: u64) -> Result<Address> {
        let word = self
            .read(LotteryCall::PlayersSinceLastJackpot { index })
            .await?;
        abi::decode_address(&word)
    }

    /// Players since the last jackpot, reading indices until the contract
    /// reverts (end of the array) or `limit` entries were collected.
    pub async fn recent_players(&self, limit: usize) -> Result<Vec<Address>> {
        let mut players = Vec::new();
        for index in 0..limit as u64 {
            match self.players_since_last_jackpot(index).await {
                Ok(player) => players.push(player),
                Err(e) if e.is_revert() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(players)
    }

    /// Submit a guess with the given stake. Returns once the wallet has
    /// broadcast the transaction, not when it is mined.
    pub async fn play(&self, number: u64, value: Wei) -> Result<TxHash> {
        self.transact(LotteryCall::Play { number }, value).await
    }

    /// Owner-only sweep of the contract balance.
    pub async fn withdraw(&self) -> Result<TxHash> {
        self.transact(LotteryCall::Withdraw, Wei::ZERO).await
    }

    /// Decoded contract events between two blocks (inclusive, `None` = latest).
    pub async fn events(&self, from_block: u64, to_block: Option<u64>) -> Result<Vec<LotteryEvent>> {
        let filter = LogFilter {
            address: self.address,
            topics: Vec::new(),
            from_block,
            to_block,
        };
        let logs = self.provider.get_logs(&filter).await?;

        let mut events = Vec::new();
        for log in &logs {
            if let Some(event) = LotteryEvent::decode(log)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    pub async fn played_events(&self, from_block: u64) -> Result<Vec<PlayedEvent>> {
        Ok(self
            .events(from_block, None)
            .await?
            .into_iter()
            .filter_map(|event| match event {
                LotteryEvent::Played(played) => Some(played),
                LotteryEvent::Jackpot(_) => None,
            })
            .collect())
    }

    pub async fn jackpot_events(&self, from_block: u64) -> Result<Vec<JackpotEvent>> {
        Ok(self
            .events(from_block, None)
            .await?
            .into_iter()
            .filter_map(|event| match event {
                LotteryEvent::Jackpot(jackpot) => Some(jackpot),
                LotteryEvent::Played(_) => None,
            })
            .collect())
    }
}

impl std::fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractHandle")
            .field("address", &self.address)
            .field("signer", &self.signer)
            .finish()
    }
}
