use crate::abi::{LotteryEvent, PlayedEvent};
use crate::config::LotteryConfig;
use crate::contract::ContractHandle;
use crate::error::{LotteryError, Result};
use crate::events::EventBus;
use crate::provider::wait_for_receipt;
use crate::types::{Address, Log, TransactionStatus, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_NUMBER: u64 = 1;
pub const MAX_NUMBER: u64 = 99;

pub fn validate_number(number: u64) -> Result<u64> {
    if (MIN_NUMBER..=MAX_NUMBER).contains(&number) {
        Ok(number)
    } else {
        Err(LotteryError::InvalidNumber(number))
    }
}

/// One guess submitted by the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayAttempt {
    pub id: Uuid,
    pub account: Address,
    pub number: u64,
    pub tx_hash: Option<TxHash>,
    pub status: TransactionStatus,
    pub started_at: DateTime<Utc>,
}

impl PlayAttempt {
    fn new(account: Address, number: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            account,
            number,
            tx_hash: None,
            status: TransactionStatus::Pending,
            started_at: Utc::now(),
        }
    }

    /// Whether a `Played` event belongs to this attempt. Addresses compare
    /// as bytes, so checksum casing never matters.
    fn owns(&self, event: &PlayedEvent) -> bool {
        event.player == self.account
            && event.player_number == self.number
            && match (event.tx_hash, self.tx_hash) {
                (Some(event_tx), Some(our_tx)) => event_tx == our_tx,
                _ => true,
            }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Lose,
}

impl Outcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Win => "Congratulations! You won!",
            Self::Lose => "Sorry, you did not win this time.",
        }
    }
}

/// Player number against the number drawn by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    pub player_number: u64,
    pub contract_number: u64,
}

impl DrawResult {
    pub fn new(player_number: u64, contract_number: u64) -> Self {
        Self {
            player_number,
            contract_number,
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.player_number == self.contract_number {
            Outcome::Win
        } else {
            Outcome::Lose
        }
    }

    pub fn is_win(&self) -> bool {
        self.outcome() == Outcome::Win
    }
}

#[derive(Debug, Clone)]
pub struct PlayOutcome {
    pub attempt: PlayAttempt,
    pub result: DrawResult,
}

/// Submit a guess and wait for the matching `Played` event.
///
/// The event subscription is registered before the transaction is sent and
/// is dropped on every return path, including cancellation of this future.
pub async fn play(
    contract: &ContractHandle,
    events: &EventBus,
    config: &LotteryConfig,
    number: u64,
) -> Result<PlayOutcome> {
    let number = validate_number(number)?;
    let mut attempt = PlayAttempt::new(contract.signer(), number);
    let provider = contract.provider().clone();

    let from_block = provider.block_number().await?;
    let mut subscription = events.subscribe_played(attempt.id, attempt.account, from_block);

    let tx_hash = contract.play(number, config.play_cost).await?;
    attempt.tx_hash = Some(tx_hash);

    let receipt = wait_for_receipt(
        provider.as_ref(),
        tx_hash,
        config.poll_interval,
        config.confirmation_timeout,
    )
    .await?;
    if !receipt.success {
        tracing::warn!("Play {} reverted in tx {}", attempt.id, tx_hash);
        return Err(LotteryError::TransactionReverted {
            tx_hash: tx_hash.to_string(),
        });
    }
    attempt.status = TransactionStatus::Confirmed;
    tracing::info!(
        "Play {} mined in block {} ({})",
        attempt.id,
        receipt.block_number,
        tx_hash
    );

    let event = match find_in_logs(&attempt, contract.address(), &receipt.logs) {
        Some(event) => event,
        None => {
            let wait = async {
                while let Some(event) = subscription.next().await {
                    if let LotteryEvent::Played(event) = event {
                        if attempt.owns(&event) {
                            return Some(event);
                        }
                    }
                }
                None
            };
            tokio::time::timeout(config.event_timeout, wait)
                .await
                .map_err(|_| {
                    LotteryError::timeout(format!("No Played event for transaction {}", tx_hash))
                })?
                .ok_or_else(|| LotteryError::internal("Event subscription closed"))?
        }
    };

    let result = DrawResult::new(event.player_number, event.contract_number);
    tracing::info!(
        "Play {} resolved: player {} vs contract {}",
        attempt.id,
        result.player_number,
        result.contract_number
    );
    Ok(PlayOutcome { attempt, result })
}

fn find_in_logs(attempt: &PlayAttempt, contract: Address, logs: &[Log]) -> Option<PlayedEvent> {
    for log in logs.iter().filter(|log| log.address == contract) {
        match LotteryEvent::decode(log) {
            Ok(Some(LotteryEvent::Played(event))) if attempt.owns(&event) => return Some(event),
            Ok(_) => {}
            Err(e) => tracing::warn!("Play {}: skipping undecodable log: {}", attempt.id, e),
        }
    }
    None
}
