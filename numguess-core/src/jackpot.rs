use crate::contract::ContractHandle;
use crate::error::{LotteryError, Result};
use crate::types::Wei;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Jackpot shown to players: half of what the contract holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jackpot {
    pub balance: Wei,
    pub amount: Wei,
    pub fetched_at: DateTime<Utc>,
}

impl Jackpot {
    pub fn from_balance(balance: Wei) -> Self {
        Self {
            balance,
            amount: balance.half(),
            fetched_at: Utc::now(),
        }
    }
}

/// Query the contract balance and derive the jackpot. No caching.
pub async fn refresh_jackpot(contract: &ContractHandle) -> Result<Jackpot> {
    let balance = contract.balance().await.map_err(|e| match e {
        LotteryError::Query(_) => e,
        other => LotteryError::query(other.to_string()),
    })?;
    let jackpot = Jackpot::from_balance(balance);
    tracing::debug!(
        "Contract balance {} ETH, jackpot {} ETH",
        jackpot.balance,
        jackpot.amount
    );
    Ok(jackpot)
}
