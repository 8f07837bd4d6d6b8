use super::{
    decode_address, decode_u128, decode_u64, encode_call, encode_uint, event_topic, selector,
    word_at, Word,
};
use crate::error::{LotteryError, Result};
use crate::types::{Address, Log, TxHash, Wei};
use serde::{Deserialize, Serialize};

pub const PLAYED_EVENT: &str = "Played(address,uint256,uint256)";
pub const JACKPOT_EVENT: &str = "Jackpot(address,uint256)";

/// Calls exposed by the lottery contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotteryCall {
    Play { number: u64 },
    PlayCost,
    LastJackpotTimestamp,
    Owner,
    PlayersSinceLastJackpot { index: u64 },
    Withdraw,
}

impl LotteryCall {
    pub fn signature(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play(uint256)",
            Self::PlayCost => "playCost()",
            Self::LastJackpotTimestamp => "lastJackpotTimestamp()",
            Self::Owner => "owner()",
            Self::PlayersSinceLastJackpot { .. } => "playersSinceLastJackpot(uint256)",
            Self::Withdraw => "withdraw()",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let args = match self {
            Self::Play { number } => vec![encode_uint(u128::from(*number))],
            Self::PlayersSinceLastJackpot { index } => vec![encode_uint(u128::from(*index))],
            _ => Vec::new(),
        };
        encode_call(selector(self.signature()), &args)
    }
}

pub fn played_topic() -> Word {
    event_topic(PLAYED_EVENT)
}

pub fn jackpot_topic() -> Word {
    event_topic(JACKPOT_EVENT)
}

/// `Played(address indexed player, uint256 playerNumber, uint256 contractNumber)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedEvent {
    pub player: Address,
    pub player_number: u64,
    pub contract_number: u64,
    pub block_number: Option<u64>,
    pub tx_hash: Option<TxHash>,
}

/// `Jackpot(address indexed winner, uint256 amount)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotEvent {
    pub winner: Address,
    pub amount: Wei,
    pub block_number: Option<u64>,
    pub tx_hash: Option<TxHash>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotteryEvent {
    Played(PlayedEvent),
    Jackpot(JackpotEvent),
}

impl LotteryEvent {
    /// Decode a contract log. Logs with an unknown topic yield `Ok(None)`.
    pub fn decode(log: &Log) -> Result<Option<Self>> {
        let Some(topic0) = log.topics.first() else {
            return Ok(None);
        };

        if *topic0 == played_topic() {
            let player = indexed_address(log)?;
            Ok(Some(Self::Played(PlayedEvent {
                player,
                player_number: decode_u64(&word_at(&log.data, 0)?)?,
                contract_number: decode_u64(&word_at(&log.data, 1)?)?,
                block_number: log.block_number,
                tx_hash: log.tx_hash,
            })))
        } else if *topic0 == jackpot_topic() {
            let winner = indexed_address(log)?;
            Ok(Some(Self::Jackpot(JackpotEvent {
                winner,
                amount: Wei::from_wei(decode_u128(&word_at(&log.data, 0)?)?),
                block_number: log.block_number,
                tx_hash: log.tx_hash,
            })))
        } else {
            Ok(None)
        }
    }
}

fn indexed_address(log: &Log) -> Result<Address> {
    let topic = log
        .topics
        .get(1)
        .ok_or_else(|| LotteryError::abi("Missing indexed address topic"))?;
    decode_address(topic)
}

#[cfg(test)]
pub(crate) fn played_log(
    contract: Address,
    player: Address,
    player_number: u64,
    contract_number: u64,
) -> Log {
    let mut data = Vec::new();
    data.extend_from_slice(&encode_uint(u128::from(player_number)));
    data.extend_from_slice(&encode_uint(u128::from(contract_number)));
    Log {
        address: contract,
        topics: vec![played_topic(), super::encode_address(&player)],
        data,
        block_number: None,
        tx_hash: None,
    }
}
