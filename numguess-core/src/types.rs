use crate::error::{LotteryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;
const ETHER_DECIMALS: usize = 18;

/// 20-byte account or contract address.
///
/// Parsing accepts any hex case, so two textual addresses that differ only
/// in checksum casing compare equal once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = LotteryError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_prefixed_hex(s)
            .map_err(|e| LotteryError::InvalidAddress(format!("{}: {}", s, e)))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| LotteryError::InvalidAddress(format!("{}: expected 20 bytes", s)))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = LotteryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for TxHash {
    type Err = LotteryError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_prefixed_hex(s)
            .map_err(|e| LotteryError::internal(format!("Invalid tx hash {}: {}", s, e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LotteryError::internal(format!("Invalid tx hash {}", s)))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for TxHash {
    type Error = LotteryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Amount of the chain's native currency, in wei.
///
/// Serialized as a decimal ether string ("0.001") so config files stay
/// readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Wei(u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    pub fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    pub fn to_wei(&self) -> u128 {
        self.0
    }

    /// Parse a decimal ether amount such as `"0.001"` or `"2"`.
    pub fn from_ether(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || LotteryError::InvalidAmount(s.to_string());

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > ETHER_DECIMALS {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = ETHER_DECIMALS);
            padded.parse().map_err(|_| invalid())?
        };

        whole
            .checked_mul(WEI_PER_ETHER)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Half of the amount, rounded down. This is the payout share the
    /// lottery advertises as the jackpot.
    pub fn half(&self) -> Self {
        Self(self.0 / 2)
    }
}

impl TryFrom<String> for Wei {
    type Error = LotteryError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_ether(&value)
    }
}

impl From<Wei> for String {
    fn from(value: Wei) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac = format!("{:0>width$}", frac, width = ETHER_DECIMALS);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

/// A transaction handed to the wallet provider for signing and submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub value: Wei,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// `false` when the transaction reverted.
    pub success: bool,
    pub logs: Vec<Log>,
}

/// Event log emitted by a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
    pub block_number: Option<u64>,
    pub tx_hash: Option<TxHash>,
}

/// `eth_getLogs` filter. `None` topic positions match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topics: Vec<Option<[u8; 32]>>,
    pub from_block: u64,
    pub to_block: Option<u64>,
}

impl LogFilter {
    pub fn matches(&self, log: &Log) -> bool {
        if log.address != self.address {
            return false;
        }
        if let Some(block) = log.block_number {
            if block < self.from_block || self.to_block.is_some_and(|to| block > to) {
                return false;
            }
        }
        self.topics.iter().enumerate().all(|(i, topic)| match topic {
            Some(expected) => log.topics.get(i) == Some(expected),
            None => true,
        })
    }
}

pub(crate) fn decode_prefixed_hex(s: &str) -> std::result::Result<Vec<u8>, hex::FromHexError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.len() % 2 == 1 {
        hex::decode(format!("0{}", s))
    } else {
        hex::decode(s)
    }
}
