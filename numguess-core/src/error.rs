use thiserror::Error;

pub type Result<T> = std::result::Result<T, LotteryError>;

/// JSON-RPC error code nodes use for a reverted `eth_call`.
pub const EXECUTION_REVERTED: i64 = 3;

#[derive(Error, Debug)]
pub enum LotteryError {
    #[error("Wallet provider is not installed")]
    ProviderNotFound,

    #[error("Wallet connection rejected: {0}")]
    ConnectionRejected(String),

    #[error("Wallet is not connected")]
    NotConnected,

    #[error("A play is already in progress")]
    PlayInProgress,

    #[error("Invalid number {0}: must be between 1 and 99")]
    InvalidNumber(u64),

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("Transaction reverted: {tx_hash}")]
    TransactionReverted { tx_hash: String },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LotteryError {
    pub fn connection_rejected(msg: impl Into<String>) -> Self {
        Self::ConnectionRejected(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::TransactionRejected(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Whether the node reported the call as reverted by the contract.
    pub fn is_revert(&self) -> bool {
        match self {
            Self::Rpc { code, message } => {
                *code == EXECUTION_REVERTED || message.contains("revert")
            }
            _ => false,
        }
    }

    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
        }
    }

    pub fn abi(msg: impl Into<String>) -> Self {
        Self::Abi(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Single-line message shown to the player for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderNotFound => "Wallet provider is not installed.".to_string(),
            Self::ConnectionRejected(_) => "Failed to connect wallet.".to_string(),
            Self::NotConnected => "Please connect to your wallet first.".to_string(),
            Self::PlayInProgress => "A transaction is already in progress.".to_string(),
            Self::InvalidNumber(_) => "Enter a number between 1 and 99.".to_string(),
            Self::Query(msg) => format!("Failed to read contract: {}", msg),
            other => format!("Transaction failed: {}", other),
        }
    }
}
