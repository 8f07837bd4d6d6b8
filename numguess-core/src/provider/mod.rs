pub mod rpc;

#[cfg(test)]
pub(crate) mod testing;

pub use rpc::JsonRpcProvider;

use crate::error::{LotteryError, Result};
use crate::types::{Address, Log, LogFilter, TransactionReceipt, TransactionRequest, TxHash, Wei};
use async_trait::async_trait;
use std::time::Duration;

/// Wallet provider holding the user's keys.
///
/// Account access, signing and submission are delegated to it entirely; the
/// client never sees key material.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the user to authorize account access.
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    async fn get_balance(&self, address: Address) -> Result<Wei>;

    /// Read-only contract call against the latest block.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>>;

    /// Sign and broadcast a transaction from one of the authorized accounts.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash>;

    async fn get_transaction_receipt(&self, tx_hash: TxHash)
        -> Result<Option<TransactionReceipt>>;

    async fn block_number(&self) -> Result<u64>;

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>>;
}

/// Poll for a receipt until the transaction is mined or `timeout` elapses.
pub async fn wait_for_receipt(
    provider: &dyn WalletProvider,
    tx_hash: TxHash,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<TransactionReceipt> {
    let poll = async {
        loop {
            if let Some(receipt) = provider.get_transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            tracing::debug!("Transaction {} not mined yet", tx_hash);
            tokio::time::sleep(poll_interval).await;
        }
    };

    tokio::time::timeout(timeout, poll).await.map_err(|_| {
        LotteryError::timeout(format!(
            "Transaction {} not mined after {}s",
            tx_hash,
            timeout.as_secs()
        ))
    })?
}
