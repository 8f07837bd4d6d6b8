use crate::config::LotteryConfig;
use crate::contract::ContractHandle;
use crate::error::{LotteryError, Result};
use crate::provider::WalletProvider;
use crate::types::Address;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// An authorized wallet connection.
#[derive(Clone)]
pub struct Session {
    account: Address,
    provider: Arc<dyn WalletProvider>,
    connected_at: DateTime<Utc>,
}

impl Session {
    /// Request account access from `provider` and bind the lottery contract
    /// to the first authorized account.
    ///
    /// Nothing is retried: a missing provider or a rejected request is
    /// returned to the caller as is.
    pub async fn connect(
        provider: Option<Arc<dyn WalletProvider>>,
        config: &LotteryConfig,
    ) -> Result<(Session, ContractHandle)> {
        let provider = provider.ok_or(LotteryError::ProviderNotFound)?;

        let accounts = provider.request_accounts().await.map_err(|e| match e {
            LotteryError::ConnectionRejected(_) => e,
            other => LotteryError::connection_rejected(other.to_string()),
        })?;
        let account = accounts
            .first()
            .copied()
            .ok_or_else(|| LotteryError::connection_rejected("No accounts authorized"))?;

        let session = Session {
            account,
            provider: provider.clone(),
            connected_at: Utc::now(),
        };
        let contract = ContractHandle::new(config.contract_address, account, provider);

        tracing::info!(
            "Connected account {} to lottery {}",
            account,
            config.contract_address
        );
        Ok((session, contract))
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}
