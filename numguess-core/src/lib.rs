//! numguess - client SDK for the on-chain number guessing lottery
//!
//! Connects to a wallet provider, reads the lottery contract, submits
//! guesses and correlates the contract's `Played` event back to the
//! session that sent the guess. Game logic itself stays in the contract.

pub mod abi;
pub mod animation;
pub mod config;
pub mod contract;
pub mod controller;
pub mod error;
pub mod events;
pub mod jackpot;
pub mod play;
pub mod provider;
pub mod session;
pub mod types;

pub use abi::{JackpotEvent, LotteryEvent, PlayedEvent};
pub use config::LotteryConfig;
pub use contract::ContractHandle;
pub use controller::{ControllerState, LotteryController, LotteryInfo};
pub use error::{LotteryError, Result};
pub use events::{EventBus, EventFilter, Subscription};
pub use jackpot::Jackpot;
pub use play::{DrawResult, Outcome, PlayAttempt, PlayOutcome, MAX_NUMBER, MIN_NUMBER};
pub use provider::{JsonRpcProvider, WalletProvider};
pub use session::Session;
pub use types::{Address, TxHash, Wei};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedChain;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_and_play() {
        let chain = Arc::new(ScriptedChain::new());
        chain.set_contract_balance(4_000_000_000_000_000);
        chain.push_draw(17);

        let config = LotteryConfig::default().with_poll_interval(Duration::from_millis(5));
        let controller = LotteryController::new(config, Some(chain.clone()));

        controller.connect().await.unwrap();
        assert_eq!(
            controller.state().jackpot.unwrap().amount,
            Wei::from_ether("0.002").unwrap()
        );

        let outcome = controller.play(42).await.unwrap();
        assert_eq!(outcome.result.player_number, 42);
        assert_eq!(outcome.result.outcome(), Outcome::Lose);

        // Stake landed in the contract; refresh picks it up.
        let jackpot = controller.refresh_jackpot().await.unwrap();
        assert_eq!(jackpot.balance, Wei::from_ether("0.005").unwrap());
    }
}
