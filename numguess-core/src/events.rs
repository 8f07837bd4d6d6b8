//! Cancellable subscriptions to lottery contract events.
//!
//! Each subscription owns a polling task. Dropping the handle, calling
//! [`Subscription::cancel`], or tearing the bus down with
//! [`EventBus::cancel_all`] stops the task and removes it from the registry.

use crate::abi::lottery::{jackpot_topic, played_topic};
use crate::abi::{encode_address, LotteryEvent};
use crate::provider::WalletProvider;
use crate::types::{Address, LogFilter};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use uuid::Uuid;

/// Which events a subscription delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    Played { player: Option<Address> },
    Jackpot { winner: Option<Address> },
    Any,
}

impl EventFilter {
    fn topics(&self) -> Vec<Option<[u8; 32]>> {
        match self {
            Self::Played { player } => {
                vec![Some(played_topic()), player.as_ref().map(encode_address)]
            }
            Self::Jackpot { winner } => {
                vec![Some(jackpot_topic()), winner.as_ref().map(encode_address)]
            }
            Self::Any => Vec::new(),
        }
    }

    /// Providers may ignore topic filters; decoded events are checked again.
    pub fn accepts(&self, event: &LotteryEvent) -> bool {
        match (self, event) {
            (Self::Played { player }, LotteryEvent::Played(e)) => {
                player.map_or(true, |p| p == e.player)
            }
            (Self::Jackpot { winner }, LotteryEvent::Jackpot(e)) => {
                winner.map_or(true, |w| w == e.winner)
            }
            (Self::Any, _) => true,
            _ => false,
        }
    }
}

type Registry = Arc<Mutex<HashMap<Uuid, (u64, AbortHandle)>>>;

#[derive(Clone)]
pub struct EventBus {
    provider: Arc<dyn WalletProvider>,
    contract: Address,
    poll_interval: Duration,
    registry: Registry,
    generation: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new(provider: Arc<dyn WalletProvider>, contract: Address, poll_interval: Duration) -> Self {
        Self {
            provider,
            contract,
            poll_interval,
            registry: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// `Played` events for one player, keyed by a play attempt.
    pub fn subscribe_played(&self, attempt_id: Uuid, player: Address, from_block: u64) -> Subscription {
        self.subscribe(
            attempt_id,
            EventFilter::Played {
                player: Some(player),
            },
            from_block,
        )
    }

    /// Start delivering events matching `filter` from `from_block` onwards.
    ///
    /// `id` keys the registration; reusing a live id replaces the previous
    /// subscription.
    pub fn subscribe(&self, id: Uuid, filter: EventFilter, from_block: u64) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let provider = self.provider.clone();
        let contract = self.contract;
        let poll_interval = self.poll_interval;

        let task = tokio::spawn(async move {
            let mut next_block = from_block;
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;

                let head = match provider.block_number().await {
                    Ok(head) => head,
                    Err(e) => {
                        tracing::warn!("Subscription {}: failed to read block number: {}", id, e);
                        continue;
                    }
                };
                if head < next_block {
                    continue;
                }

                let log_filter = LogFilter {
                    address: contract,
                    topics: filter.topics(),
                    from_block: next_block,
                    to_block: Some(head),
                };
                let logs = match provider.get_logs(&log_filter).await {
                    Ok(logs) => logs,
                    Err(e) => {
                        tracing::warn!("Subscription {}: failed to fetch logs: {}", id, e);
                        continue;
                    }
                };

                for log in logs {
                    match LotteryEvent::decode(&log) {
                        Ok(Some(event)) if filter.accepts(&event) => {
                            if sender.send(event).is_err() {
                                return;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!("Subscription {}: undecodable log: {}", id, e),
                    }
                }
                next_block = head + 1;
            }
        });

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        if let Some((_, previous)) = self
            .registry
            .lock()
            .insert(id, (generation, task.abort_handle()))
        {
            previous.abort();
        }
        tracing::debug!("Registered subscription {} from block {}", id, from_block);

        Subscription {
            id,
            generation,
            receiver,
            task,
            registry: self.registry.clone(),
        }
    }

    /// Number of live subscriptions.
    pub fn active(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn cancel_all(&self) {
        let mut registry = self.registry.lock();
        for (id, (_, handle)) in registry.drain() {
            handle.abort();
            tracing::debug!("Cancelled subscription {}", id);
        }
    }
}

pub struct Subscription {
    id: Uuid,
    generation: u64,
    receiver: mpsc::UnboundedReceiver<LotteryEvent>,
    task: JoinHandle<()>,
    registry: Registry,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next matching event, or `None` once the subscription was cancelled.
    pub async fn next(&mut self) -> Option<LotteryEvent> {
        self.receiver.recv().await
    }

    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
        let mut registry = self.registry.lock();
        // Only remove our own entry; the id may have been re-registered.
        let ours = registry
            .get(&self.id)
            .is_some_and(|(generation, _)| *generation == self.generation);
        if ours {
            registry.remove(&self.id);
            tracing::debug!("Deregistered subscription {}", self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::LotteryCall;
    use crate::provider::testing::{account, contract, other_account, ScriptedChain};
    use crate::types::{TransactionRequest, Wei};

    fn bus(chain: Arc<ScriptedChain>) -> EventBus {
        EventBus::new(chain, contract(), Duration::from_millis(5))
    }

    async fn send_play(chain: &ScriptedChain, number: u64) {
        chain
            .send_transaction(TransactionRequest {
                from: account(),
                to: contract(),
                value: Wei::from_ether("0.001").unwrap(),
                data: LotteryCall::Play { number }.encode(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscription_filters_by_player() {
        let chain = Arc::new(ScriptedChain::new());
        let bus = bus(chain.clone());
        let start = chain.block_number().await.unwrap();

        let mut sub = bus.subscribe(
            Uuid::new_v4(),
            EventFilter::Played {
                player: Some(account()),
            },
            start,
        );

        chain.push_foreign_play(other_account(), 5, 6);
        chain.push_draw(17);
        send_play(&chain, 42).await;

        match sub.next().await {
            Some(LotteryEvent::Played(event)) => {
                assert_eq!(event.player, account());
                assert_eq!(event.player_number, 42);
                assert_eq!(event.contract_number, 17);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_drop_deregisters() {
        let chain = Arc::new(ScriptedChain::new());
        let bus = bus(chain);

        let first = bus.subscribe(Uuid::new_v4(), EventFilter::Any, 0);
        let second = bus.subscribe(Uuid::new_v4(), EventFilter::Any, 0);
        assert_eq!(bus.active(), 2);

        drop(first);
        assert_eq!(bus.active(), 1);
        second.cancel();
        assert_eq!(bus.active(), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_closes_receivers() {
        let chain = Arc::new(ScriptedChain::new());
        let bus = bus(chain);

        let mut sub = bus.subscribe(Uuid::new_v4(), EventFilter::Any, 0);
        bus.cancel_all();
        assert_eq!(bus.active(), 0);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn test_filter_accepts() {
        let played = LotteryEvent::Played(crate::abi::PlayedEvent {
            player: account(),
            player_number: 1,
            contract_number: 2,
            block_number: None,
            tx_hash: None,
        });
        assert!(EventFilter::Any.accepts(&played));
        assert!(EventFilter::Played { player: None }.accepts(&played));
        assert!(!EventFilter::Played {
            player: Some(other_account())
        }
        .accepts(&played));
        assert!(!EventFilter::Jackpot { winner: None }.accepts(&played));
    }
}
