//! In-memory wallet provider that plays the lottery contract for tests.

use super::WalletProvider;
use crate::abi::{self, LotteryCall};
use crate::config::DEFAULT_CONTRACT_ADDRESS;
use crate::error::{LotteryError, Result};
use crate::types::{Address, Log, LogFilter, TransactionReceipt, TransactionRequest, TxHash, Wei};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

pub(crate) fn account() -> Address {
    "0x00000000000000000000000000000000000000aa"
        .parse()
        .unwrap()
}

pub(crate) fn other_account() -> Address {
    "0x00000000000000000000000000000000000000bb"
        .parse()
        .unwrap()
}

pub(crate) fn contract() -> Address {
    DEFAULT_CONTRACT_ADDRESS.parse().unwrap()
}

struct ChainState {
    accounts: Vec<Address>,
    reject_accounts: bool,
    reject_transactions: bool,
    revert_next: bool,
    auto_mine: bool,
    logs_in_receipt: bool,
    fail_balance: bool,
    fail_calls: bool,
    block: u64,
    balances: HashMap<Address, u128>,
    draws: VecDeque<u64>,
    /// Draws emitted for other players just before ours.
    foreign_plays: Vec<(Address, u64, u64)>,
    play_cost: u128,
    owner: Address,
    last_jackpot: u64,
    players: Vec<Address>,
    logs: Vec<Log>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    sent: Vec<TransactionRequest>,
    nonce: u8,
}

pub(crate) struct ScriptedChain {
    state: Mutex<ChainState>,
}

impl ScriptedChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                accounts: vec![account()],
                reject_accounts: false,
                reject_transactions: false,
                revert_next: false,
                auto_mine: true,
                logs_in_receipt: true,
                fail_balance: false,
                fail_calls: false,
                block: 100,
                balances: HashMap::new(),
                draws: VecDeque::new(),
                foreign_plays: Vec::new(),
                play_cost: 1_000_000_000_000_000,
                owner: other_account(),
                last_jackpot: 1_700_000_000,
                players: Vec::new(),
                logs: Vec::new(),
                receipts: HashMap::new(),
                sent: Vec::new(),
                nonce: 0,
            }),
        }
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().accounts = accounts;
    }

    pub fn reject_accounts(&self) {
        self.state.lock().reject_accounts = true;
    }

    pub fn reject_transactions(&self) {
        self.state.lock().reject_transactions = true;
    }

    pub fn revert_next(&self) {
        self.state.lock().revert_next = true;
    }

    pub fn set_auto_mine(&self, auto_mine: bool) {
        self.state.lock().auto_mine = auto_mine;
    }

    /// Keep `Played` logs out of receipts so they only show up via `eth_getLogs`.
    pub fn logs_only_via_filter(&self) {
        self.state.lock().logs_in_receipt = false;
    }

    pub fn fail_balance(&self) {
        self.state.lock().fail_balance = true;
    }

    /// Make every `eth_call` fail with a node error instead of a revert.
    pub fn fail_calls(&self) {
        self.state.lock().fail_calls = true;
    }

    pub fn set_contract_balance(&self, wei: u128) {
        self.state.lock().balances.insert(contract(), wei);
    }

    pub fn contract_balance(&self) -> u128 {
        self.state
            .lock()
            .balances
            .get(&contract())
            .copied()
            .unwrap_or(0)
    }

    pub fn push_draw(&self, number: u64) {
        self.state.lock().draws.push_back(number);
    }

    pub fn push_foreign_play(&self, player: Address, player_number: u64, contract_number: u64) {
        self.state
            .lock()
            .foreign_plays
            .push((player, player_number, contract_number));
    }

    pub fn push_player(&self, player: Address) {
        self.state.lock().players.push(player);
    }

    pub fn set_owner(&self, owner: Address) {
        self.state.lock().owner = owner;
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().sent.clone()
    }

    fn played_log(
        state: &ChainState,
        player: Address,
        player_number: u64,
        contract_number: u64,
        tx_hash: TxHash,
    ) -> Log {
        let mut log = abi::lottery::played_log(contract(), player, player_number, contract_number);
        log.block_number = Some(state.block);
        log.tx_hash = Some(tx_hash);
        log
    }

    fn execute_play(state: &mut ChainState, tx: &TransactionRequest, tx_hash: TxHash) -> Vec<Log> {
        let number = abi::decode_u64(&abi::word_at(&tx.data[4..], 0).unwrap()).unwrap();
        let drawn = state.draws.pop_front().unwrap_or(50);

        let mut logs = Vec::new();
        for (player, player_number, contract_number) in std::mem::take(&mut state.foreign_plays) {
            logs.push(Self::played_log(
                state,
                player,
                player_number,
                contract_number,
                tx_hash,
            ));
        }

        *state.balances.entry(contract()).or_insert(0) += tx.value.to_wei();
        state.players.push(tx.from);
        logs.push(Self::played_log(state, tx.from, number, drawn, tx_hash));

        if number == drawn {
            let pot = state.balances.get(&contract()).copied().unwrap_or(0);
            let prize = pot / 2;
            state.balances.insert(contract(), pot - prize);
            state.players.clear();
            let mut data = Vec::new();
            data.extend_from_slice(&abi::encode_uint(prize));
            logs.push(Log {
                address: contract(),
                topics: vec![abi::lottery::jackpot_topic(), abi::encode_address(&tx.from)],
                data,
                block_number: Some(state.block),
                tx_hash: Some(tx_hash),
            });
        }
        logs
    }
}

#[async_trait]
impl WalletProvider for ScriptedChain {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let state = self.state.lock();
        if state.reject_accounts {
            return Err(LotteryError::connection_rejected("User rejected the request."));
        }
        Ok(state.accounts.clone())
    }

    async fn get_balance(&self, address: Address) -> Result<Wei> {
        let state = self.state.lock();
        if state.fail_balance {
            return Err(LotteryError::query("header not found"));
        }
        Ok(Wei::from_wei(
            state.balances.get(&address).copied().unwrap_or(0),
        ))
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        let state = self.state.lock();
        if state.fail_calls {
            return Err(LotteryError::rpc(-32603, "internal error"));
        }
        if to != contract() || data.len() < 4 {
            return Ok(Vec::new());
        }
        let selector = &data[..4];
        let word = if selector == LotteryCall::PlayCost.encode().as_slice() {
            abi::encode_uint(state.play_cost)
        } else if selector == LotteryCall::Owner.encode().as_slice() {
            abi::encode_address(&state.owner)
        } else if selector == LotteryCall::LastJackpotTimestamp.encode().as_slice() {
            abi::encode_uint(u128::from(state.last_jackpot))
        } else if selector == &abi::selector("playersSinceLastJackpot(uint256)")[..] {
            let index = abi::decode_u64(&abi::word_at(&data[4..], 0)?)? as usize;
            match state.players.get(index) {
                Some(player) => abi::encode_address(player),
                None => return Err(LotteryError::rpc(3, "execution reverted")),
            }
        } else {
            return Err(LotteryError::rpc(3, "execution reverted"));
        };
        Ok(word.to_vec())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        let mut state = self.state.lock();
        if state.reject_transactions {
            return Err(LotteryError::rejected("User denied transaction signature."));
        }
        state.nonce = state.nonce.wrapping_add(1);
        let tx_hash = TxHash::from_bytes([state.nonce; 32]);
        state.sent.push(tx.clone());

        if !state.auto_mine {
            return Ok(tx_hash);
        }

        state.block += 1;
        let is_play = tx.data.len() == 36
            && tx.data[..4] == abi::selector("play(uint256)")[..];
        let is_withdraw = tx.data == LotteryCall::Withdraw.encode();
        let success = !std::mem::take(&mut state.revert_next)
            && (!is_play || tx.value.to_wei() == state.play_cost)
            && (!is_withdraw || tx.from == state.owner);
        if success && is_withdraw {
            state.balances.insert(contract(), 0);
        }

        let logs = if success && is_play {
            Self::execute_play(&mut state, &tx, tx_hash)
        } else {
            Vec::new()
        };
        state.logs.extend(logs.iter().cloned());

        let receipt = TransactionReceipt {
            tx_hash,
            block_number: state.block,
            success,
            logs: if state.logs_in_receipt { logs } else { Vec::new() },
        };
        state.receipts.insert(tx_hash, receipt);
        Ok(tx_hash)
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TransactionReceipt>> {
        Ok(self.state.lock().receipts.get(&tx_hash).cloned())
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.state.lock().block)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>> {
        Ok(self
            .state
            .lock()
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }
}
