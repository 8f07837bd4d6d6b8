use super::WalletProvider;
use crate::error::{LotteryError, Result};
use crate::types::{
    decode_prefixed_hex, Address, Log, LogFilter, TransactionReceipt, TransactionRequest, TxHash,
    Wei,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// EIP-1193 "user rejected request".
const USER_REJECTED: i64 = 4001;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: String,
    topics: Vec<String>,
    data: String,
    block_number: Option<String>,
    transaction_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

/// Wallet provider reached over HTTP JSON-RPC.
///
/// The endpoint must manage the account keys itself (a wallet bridge, a
/// signer proxy, or a development node with unlocked accounts).
pub struct JsonRpcProvider {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcProvider {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(LotteryError::config("RPC URL cannot be empty"));
        }
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            url,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        tracing::debug!("RPC request {} ({})", method, id);

        let response: RpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(LotteryError::rpc(error.code, error.message));
        }
        Ok(response.result)
    }

    async fn request_required<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        self.request(method, params)
            .await?
            .ok_or_else(|| LotteryError::query(format!("{} returned no result", method)))
    }
}

#[async_trait]
impl WalletProvider for JsonRpcProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let accounts: Vec<String> = self
            .request_required("eth_requestAccounts", json!([]))
            .await
            .map_err(|e| LotteryError::connection_rejected(e.to_string()))?;

        accounts.iter().map(|a| a.parse()).collect()
    }

    async fn get_balance(&self, address: Address) -> Result<Wei> {
        let balance: String = self
            .request_required("eth_getBalance", json!([address.to_string(), "latest"]))
            .await
            .map_err(|e| LotteryError::query(e.to_string()))?;
        Ok(Wei::from_wei(parse_quantity(&balance)?))
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        let result: String = self
            .request_required(
                "eth_call",
                json!([{ "to": to.to_string(), "data": to_data(&data) }, "latest"]),
            )
            .await?;
        parse_data(&result)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        let params = json!([{
            "from": tx.from.to_string(),
            "to": tx.to.to_string(),
            "value": to_quantity(tx.value.to_wei()),
            "data": to_data(&tx.data),
        }]);

        let hash: String = match self.request_required("eth_sendTransaction", params).await {
            Ok(hash) => hash,
            Err(LotteryError::Rpc { code, message }) if code == USER_REJECTED => {
                return Err(LotteryError::rejected(message));
            }
            Err(e) => return Err(e),
        };
        hash.parse()
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TransactionReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
            .await?;

        // Some nodes return a receipt without a block number while pending.
        let Some(receipt) = receipt else {
            return Ok(None);
        };
        let Some(block_number) = receipt.block_number.as_deref() else {
            return Ok(None);
        };

        let logs = receipt
            .logs
            .into_iter()
            .map(convert_log)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(TransactionReceipt {
            tx_hash: receipt.transaction_hash.parse()?,
            block_number: u64_quantity(block_number)?,
            success: receipt.status.as_deref().map_or(true, |s| s != "0x0"),
            logs,
        }))
    }

    async fn block_number(&self) -> Result<u64> {
        let number: String = self.request_required("eth_blockNumber", json!([])).await?;
        u64_quantity(&number)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>> {
        let topics: Vec<Value> = filter
            .topics
            .iter()
            .map(|t| match t {
                Some(topic) => Value::String(to_data(topic)),
                None => Value::Null,
            })
            .collect();
        let to_block = match filter.to_block {
            Some(block) => to_quantity(u128::from(block)),
            None => "latest".to_string(),
        };

        let logs: Vec<RpcLog> = self
            .request_required(
                "eth_getLogs",
                json!([{
                    "address": filter.address.to_string(),
                    "fromBlock": to_quantity(u128::from(filter.from_block)),
                    "toBlock": to_block,
                    "topics": topics,
                }]),
            )
            .await?;

        logs.into_iter().map(convert_log).collect()
    }
}

fn convert_log(log: RpcLog) -> Result<Log> {
    let topics = log
        .topics
        .iter()
        .map(|t| {
            parse_data(t)?
                .try_into()
                .map_err(|_| LotteryError::abi(format!("Topic is not 32 bytes: {}", t)))
        })
        .collect::<Result<Vec<[u8; 32]>>>()?;

    Ok(Log {
        address: log.address.parse()?,
        topics,
        data: parse_data(&log.data)?,
        block_number: log.block_number.as_deref().map(u64_quantity).transpose()?,
        tx_hash: log
            .transaction_hash
            .map(|h| h.parse::<TxHash>())
            .transpose()?,
    })
}

fn to_quantity(value: u128) -> String {
    format!("{:#x}", value)
}

fn to_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn parse_quantity(s: &str) -> Result<u128> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| LotteryError::abi(format!("Invalid quantity {}: {}", s, e)))
}

fn u64_quantity(s: &str) -> Result<u64> {
    u64::try_from(parse_quantity(s)?)
        .map_err(|_| LotteryError::abi(format!("Quantity out of range: {}", s)))
}

fn parse_data(s: &str) -> Result<Vec<u8>> {
    decode_prefixed_hex(s).map_err(|e| LotteryError::abi(format!("Invalid hex data {}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantities() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(1_000_000_000_000_000), "0x38d7ea4c68000");
        assert_eq!(parse_quantity("0x38d7ea4c68000").unwrap(), 1_000_000_000_000_000);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("0xzz").is_err());
        assert!(u64_quantity("0x10000000000000000").is_err());
    }

    #[test]
    fn test_receipt_json_conversion() {
        let json = r#"{
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": "0x10",
            "status": "0x1",
            "logs": [{
                "address": "0xCAD3FCD3EFF63F44384F4EE79256B028EABFFE46",
                "topics": ["0x2222222222222222222222222222222222222222222222222222222222222222"],
                "data": "0x",
                "blockNumber": "0x10",
                "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111"
            }]
        }"#;
        let receipt: RpcReceipt = serde_json::from_str(json).unwrap();
        let log = convert_log(receipt.logs.into_iter().next().unwrap()).unwrap();
        assert_eq!(
            log.address.to_string(),
            "0xcad3fcd3eff63f44384f4ee79256b028eabffe46"
        );
        assert_eq!(log.topics, vec![[0x22u8; 32]]);
        assert_eq!(log.block_number, Some(16));
        assert!(log.data.is_empty());
    }

    #[test]
    fn test_error_response_shape() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected the request."}}"#;
        let response: RpcResponse<String> = serde_json::from_str(json).unwrap();
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, USER_REJECTED);

        let pending = r#"{"jsonrpc":"2.0","id":2,"result":null}"#;
        let response: RpcResponse<RpcReceipt> = serde_json::from_str(pending).unwrap();
        assert!(response.result.is_none());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(JsonRpcProvider::new("").is_err());
    }
}
