//! Minimal Ethereum JSON-RPC client

use crate::error::{FaucetError, FaucetResult};
use crate::types::Address;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// RPC client for interacting with blockchain
pub struct BlockchainRpcClient {
    rpc_url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl BlockchainRpcClient {
    pub fn new(rpc_url: String, timeout: Duration) -> FaucetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FaucetError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            rpc_url,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> FaucetResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id
        });

        debug!(method, id, "JSON-RPC request");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| FaucetError::RpcError(format!("Request failed: {}", e)))?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| FaucetError::RpcError(format!("Invalid response: {}", e)))?;

        if let Some(error) = json.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(FaucetError::RpcError(message));
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| FaucetError::RpcError(format!("{} returned no result", method)))
    }

    pub async fn chain_id(&self) -> FaucetResult<u64> {
        let result = self.call("eth_chainId", json!([])).await?;
        let id = parse_quantity(&result)?;
        u64::try_from(id)
            .map_err(|_| FaucetError::RpcError(format!("chain id out of range: {}", id)))
    }

    /// Nonce including transactions still in the pool.
    pub async fn pending_nonce(&self, address: &Address) -> FaucetResult<u64> {
        let result = self
            .call("eth_getTransactionCount", json!([address.to_hex(), "pending"]))
            .await?;
        let nonce = parse_quantity(&result)?;
        u64::try_from(nonce)
            .map_err(|_| FaucetError::RpcError(format!("nonce out of range: {}", nonce)))
    }

    pub async fn gas_price(&self) -> FaucetResult<u128> {
        let result = self.call("eth_gasPrice", json!([])).await?;
        parse_quantity(&result)
    }

    pub async fn estimate_gas(
        &self,
        from: &Address,
        to: &Address,
        value: u128,
        data: &[u8],
    ) -> FaucetResult<u64> {
        let result = self
            .call(
                "eth_estimateGas",
                json!([{
                    "from": from.to_hex(),
                    "to": to.to_hex(),
                    "value": format!("0x{:x}", value),
                    "data": format!("0x{}", hex::encode(data)),
                }]),
            )
            .await?;
        let gas = parse_quantity(&result)?;
        u64::try_from(gas)
            .map_err(|_| FaucetError::RpcError(format!("gas estimate out of range: {}", gas)))
    }

    pub async fn balance(&self, address: &Address) -> FaucetResult<u128> {
        let result = self
            .call("eth_getBalance", json!([address.to_hex(), "latest"]))
            .await?;
        parse_quantity(&result)
    }

    /// Submit a signed transaction and return the hash reported by the node.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> FaucetResult<String> {
        let result = self
            .call(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;

        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                FaucetError::RpcError(format!("unexpected transaction hash: {}", result))
            })
    }
}

/// Decode a hex `QUANTITY` such as `"0x1a"`.
pub fn parse_quantity(value: &Value) -> FaucetResult<u128> {
    let text = value
        .as_str()
        .ok_or_else(|| FaucetError::RpcError(format!("expected hex quantity, got {}", value)))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| FaucetError::RpcError(format!("quantity missing 0x prefix: {}", text)))?;

    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| FaucetError::RpcError(format!("invalid quantity {}: {}", text, e)))
}
