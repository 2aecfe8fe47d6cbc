//! JSON-RPC chain client.
//!
//! Talks to an EVM-style node hosting the anchors contract:
//!
//! - `eth_sendTransaction` carries `session_id || merkle_root || owner` as
//!   call data
//! - `eth_getTransactionReceipt` + `eth_blockNumber` give the depth;
//!   a receipt with status `0x0` is a reverted anchor
//!
//! The node signs with its unlocked account. Key custody is out of scope.

use crate::domain::AnchorSubmissionError;
use crate::ports::ChainSubmitter;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::AnchorRequest;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Gas limit sent with every anchor transaction.
const ANCHOR_GAS: &str = "0x5208";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

pub struct JsonRpcChainSubmitter {
    client: reqwest::Client,
    rpc_url: String,
    contract_address: String,
    next_id: AtomicU64,
}

impl JsonRpcChainSubmitter {
    pub fn new(rpc_url: impl Into<String>, contract_address: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            contract_address: contract_address.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Option<Value>, AnchorSubmissionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": id });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnchorSubmissionError::Rpc(e.to_string()))?;
        let response: RpcResponse = response
            .json()
            .await
            .map_err(|e| AnchorSubmissionError::Rpc(format!("malformed response: {e}")))?;

        if let Some(error) = response.error {
            return Err(classify_rpc_error(method, &error));
        }
        debug!(method, id, "Chain RPC call answered");
        Ok(response.result.filter(|v| !v.is_null()))
    }
}

/// Call data for the anchors contract.
pub fn encode_anchor_call(request: &AnchorRequest) -> String {
    format!(
        "0x{}{}{}",
        hex::encode(request.session_id.as_bytes()),
        hex::encode(request.merkle_root),
        hex::encode(request.owner.as_str().as_bytes())
    )
}

/// `0x`-prefixed quantity to integer.
pub fn parse_quantity(value: &Value) -> Result<u64, AnchorSubmissionError> {
    let text = value
        .as_str()
        .ok_or_else(|| AnchorSubmissionError::Rpc(format!("expected hex quantity, got {value}")))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(digits, 16)
        .map_err(|_| AnchorSubmissionError::Rpc(format!("bad hex quantity {text:?}")))
}

/// Execution errors (code 3, or -32000 mentioning a revert) mean the chain
/// refused the anchor; everything else is treated as transient.
fn classify_rpc_error(method: &str, error: &RpcError) -> AnchorSubmissionError {
    let reverted = error.code == 3 || error.message.to_lowercase().contains("revert");
    if reverted {
        AnchorSubmissionError::Rejected(error.message.clone())
    } else {
        AnchorSubmissionError::Rpc(format!("{method} failed ({}): {}", error.code, error.message))
    }
}

/// Depth from a receipt and the chain head.
fn depth_from_receipt(receipt: &Value, head: u64) -> Result<u64, AnchorSubmissionError> {
    if receipt.get("status").and_then(Value::as_str) == Some("0x0") {
        return Err(AnchorSubmissionError::Rejected("transaction reverted".into()));
    }
    match receipt.get("blockNumber") {
        Some(block) if !block.is_null() => {
            let block = parse_quantity(block)?;
            Ok(head.saturating_sub(block).saturating_add(1))
        }
        _ => Ok(0),
    }
}

#[async_trait]
impl ChainSubmitter for JsonRpcChainSubmitter {
    async fn submit_anchor(&self, request: &AnchorRequest) -> Result<String, AnchorSubmissionError> {
        let params = json!([{
            "to": self.contract_address,
            "data": encode_anchor_call(request),
            "gas": ANCHOR_GAS,
        }]);
        let result = self.call("eth_sendTransaction", params).await?;
        result
            .as_ref()
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| AnchorSubmissionError::Rpc("eth_sendTransaction returned no txid".into()))
    }

    async fn get_confirmations(&self, txid: &str) -> Result<u64, AnchorSubmissionError> {
        let Some(receipt) = self.call("eth_getTransactionReceipt", json!([txid])).await? else {
            return Ok(0);
        };
        let head = self
            .call("eth_blockNumber", json!([]))
            .await?
            .ok_or_else(|| AnchorSubmissionError::Rpc("eth_blockNumber returned null".into()))?;
        depth_from_receipt(&receipt, parse_quantity(&head)?)
    }
}
