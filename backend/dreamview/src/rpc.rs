//! Ethereum JSON-RPC implementation of [`DreamSource`].
//!
//! ## Resilience
//!
//! * Reads (`eth_call`) back off exponentially on transport errors, HTTP 429
//!   and soft RPC errors, up to `max_retries` extra attempts and at most
//!   [`MAX_BACKOFF_SECS`] seconds between them.
//! * Hard RPC errors (bad request, unknown method, execution reverted) fail
//!   immediately.
//! * Writes (`eth_sendTransaction`) are sent exactly once.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::abi;
use crate::errors::{DreamError, Result};
use crate::snapshot::Field;
use crate::source::{Action, DreamSource, FieldValue, WriteRequest};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    Yes,
    No,
}

// ─────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RpcDreamSource {
    client: Client,
    rpc_url: String,
    contract: Address,
    max_retries: u32,
    initial_backoff: Duration,
}

impl RpcDreamSource {
    pub fn new(client: Client, rpc_url: impl Into<String>, contract: Address, max_retries: u32) -> Self {
        Self {
            client,
            rpc_url: rpc_url.into(),
            contract,
            max_retries,
            initial_backoff: Duration::from_secs(INITIAL_BACKOFF_SECS),
        }
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Reachability check: `eth_chainId`, single attempt.
    pub async fn chain_id(&self) -> Result<u64> {
        let result = self.request("eth_chainId", json!([]), Retry::No).await?;
        parse_quantity(&result)
    }

    async fn request(&self, method: &str, params: Value, retry: Retry) -> Result<Value> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0u32;

        loop {
            let outcome = self.send_once(method, &params).await;
            let soft = match outcome {
                Ok(value) => return Ok(value),
                Err(e) if retry == Retry::No || !is_retryable(&e) => return Err(e),
                Err(e) => e,
            };
            if attempt >= self.max_retries {
                return Err(soft);
            }
            attempt += 1;
            warn!("{method} failed (retry {attempt}/{} in {backoff:?}): {soft}", self.max_retries);
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(Duration::from_secs(MAX_BACKOFF_SECS));
        }
    }

    async fn send_once(&self, method: &str, params: &Value) -> Result<Value> {
        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DreamError::Rpc {
                code: 429,
                message: "rate limited".to_string(),
            });
        }

        let body: RpcResponse = resp.error_for_status()?.json().await?;
        if let Some(err) = body.error {
            return Err(DreamError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        let result = body
            .result
            .ok_or_else(|| DreamError::Decode(format!("empty result from {method}")))?;
        debug!("{method} -> {result}");
        Ok(result)
    }

    fn call_params(&self, data: &[u8]) -> Value {
        json!([
            {
                "to": self.contract.to_string(),
                "data": format!("0x{}", hex::encode(data)),
            },
            "latest"
        ])
    }

    fn transaction_params(&self, request: &WriteRequest) -> Value {
        let dream_id = U256::from(request.dream_id);
        let signature = abi::write_signature(request.action);
        let (data, value) = match request.action {
            Action::Fund => (abi::encode_call(signature, &[dream_id]), request.amount),
            Action::Withdraw => (
                abi::encode_call(signature, &[dream_id, request.amount]),
                U256::ZERO,
            ),
        };
        json!([
            {
                "from": request.caller.to_string(),
                "to": self.contract.to_string(),
                "value": format!("0x{value:x}"),
                "data": format!("0x{}", hex::encode(data)),
            }
        ])
    }
}

fn is_retryable(err: &DreamError) -> bool {
    match err {
        DreamError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        DreamError::Rpc { code, .. } => !DreamError::is_hard_rpc_error(*code),
        _ => false,
    }
}

fn parse_hex_data(value: &Value) -> Result<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| DreamError::Decode(format!("expected hex string, got {value}")))?;
    hex::decode(s.trim_start_matches("0x")).map_err(|e| DreamError::Decode(e.to_string()))
}

fn parse_quantity(value: &Value) -> Result<u64> {
    let s = value
        .as_str()
        .ok_or_else(|| DreamError::Decode(format!("expected quantity, got {value}")))?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| DreamError::Decode(format!("{s}: {e}")))
}

#[async_trait]
impl DreamSource for RpcDreamSource {
    async fn read(&self, dream_id: u64, field: Field) -> Result<FieldValue> {
        let data = abi::encode_call(field.getter(), &[U256::from(dream_id)]);
        let result = self
            .request("eth_call", self.call_params(&data), Retry::Yes)
            .await?;
        abi::decode_field(field, &parse_hex_data(&result)?)
    }

    async fn write(&self, request: &WriteRequest) -> Result<String> {
        let result = self
            .request("eth_sendTransaction", self.transaction_params(request), Retry::No)
            .await?;
        result
            .as_str()
            .map(String::from)
            .ok_or_else(|| DreamError::Decode(format!("expected tx hash, got {result}")))
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
