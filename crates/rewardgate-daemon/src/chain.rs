//! Read-only chain access over JSON-RPC.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rewardgate_core::address::WalletAddress;
use rewardgate_core::error::{ClaimError, ClaimResult};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::ChainConfig;
use crate::upstream::{http_client, UpstreamError};

const SERVICE: &str = "chain rpc";

#[async_trait]
pub trait ChainInspector: Send + Sync {
    /// Deployed bytecode at `address`; empty for externally owned accounts.
    async fn code_at(&self, address: &WalletAddress) -> Result<Vec<u8>, UpstreamError>;

    async fn call(&self, contract: &WalletAddress, calldata: &[u8]) -> Result<Vec<u8>, UpstreamError>;
}

pub struct JsonRpcChainClient {
    http: reqwest::Client,
    rpc_url: String,
    next_id: AtomicU64,
}

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

impl JsonRpcChainClient {
    pub fn new(cfg: &ChainConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: http_client(cfg.timeout_ms).map_err(UpstreamError::transport(SERVICE))?,
            rpc_url: cfg.rpc_url.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Vec<u8>, UpstreamError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        let resp: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(UpstreamError::transport(SERVICE))?
            .json()
            .await
            .map_err(UpstreamError::transport(SERVICE))?;

        if let Some(err) = resp.error {
            return Err(UpstreamError::Rejected {
                service: SERVICE,
                detail: format!("{method}: {} ({})", err.message, err.code),
            });
        }
        match resp.result {
            Some(Value::String(hex_data)) => decode_hex_data(&hex_data),
            _ => Err(UpstreamError::malformed(
                SERVICE,
                format!("{method} returned no hex result"),
            )),
        }
    }
}

fn decode_hex_data(raw: &str) -> Result<Vec<u8>, UpstreamError> {
    let body = raw
        .strip_prefix("0x")
        .ok_or_else(|| UpstreamError::malformed(SERVICE, "result missing 0x prefix"))?;
    hex::decode(body).map_err(|_| UpstreamError::malformed(SERVICE, "result is not hex"))
}

#[async_trait]
impl ChainInspector for JsonRpcChainClient {
    async fn code_at(&self, address: &WalletAddress) -> Result<Vec<u8>, UpstreamError> {
        self.request("eth_getCode", json!([address.normalized(), "latest"]))
            .await
    }

    async fn call(&self, contract: &WalletAddress, calldata: &[u8]) -> Result<Vec<u8>, UpstreamError> {
        let tx = json!({
            "to": contract.normalized(),
            "data": format!("0x{}", hex::encode(calldata)),
        });
        self.request("eth_call", json!([tx, "latest"])).await
    }
}

/// True iff the first ABI word of `ret` is a uint256 >= `min`.
pub fn first_word_at_least(ret: &[u8], min: u128) -> Result<bool, UpstreamError> {
    let word = ret
        .get(..32)
        .ok_or_else(|| UpstreamError::malformed(SERVICE, "call returned fewer than 32 bytes"))?;
    if word[..16].iter().any(|b| *b != 0) {
        return Ok(true);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low) >= min)
}

/// Chain table keyed by selector, with a default for requests and tracks
/// that name none.
#[derive(Clone)]
pub struct ChainRegistry {
    chains: BTreeMap<String, Arc<dyn ChainInspector>>,
    default_chain: String,
}

impl ChainRegistry {
    pub fn new(chains: BTreeMap<String, Arc<dyn ChainInspector>>, default_chain: String) -> Self {
        Self {
            chains,
            default_chain,
        }
    }

    pub fn from_config(
        chains: &BTreeMap<String, ChainConfig>,
        default_chain: &str,
    ) -> Result<Self, UpstreamError> {
        let mut out: BTreeMap<String, Arc<dyn ChainInspector>> = BTreeMap::new();
        for (id, cfg) in chains {
            out.insert(id.clone(), Arc::new(JsonRpcChainClient::new(cfg)?));
        }
        Ok(Self::new(out, default_chain.to_string()))
    }

    /// Picks the chain for a claim. A track bound to one chain refuses
    /// requests naming another.
    pub fn resolve<'a>(
        &'a self,
        requested: Option<&'a str>,
        bound: Option<&'a str>,
    ) -> ClaimResult<(&'a str, &'a dyn ChainInspector)> {
        let id = match (requested, bound) {
            (Some(r), Some(b)) if r != b => {
                return Err(ClaimError::validation("chain does not match track"));
            }
            (Some(r), _) => r,
            (None, Some(b)) => b,
            (None, None) => self.default_chain.as_str(),
        };
        self.chains
            .get_key_value(id)
            .map(|(id, inspector)| (id.as_str(), inspector.as_ref()))
            .ok_or_else(|| ClaimError::validation("unknown chain"))
    }
}
