//! JSON-RPC client for a Solana-compatible node with the DAS asset API.

use super::{
    Asset, AssetRpc, Attribute, BlockhashInfo, Confirmation, LedgerRpc, SignatureInfo,
    TransactionDetail,
};
use crate::error::{Error, Result};
use crate::types::{Lamports, Pubkey, TxSignature};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Page size for `getAssetsByOwner`.
const ASSET_PAGE_LIMIT: usize = 1000;

/// Configuration for the HTTP RPC client.
#[derive(Debug, Clone)]
pub struct HttpRpcConfig {
    /// JSON-RPC endpoint.
    pub url: String,
    /// Commitment level for reads and confirmation (`processed`,
    /// `confirmed` or `finalized`).
    pub commitment: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Delay between signature status polls while confirming.
    pub poll_interval: Duration,
}

impl Default for HttpRpcConfig {
    fn default() -> Self {
        Self {
            url: "https://api.devnet.solana.com".to_string(),
            commitment: "confirmed".to_string(),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Ledger and asset client speaking JSON-RPC 2.0 over HTTP.
pub struct HttpRpcClient {
    config: HttpRpcConfig,
    http: reqwest::Client,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    transaction: RawTxBody,
    meta: Option<RawMeta>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTxBody {
    signatures: Vec<TxSignature>,
    message: RawMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    account_keys: Vec<Pubkey>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMeta {
    err: Option<Value>,
    #[serde(default)]
    pre_balances: Vec<u64>,
    #[serde(default)]
    post_balances: Vec<u64>,
    #[serde(default)]
    loaded_addresses: Option<RawLoadedAddresses>,
}

#[derive(Deserialize, Default)]
struct RawLoadedAddresses {
    #[serde(default)]
    writable: Vec<Pubkey>,
    #[serde(default)]
    readonly: Vec<Pubkey>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSignatureStatus {
    err: Option<Value>,
    confirmation_status: Option<String>,
}

#[derive(Deserialize)]
struct RawAssetPage {
    #[serde(default)]
    items: Vec<RawAsset>,
}

#[derive(Deserialize)]
struct RawAsset {
    id: Pubkey,
    #[serde(default)]
    content: Option<RawContent>,
    #[serde(default)]
    grouping: Vec<RawGroup>,
    ownership: RawOwnership,
}

#[derive(Deserialize)]
struct RawContent {
    #[serde(default)]
    metadata: Option<RawMetadata>,
}

#[derive(Deserialize)]
struct RawMetadata {
    #[serde(default)]
    attributes: Vec<Attribute>,
}

#[derive(Deserialize)]
struct RawGroup {
    group_key: String,
    group_value: String,
}

#[derive(Deserialize)]
struct RawOwnership {
    owner: Pubkey,
}

impl From<RawTransaction> for TransactionDetail {
    fn from(raw: RawTransaction) -> Self {
        let mut account_keys = raw.transaction.message.account_keys;
        let (err, pre_balances, post_balances) = match raw.meta {
            Some(meta) => {
                let loaded = meta.loaded_addresses.unwrap_or_default();
                account_keys.extend(loaded.writable);
                account_keys.extend(loaded.readonly);
                (meta.err, meta.pre_balances, meta.post_balances)
            }
            // Without meta the outcome is unknown; treat as failed.
            None => (Some(json!("missing transaction meta")), Vec::new(), Vec::new()),
        };

        Self {
            signatures: raw.transaction.signatures,
            account_keys,
            err,
            pre_balances,
            post_balances,
        }
    }
}

impl From<RawAsset> for Asset {
    fn from(raw: RawAsset) -> Self {
        let collection = raw
            .grouping
            .iter()
            .find(|g| g.group_key == "collection")
            .and_then(|g| match g.group_value.parse() {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!("Ignoring malformed collection on asset {}: {e}", raw.id);
                    None
                }
            });
        let attributes = raw
            .content
            .and_then(|c| c.metadata)
            .map(|m| m.attributes)
            .unwrap_or_default();

        Self {
            id: raw.id,
            owner: raw.ownership.owner,
            collection,
            attributes,
        }
    }
}

/// Rank of a commitment level; unknown levels rank lowest.
fn commitment_rank(level: &str) -> u8 {
    match level {
        "finalized" => 3,
        "confirmed" => 2,
        "processed" => 1,
        _ => 0,
    }
}

impl HttpRpcClient {
    /// Create a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: HttpRpcConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        debug!("RPC client targeting {}", config.url);
        Ok(Self {
            config,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self.http.post(&self.config.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("{method}: HTTP {status}")));
        }

        let envelope: RpcEnvelope = response.json().await?;
        if let Some(err) = envelope.error {
            return Err(Error::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(envelope.result)
            .map_err(|e| Error::Serialization(format!("{method}: {e}")))
    }

    async fn block_height(&self) -> Result<u64> {
        self.call(
            "getBlockHeight",
            json!([{ "commitment": self.config.commitment }]),
        )
        .await
    }
}

#[async_trait]
impl LedgerRpc for HttpRpcClient {
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>> {
        self.call(
            "getSignaturesForAddress",
            json!([address.to_string(), { "limit": limit, "commitment": self.config.commitment }]),
        )
        .await
    }

    async fn get_transaction(&self, signature: &TxSignature) -> Result<Option<TransactionDetail>> {
        let raw: Option<RawTransaction> = self
            .call(
                "getTransaction",
                json!([
                    signature.as_str(),
                    {
                        "encoding": "json",
                        "maxSupportedTransactionVersion": 0,
                        "commitment": self.config.commitment,
                    }
                ]),
            )
            .await?;
        Ok(raw.map(TransactionDetail::from))
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<Lamports> {
        let balance: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.to_string(), { "commitment": self.config.commitment }]),
            )
            .await?;
        Ok(Lamports(balance.value))
    }

    async fn latest_blockhash(&self) -> Result<BlockhashInfo> {
        let latest: WithContext<BlockhashInfo> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.config.commitment }]),
            )
            .await?;
        Ok(latest.value)
    }

    async fn confirm_transaction(
        &self,
        signature: &TxSignature,
        blockhash: &BlockhashInfo,
    ) -> Result<Confirmation> {
        let target = commitment_rank(&self.config.commitment).max(1);

        loop {
            let statuses: WithContext<Vec<Option<RawSignatureStatus>>> = self
                .call(
                    "getSignatureStatuses",
                    json!([[signature.as_str()], { "searchTransactionHistory": false }]),
                )
                .await?;

            if let Some(Some(status)) = statuses.value.into_iter().next() {
                if let Some(err) = status.err {
                    return Ok(Confirmation {
                        err: Some(err.to_string()),
                    });
                }
                let reached = status
                    .confirmation_status
                    .as_deref()
                    .map_or(0, commitment_rank);
                if reached >= target {
                    debug!("Transaction {} reached {}", signature.short(), self.config.commitment);
                    return Ok(Confirmation::default());
                }
            }

            let height = self.block_height().await?;
            if height > blockhash.last_valid_block_height {
                return Err(Error::TransactionFailed(format!(
                    "signature {} expired: block height {height} exceeded {}",
                    signature.short(),
                    blockhash.last_valid_block_height
                )));
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl AssetRpc for HttpRpcClient {
    async fn assets_by_owner(&self, owner: &Pubkey) -> Result<Vec<Asset>> {
        let mut assets = Vec::new();
        let mut page = 1usize;

        loop {
            let batch: RawAssetPage = self
                .call(
                    "getAssetsByOwner",
                    json!({
                        "ownerAddress": owner.to_string(),
                        "page": page,
                        "limit": ASSET_PAGE_LIMIT,
                    }),
                )
                .await?;

            let count = batch.items.len();
            assets.extend(batch.items.into_iter().map(Asset::from));
            if count < ASSET_PAGE_LIMIT {
                break;
            }
            page += 1;
        }

        Ok(assets)
    }

    async fn get_asset(&self, mint: &Pubkey) -> Result<Option<Asset>> {
        match self
            .call::<Option<RawAsset>>("getAsset", json!({ "id": mint.to_string() }))
            .await
        {
            Ok(raw) => Ok(raw.map(Asset::from)),
            Err(Error::Rpc { message, .. }) if message.to_lowercase().contains("not found") => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
