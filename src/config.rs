//! Configuration for studycake-entitlements.

use crate::error::{Error, Result};
use crate::payment::{
    CheckoutConfig, NftVerifierConfig, PurchaseVerifierConfig, DEFAULT_SIGNATURE_LIMIT,
};
use crate::rpc::HttpRpcConfig;
use crate::types::{Lamports, Pubkey};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementConfig {
    /// RPC endpoint configuration.
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Merchant (payment recipient) configuration.
    #[serde(default)]
    pub merchant: MerchantConfig,

    /// NFT collection configuration.
    #[serde(default)]
    pub nft: NftConfig,

    /// Ownership cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Batch query configuration.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// RPC endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL.
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Commitment level for reads and confirmation.
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Bound on each verification fetch, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// HTTP request timeout, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Signature status poll interval while confirming, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Number of recent signatures scanned for a payment.
    #[serde(default = "default_signature_limit")]
    pub signature_limit: usize,
}

/// Merchant configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantConfig {
    /// Base58 account receiving course payments.
    #[serde(default)]
    pub address: Option<String>,

    /// Fee charged on top of the course price at checkout, in SOL.
    #[serde(default = "default_processing_fee")]
    pub processing_fee: String,
}

/// NFT collection configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NftConfig {
    /// Base58 collection address of course tokens.
    #[serde(default)]
    pub collection: Option<String>,
}

/// Ownership cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding cached records.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

/// Batch query configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum purchase checks in flight for concurrent batch queries.
    #[serde(default = "default_batch_concurrency")]
    pub concurrency: usize,
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            merchant: MerchantConfig::default(),
            nft: NftConfig::default(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: default_commitment(),
            fetch_timeout_secs: default_fetch_timeout(),
            request_timeout_secs: default_request_timeout(),
            poll_interval_ms: default_poll_interval(),
            signature_limit: default_signature_limit(),
        }
    }
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            address: None,
            processing_fee: default_processing_fee(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_batch_concurrency(),
        }
    }
}

fn default_rpc_url() -> String {
    "https://api.devnet.solana.com".to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

const fn default_fetch_timeout() -> u64 {
    10
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_poll_interval() -> u64 {
    500
}

const fn default_signature_limit() -> usize {
    DEFAULT_SIGNATURE_LIMIT
}

fn default_processing_fee() -> String {
    "0.001".to_string()
}

fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "studycake")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".studycake"))
}

const fn default_batch_concurrency() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse an optional address; blank counts as unset.
fn parse_address(field: &str, value: Option<&str>) -> Result<Option<Pubkey>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{field}: {e}"))),
    }
}

impl EntitlementConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The merchant account, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is set but is not a valid account.
    pub fn merchant_address(&self) -> Result<Option<Pubkey>> {
        parse_address("merchant.address", self.merchant.address.as_deref())
    }

    /// The course collection, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is set but is not a valid account.
    pub fn collection_address(&self) -> Result<Option<Pubkey>> {
        parse_address("nft.collection", self.nft.collection.as_deref())
    }

    /// Bound on each verification fetch.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.fetch_timeout_secs)
    }

    /// Settings for the JSON-RPC client.
    #[must_use]
    pub fn http_rpc_config(&self) -> HttpRpcConfig {
        HttpRpcConfig {
            url: self.rpc.url.clone(),
            commitment: self.rpc.commitment.clone(),
            request_timeout: Duration::from_secs(self.rpc.request_timeout_secs),
            poll_interval: Duration::from_millis(self.rpc.poll_interval_ms),
        }
    }

    /// Settings for the purchase verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the merchant address is malformed.
    pub fn purchase_verifier_config(&self) -> Result<PurchaseVerifierConfig> {
        Ok(PurchaseVerifierConfig {
            merchant: self.merchant_address()?,
            fetch_timeout: self.fetch_timeout(),
            signature_limit: self.rpc.signature_limit,
        })
    }

    /// Settings for the NFT verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection address is malformed.
    pub fn nft_verifier_config(&self) -> Result<NftVerifierConfig> {
        Ok(NftVerifierConfig {
            collection: self.collection_address()?,
            fetch_timeout: self.fetch_timeout(),
        })
    }

    /// Settings for the checkout flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the merchant address or processing fee is malformed.
    pub fn checkout_config(&self) -> Result<CheckoutConfig> {
        let processing_fee = Lamports::from_sol_str(&self.merchant.processing_fee)
            .map_err(|e| Error::Config(format!("merchant.processing_fee: {e}")))?;
        Ok(CheckoutConfig {
            merchant: self.merchant_address()?,
            processing_fee,
        })
    }
}
