//! Collaborator interfaces for ledger and asset lookups.
//!
//! The verifiers only talk to the network through [`LedgerRpc`] and
//! [`AssetRpc`]. [`HttpRpcClient`] implements both over JSON-RPC; tests
//! substitute in-memory fakes.

mod http;

pub use http::{HttpRpcClient, HttpRpcConfig};

use crate::error::{Error, Result};
use crate::types::{Lamports, Pubkey, TxSignature};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Signature metadata from an address history lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    /// Transaction signature.
    pub signature: TxSignature,
    /// Slot the transaction landed in.
    #[serde(default)]
    pub slot: u64,
    /// Execution error, if the transaction failed.
    #[serde(default)]
    pub err: Option<serde_json::Value>,
}

/// The parts of a confirmed transaction the verifiers inspect.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionDetail {
    /// Transaction signatures; the first identifies the transaction.
    pub signatures: Vec<TxSignature>,
    /// Every account the transaction touches, static keys first, then
    /// keys loaded from address lookup tables.
    pub account_keys: Vec<Pubkey>,
    /// Execution error, `None` on success.
    pub err: Option<serde_json::Value>,
    /// Account balances before execution, indexed like `account_keys`.
    pub pre_balances: Vec<u64>,
    /// Account balances after execution, indexed like `account_keys`.
    pub post_balances: Vec<u64>,
}

impl TransactionDetail {
    /// Signature identifying this transaction.
    #[must_use]
    pub fn id(&self) -> Option<&TxSignature> {
        self.signatures.first()
    }

    /// Amount deducted from the account at `index` (pre minus post).
    ///
    /// Missing balances read as zero; a balance increase reads as zero.
    #[must_use]
    pub fn deducted(&self, index: usize) -> Lamports {
        let pre = self.pre_balances.get(index).copied().unwrap_or(0);
        let post = self.post_balances.get(index).copied().unwrap_or(0);
        Lamports(pre.saturating_sub(post))
    }

    /// Whether `account` participates in the transaction.
    #[must_use]
    pub fn involves(&self, account: &Pubkey) -> bool {
        self.account_keys.contains(account)
    }

    /// Whether the transaction executed without error.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.err.is_none()
    }
}

/// A recent blockhash and the last block height it stays valid for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockhashInfo {
    /// Base58 blockhash.
    pub blockhash: String,
    /// Block height after which transactions using it expire.
    pub last_valid_block_height: u64,
}

/// Outcome of waiting for a transaction to confirm.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Confirmation {
    /// Execution error rendered as text; `None` on success.
    pub err: Option<String>,
}

/// A metadata attribute on a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub trait_type: String,
    /// Attribute value; numbers and strings both occur in the wild.
    pub value: serde_json::Value,
}

/// A token as reported by the asset index.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// Mint address.
    pub id: Pubkey,
    /// Current owner.
    pub owner: Pubkey,
    /// Verified collection the token belongs to, if any.
    pub collection: Option<Pubkey>,
    /// Off-chain metadata attributes.
    pub attributes: Vec<Attribute>,
}

impl Asset {
    /// Whether the token carries `trait_type` with a numeric value equal to
    /// `expected`.
    ///
    /// Only JSON numbers match; a string such as `"101"` does not.
    #[must_use]
    pub fn has_attribute(&self, trait_type: &str, expected: u64) -> bool {
        self.attributes.iter().any(|attr| {
            attr.trait_type == trait_type && attr.value.as_u64() == Some(expected)
        })
    }
}

/// Ledger queries and transaction confirmation.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Most recent signatures involving `address`, newest first.
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>>;

    /// Full transaction detail, `None` if the node does not know it.
    async fn get_transaction(&self, signature: &TxSignature) -> Result<Option<TransactionDetail>>;

    /// Current balance of `address`.
    async fn get_balance(&self, address: &Pubkey) -> Result<Lamports>;

    /// Latest blockhash for building a transaction.
    async fn latest_blockhash(&self) -> Result<BlockhashInfo>;

    /// Wait until `signature` confirms or its blockhash expires.
    async fn confirm_transaction(
        &self,
        signature: &TxSignature,
        blockhash: &BlockhashInfo,
    ) -> Result<Confirmation>;
}

/// Token ownership queries.
#[async_trait]
pub trait AssetRpc: Send + Sync {
    /// Every token currently held by `owner`.
    async fn assets_by_owner(&self, owner: &Pubkey) -> Result<Vec<Asset>>;

    /// A single token by mint address.
    async fn get_asset(&self, mint: &Pubkey) -> Result<Option<Asset>>;
}

/// Race `fut` against a timer; the loser is dropped.
///
/// # Errors
///
/// Returns [`Error::Timeout`] naming `what` if the timer wins, otherwise
/// whatever `fut` resolves to.
pub async fn with_timeout<T, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(what.to_string()))?
}
