//! Paying for a course: balance check, transfer, confirmation, cache write.
//!
//! The three on-chain steps run in sequence with no recorded intermediate
//! state. The buyer pays the course price plus the processing fee in one
//! transfer. The cache write after confirmation is the only record the
//! purchase verifier can re-confirm cheaply; a rescan matches on the
//! payer's balance drop, which includes both fees.

use crate::catalog::{Course, CourseId};
use crate::error::{Error, Result};
use crate::payment::cache::{PurchaseCache, PurchaseRecord};
use crate::rpc::{BlockhashInfo, LedgerRpc};
use crate::types::{now_millis, Lamports, Pubkey, TxSignature};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// Default processing fee charged to the buyer on top of the course price.
pub const DEFAULT_PROCESSING_FEE: Lamports = Lamports(1_000_000);

/// A native-token transfer for the wallet to sign and submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Paying account; also the fee payer.
    pub from: Pubkey,
    /// Receiving account.
    pub to: Pubkey,
    /// Amount moved.
    pub lamports: Lamports,
}

/// The connected wallet.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Account the wallet signs for.
    fn identity(&self) -> Pubkey;

    /// Sign and submit `transfer` against `blockhash`.
    ///
    /// Returns once submitted; the transaction may not be confirmed yet.
    async fn send_transfer(
        &self,
        transfer: &TransferRequest,
        blockhash: &BlockhashInfo,
    ) -> Result<TxSignature>;
}

/// Configuration for the checkout flow.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Account receiving payments.
    pub merchant: Option<Pubkey>,
    /// Fee transferred to the merchant together with the price. Zero
    /// charges the bare course price.
    pub processing_fee: Lamports,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            merchant: None,
            processing_fee: DEFAULT_PROCESSING_FEE,
        }
    }
}

/// A confirmed course payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    /// Purchased course.
    pub course_id: CourseId,
    /// Confirmed transaction.
    pub signature: TxSignature,
    /// Course price charged.
    pub price: Lamports,
    /// Processing fee charged.
    pub processing_fee: Lamports,
    /// Total transferred: price plus processing fee.
    pub amount: Lamports,
}

/// Runs course payments through a connected wallet.
pub struct Checkout {
    rpc: Arc<dyn LedgerRpc>,
    cache: PurchaseCache,
    config: CheckoutConfig,
}

impl Checkout {
    /// Create a checkout over the given ledger client and cache.
    #[must_use]
    pub fn new(rpc: Arc<dyn LedgerRpc>, cache: PurchaseCache, config: CheckoutConfig) -> Self {
        Self { rpc, cache, config }
    }

    /// Pay for `course` from `wallet`, transferring the course price plus
    /// the processing fee to the merchant.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no merchant is configured
    /// - [`Error::InsufficientBalance`] if the wallet cannot cover price plus fee
    /// - [`Error::TransactionFailed`] if the transfer lands with an error or expires
    /// - RPC and wallet errors from any step
    ///
    /// Nothing is cached unless the payment confirms.
    pub async fn purchase(&self, wallet: &dyn Wallet, course: &Course) -> Result<PurchaseReceipt> {
        let result = self.run(wallet, course).await;
        if let Err(ref e) = result {
            error!("Payment for course {} failed: {e}", course.id);
        }
        result
    }

    async fn run(&self, wallet: &dyn Wallet, course: &Course) -> Result<PurchaseReceipt> {
        let merchant = self
            .config
            .merchant
            .ok_or_else(|| Error::Config("Merchant wallet not configured".to_string()))?;
        let payer = wallet.identity();

        let available = self.rpc.get_balance(&payer).await?;
        let total = course
            .price
            .checked_add(self.config.processing_fee)
            .ok_or_else(|| Error::InvalidAmount(format!("price of course {} overflows", course.id)))?;
        if available < total {
            return Err(Error::InsufficientBalance {
                required: total,
                available,
            });
        }

        let blockhash = self.rpc.latest_blockhash().await?;
        let transfer = TransferRequest {
            from: payer,
            to: merchant,
            lamports: total,
        };
        let signature = wallet.send_transfer(&transfer, &blockhash).await?;
        info!("Transaction sent: {}", signature.short());

        let confirmation = self.rpc.confirm_transaction(&signature, &blockhash).await?;
        if let Some(err) = confirmation.err {
            return Err(Error::TransactionFailed(err));
        }

        info!(
            "Payment confirmed for course {}: {}...",
            course.id,
            signature.short()
        );
        self.cache.cache(PurchaseRecord {
            owner: Some(payer),
            course_id: course.id,
            signature: signature.clone(),
            timestamp: now_millis(),
            amount: total,
        });

        Ok(PurchaseReceipt {
            course_id: course.id,
            signature,
            price: course.price,
            processing_fee: self.config.processing_fee,
            amount: total,
        })
    }
}
