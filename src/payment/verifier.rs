//! Purchase verification against the merchant's on-chain payment history.
//!
//! This is the core entitlement check: a cached purchase is re-confirmed on
//! the fast path, otherwise recent transaction history is scanned for a
//! payment of the exact course price to the merchant.

use crate::catalog::CourseId;
use crate::payment::cache::{PurchaseCache, PurchaseRecord};
use crate::rpc::{with_timeout, LedgerRpc, TransactionDetail};
use crate::types::{now_millis, Lamports, Pubkey, TxSignature};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default bound on each transaction fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of recent signatures scanned.
pub const DEFAULT_SIGNATURE_LIMIT: usize = 100;

/// Configuration for the purchase verifier.
#[derive(Debug, Clone)]
pub struct PurchaseVerifierConfig {
    /// Account that receives course payments. Without it every check fails.
    pub merchant: Option<Pubkey>,
    /// Bound on each individual RPC fetch.
    pub fetch_timeout: Duration,
    /// How many recent signatures the fallback scan inspects.
    pub signature_limit: usize,
}

impl Default for PurchaseVerifierConfig {
    fn default() -> Self {
        Self {
            merchant: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            signature_limit: DEFAULT_SIGNATURE_LIMIT,
        }
    }
}

/// Outcome of an entitlement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementStatus {
    /// Cached evidence was re-confirmed on chain.
    CachedAsVerified,
    /// Fresh evidence was found and cached.
    Verified,
    /// No evidence of entitlement.
    NotEntitled,
    /// The check could not run because configuration is missing.
    Misconfigured,
}

impl EntitlementStatus {
    /// Returns true if the identity may access the course.
    #[must_use]
    pub fn is_entitled(&self) -> bool {
        matches!(
            self,
            EntitlementStatus::CachedAsVerified | EntitlementStatus::Verified
        )
    }
}

/// Whether `tx` is a successful payment of exactly `expected` to `merchant`.
///
/// The amount is read as the balance drop of the account at index 0, the
/// fee payer, and must match to the lamport.
#[must_use]
pub fn is_qualifying_payment(tx: &TransactionDetail, merchant: &Pubkey, expected: Lamports) -> bool {
    tx.involves(merchant) && tx.succeeded() && tx.deducted(0) == expected
}

/// Verifies course purchases and maintains the purchase cache.
pub struct PurchaseVerifier {
    rpc: Arc<dyn LedgerRpc>,
    cache: PurchaseCache,
    config: PurchaseVerifierConfig,
}

impl PurchaseVerifier {
    /// Create a verifier over the given ledger client and cache.
    #[must_use]
    pub fn new(rpc: Arc<dyn LedgerRpc>, cache: PurchaseCache, config: PurchaseVerifierConfig) -> Self {
        if config.merchant.is_none() {
            warn!("Merchant wallet not configured - purchase checks will fail");
        }
        Self { rpc, cache, config }
    }

    /// Whether `identity` has paid `expected_price` for `course_id`.
    ///
    /// Never fails; every error degrades to `false`.
    pub async fn verify_purchase(
        &self,
        identity: &Pubkey,
        course_id: CourseId,
        expected_price: Lamports,
    ) -> bool {
        self.check_purchase(identity, course_id, expected_price)
            .await
            .is_entitled()
    }

    /// Run the purchase check and report which path decided it.
    ///
    /// 1. Missing merchant configuration short-circuits.
    /// 2. A cached record is re-confirmed by fetching its transaction.
    /// 3. Otherwise recent history is scanned; the first qualifying
    ///    transaction in signature order is cached.
    pub async fn check_purchase(
        &self,
        identity: &Pubkey,
        course_id: CourseId,
        expected_price: Lamports,
    ) -> EntitlementStatus {
        let Some(merchant) = self.config.merchant else {
            error!("Merchant wallet not configured - cannot verify course {course_id}");
            return EntitlementStatus::Misconfigured;
        };

        if let Some(record) = self.cache.find(identity, course_id) {
            if self.reconfirm(&record.signature).await {
                debug!("Course {course_id} confirmed from cached purchase {}", record.signature.short());
                return EntitlementStatus::CachedAsVerified;
            }
        }

        let signatures = match with_timeout(
            self.config.fetch_timeout,
            "signature history",
            self.rpc
                .signatures_for_address(identity, self.config.signature_limit),
        )
        .await
        {
            Ok(signatures) => signatures,
            Err(e) => {
                error!("Error verifying purchase of course {course_id}: {e}");
                return EntitlementStatus::NotEntitled;
            }
        };

        debug!(
            "Scanning {} signatures of {identity} for course {course_id}",
            signatures.len()
        );

        let fetched = futures::future::join_all(
            signatures
                .iter()
                .map(|info| self.fetch_transaction(&info.signature)),
        )
        .await;

        let found = signatures
            .into_iter()
            .zip(fetched)
            .filter_map(|(info, tx)| tx.map(|tx| (info.signature, tx)))
            .find(|(_, tx)| is_qualifying_payment(tx, &merchant, expected_price));

        match found {
            Some((listed, tx)) => {
                let signature = tx.id().cloned().unwrap_or(listed);
                info!(
                    "Found payment {} for course {course_id} by {identity}",
                    signature.short()
                );
                self.cache.cache(PurchaseRecord {
                    owner: Some(*identity),
                    course_id,
                    signature,
                    timestamp: now_millis(),
                    amount: expected_price,
                });
                EntitlementStatus::Verified
            }
            None => {
                debug!("No qualifying payment for course {course_id} by {identity}");
                EntitlementStatus::NotEntitled
            }
        }
    }

    /// Courses in `course_ids` that `identity` has purchased, checked one
    /// at a time in input order.
    pub async fn get_purchased_courses(
        &self,
        identity: &Pubkey,
        course_ids: &[CourseId],
        prices: &HashMap<CourseId, Lamports>,
    ) -> Vec<CourseId> {
        let mut purchased = Vec::new();
        for &course_id in course_ids {
            if self.verify_priced(identity, course_id, prices).await {
                purchased.push(course_id);
            }
        }
        purchased
    }

    /// Like [`Self::get_purchased_courses`], with up to `max_in_flight`
    /// checks running at once. Output keeps input order. A limit of zero
    /// runs one check at a time.
    pub async fn get_purchased_courses_concurrent(
        &self,
        identity: &Pubkey,
        course_ids: &[CourseId],
        prices: &HashMap<CourseId, Lamports>,
        max_in_flight: usize,
    ) -> Vec<CourseId> {
        stream::iter(course_ids.iter().copied())
            .map(|course_id| async move {
                (course_id, self.verify_priced(identity, course_id, prices).await)
            })
            .buffered(max_in_flight.max(1))
            .filter_map(|(course_id, owned)| async move { owned.then_some(course_id) })
            .collect()
            .await
    }

    /// The purchase cache backing this verifier.
    #[must_use]
    pub fn cache(&self) -> &PurchaseCache {
        &self.cache
    }

    async fn verify_priced(
        &self,
        identity: &Pubkey,
        course_id: CourseId,
        prices: &HashMap<CourseId, Lamports>,
    ) -> bool {
        match prices.get(&course_id) {
            Some(&price) => self.verify_purchase(identity, course_id, price).await,
            None => {
                warn!("No price known for course {course_id}; treating as not purchased");
                false
            }
        }
    }

    async fn reconfirm(&self, signature: &TxSignature) -> bool {
        match with_timeout(
            self.config.fetch_timeout,
            "transaction verification",
            self.rpc.get_transaction(signature),
        )
        .await
        {
            Ok(Some(tx)) if tx.succeeded() => true,
            Ok(Some(_)) => {
                warn!("Cached transaction {} carries an execution error", signature.short());
                false
            }
            Ok(None) => {
                warn!("Cached transaction {} not found", signature.short());
                false
            }
            Err(e) => {
                warn!("Cached transaction verification failed: {e}");
                false
            }
        }
    }

    async fn fetch_transaction(&self, signature: &TxSignature) -> Option<TransactionDetail> {
        match with_timeout(
            self.config.fetch_timeout,
            "transaction fetch",
            self.rpc.get_transaction(signature),
        )
        .await
        {
            Ok(tx) => tx,
            Err(e) => {
                warn!("Error fetching transaction {}: {e}", signature.short());
                None
            }
        }
    }
}
