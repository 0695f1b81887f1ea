//! Course entitlement through NFT ownership.
//!
//! Same shape as purchase verification, but the evidence is a token from the
//! course collection whose metadata names the course, and the fast path
//! re-checks the cached mint's current owner.

use crate::catalog::CourseId;
use crate::payment::cache::{NftCache, NftRecord};
use crate::payment::verifier::{EntitlementStatus, DEFAULT_FETCH_TIMEOUT};
use crate::rpc::{with_timeout, Asset, AssetRpc};
use crate::types::{now_millis, Pubkey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Metadata attribute naming the course a token grants.
pub const COURSE_ID_TRAIT: &str = "courseId";

/// Configuration for the NFT verifier.
#[derive(Debug, Clone)]
pub struct NftVerifierConfig {
    /// Collection that course tokens belong to. Without it every check fails.
    pub collection: Option<Pubkey>,
    /// Bound on each RPC lookup.
    pub fetch_timeout: Duration,
}

impl Default for NftVerifierConfig {
    fn default() -> Self {
        Self {
            collection: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Whether `asset` is a course token for `course_id` in `collection`.
#[must_use]
pub fn is_course_token(asset: &Asset, collection: &Pubkey, course_id: CourseId) -> bool {
    asset.collection.as_ref() == Some(collection)
        && asset.has_attribute(COURSE_ID_TRAIT, u64::from(course_id))
}

/// Verifies course NFT ownership and maintains the NFT cache.
pub struct NftVerifier {
    rpc: Arc<dyn AssetRpc>,
    cache: NftCache,
    config: NftVerifierConfig,
}

impl NftVerifier {
    /// Create a verifier over the given asset client and cache.
    #[must_use]
    pub fn new(rpc: Arc<dyn AssetRpc>, cache: NftCache, config: NftVerifierConfig) -> Self {
        if config.collection.is_none() {
            warn!("Course collection not configured - NFT checks will fail");
        }
        Self { rpc, cache, config }
    }

    /// Whether `identity` holds a token for `course_id`. Never fails.
    pub async fn verify_nft_ownership(&self, identity: &Pubkey, course_id: CourseId) -> bool {
        self.check_nft_ownership(identity, course_id)
            .await
            .is_entitled()
    }

    /// Run the ownership check and report which path decided it.
    pub async fn check_nft_ownership(
        &self,
        identity: &Pubkey,
        course_id: CourseId,
    ) -> EntitlementStatus {
        let Some(collection) = self.config.collection else {
            error!("Course collection not configured - cannot verify course {course_id}");
            return EntitlementStatus::Misconfigured;
        };

        if let Some(record) = self.cache.find(identity, course_id) {
            if self.still_owned(identity, &record.mint_address).await {
                debug!("Course {course_id} confirmed from cached mint {}", record.mint_address);
                return EntitlementStatus::CachedAsVerified;
            }
        }

        let assets = match with_timeout(
            self.config.fetch_timeout,
            "wallet token lookup",
            self.rpc.assets_by_owner(identity),
        )
        .await
        {
            Ok(assets) => assets,
            Err(e) => {
                error!("Error verifying NFT ownership of course {course_id}: {e}");
                return EntitlementStatus::NotEntitled;
            }
        };

        match assets
            .iter()
            .find(|asset| is_course_token(asset, &collection, course_id))
        {
            Some(asset) => {
                info!("Found course {course_id} token {} held by {identity}", asset.id);
                self.cache.cache(NftRecord {
                    owner: Some(*identity),
                    mint_address: asset.id,
                    course_id,
                    timestamp: now_millis(),
                });
                EntitlementStatus::Verified
            }
            None => {
                debug!(
                    "None of {} tokens held by {identity} grant course {course_id}",
                    assets.len()
                );
                EntitlementStatus::NotEntitled
            }
        }
    }

    /// Courses in `course_ids` for which `identity` holds a token, checked
    /// one at a time in input order.
    pub async fn get_owned_course_nfts(
        &self,
        identity: &Pubkey,
        course_ids: &[CourseId],
    ) -> Vec<CourseId> {
        let mut owned = Vec::new();
        for &course_id in course_ids {
            if self.verify_nft_ownership(identity, course_id).await {
                owned.push(course_id);
            }
        }
        owned
    }

    /// The NFT cache backing this verifier.
    #[must_use]
    pub fn cache(&self) -> &NftCache {
        &self.cache
    }

    async fn still_owned(&self, identity: &Pubkey, mint: &Pubkey) -> bool {
        match with_timeout(
            self.config.fetch_timeout,
            "cached token verification",
            self.rpc.get_asset(mint),
        )
        .await
        {
            Ok(Some(asset)) if asset.owner == *identity => true,
            Ok(Some(asset)) => {
                warn!("Cached token {mint} now held by {}", asset.owner);
                false
            }
            Ok(None) => {
                warn!("Cached token {mint} not found");
                false
            }
            Err(e) => {
                warn!("Cached NFT verification failed: {e}");
                false
            }
        }
    }
}
