//! Wiring of verifiers, caches and collaborators from configuration.

use crate::catalog::{self, CourseId};
use crate::config::EntitlementConfig;
use crate::error::Result;
use crate::payment::{Checkout, NftCache, NftVerifier, PurchaseCache, PurchaseVerifier};
use crate::rpc::{AssetRpc, HttpRpcClient, LedgerRpc};
use crate::storage::{FileStore, KeyValueStore};
use crate::types::Pubkey;
use std::sync::Arc;
use tracing::info;

/// Builder for an [`EntitlementService`].
///
/// Collaborators not supplied explicitly are created from the
/// configuration: a JSON-RPC client for ledger and asset lookups and a
/// file store under the configured cache directory.
pub struct EntitlementServiceBuilder {
    config: EntitlementConfig,
    ledger: Option<Arc<dyn LedgerRpc>>,
    assets: Option<Arc<dyn AssetRpc>>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl EntitlementServiceBuilder {
    /// Create a new builder with the given configuration.
    #[must_use]
    pub fn new(config: EntitlementConfig) -> Self {
        Self {
            config,
            ledger: None,
            assets: None,
            store: None,
        }
    }

    /// Use `ledger` for transaction lookups.
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerRpc>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Use `assets` for token lookups.
    #[must_use]
    pub fn with_assets(mut self, assets: Arc<dyn AssetRpc>) -> Self {
        self.assets = Some(assets);
        self
    }

    /// Persist caches in `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the service.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured address is malformed, the HTTP
    /// client cannot be built, or the cache directory cannot be created.
    pub fn build(self) -> Result<EntitlementService> {
        let purchase_config = self.config.purchase_verifier_config()?;
        let nft_config = self.config.nft_verifier_config()?;
        let checkout_config = self.config.checkout_config()?;

        let (ledger, assets) = match (self.ledger, self.assets) {
            (Some(ledger), Some(assets)) => (ledger, assets),
            (ledger, assets) => {
                let http = Arc::new(HttpRpcClient::new(self.config.http_rpc_config())?);
                info!("Using RPC endpoint {}", http.url());
                let http_ledger: Arc<dyn LedgerRpc> = http.clone();
                let http_assets: Arc<dyn AssetRpc> = http;
                (
                    ledger.unwrap_or(http_ledger),
                    assets.unwrap_or(http_assets),
                )
            }
        };

        let store: Arc<dyn KeyValueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FileStore::open(&self.config.cache.dir)?),
        };

        let purchase_cache = PurchaseCache::new(Arc::clone(&store));
        let nft_cache = NftCache::new(store);

        Ok(EntitlementService {
            purchases: PurchaseVerifier::new(
                Arc::clone(&ledger),
                purchase_cache.clone(),
                purchase_config,
            ),
            nfts: NftVerifier::new(assets, nft_cache, nft_config),
            checkout: Checkout::new(ledger, purchase_cache, checkout_config),
            config: self.config,
        })
    }
}

/// Entitlement checks and checkout over one set of collaborators.
pub struct EntitlementService {
    config: EntitlementConfig,
    purchases: PurchaseVerifier,
    nfts: NftVerifier,
    checkout: Checkout,
}

impl EntitlementService {
    /// Purchase verifier.
    #[must_use]
    pub fn purchases(&self) -> &PurchaseVerifier {
        &self.purchases
    }

    /// NFT ownership verifier.
    #[must_use]
    pub fn nfts(&self) -> &NftVerifier {
        &self.nfts
    }

    /// Checkout flow.
    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.checkout
    }

    /// Configuration the service was built from.
    #[must_use]
    pub fn config(&self) -> &EntitlementConfig {
        &self.config
    }

    /// Catalog courses `identity` has purchased, checked with the
    /// configured concurrency.
    pub async fn purchased_catalog_courses(&self, identity: &Pubkey) -> Vec<CourseId> {
        let ids: Vec<CourseId> = catalog::all().iter().map(|c| c.id).collect();
        self.purchases
            .get_purchased_courses_concurrent(
                identity,
                &ids,
                &catalog::price_table(),
                self.config.batch.concurrency,
            )
            .await
    }
}
