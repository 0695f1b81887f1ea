//! Persisted ownership cache for confirmed entitlements.
//!
//! Caches the evidence (a purchase signature or an NFT mint) behind each
//! confirmed entitlement, so repeat checks can take the fast path instead of
//! rescanning transaction history. Entries are keyed by `(owner, course)`.

use crate::catalog::CourseId;
use crate::storage::KeyValueStore;
use crate::types::{Lamports, Pubkey, TxSignature};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error};

/// Storage key for purchase records.
pub const PURCHASE_STORAGE_KEY: &str = "purchased_courses";

/// Storage key for NFT records.
pub const NFT_STORAGE_KEY: &str = "course_nfts";

/// A record the ownership cache can hold.
pub trait CachedRecord: Serialize + DeserializeOwned + Clone {
    /// Key under which the record list is stored.
    const STORAGE_KEY: &'static str;

    /// Identity the entitlement belongs to; `None` for records written
    /// before entries were scoped per identity.
    fn owner(&self) -> Option<&Pubkey>;

    /// Course the entitlement grants.
    fn course_id(&self) -> CourseId;

    /// Whether this record is evidence for `owner` holding `course_id`.
    fn matches(&self, owner: &Pubkey, course_id: CourseId) -> bool {
        self.course_id() == course_id && self.owner() == Some(owner)
    }
}

/// Evidence of a confirmed payment for a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    /// Paying identity.
    #[serde(default)]
    pub owner: Option<Pubkey>,
    /// Purchased course.
    pub course_id: CourseId,
    /// Signature of the qualifying transaction.
    pub signature: TxSignature,
    /// When the record was created, in ms since the epoch.
    pub timestamp: i64,
    /// Amount paid.
    pub amount: Lamports,
}

impl CachedRecord for PurchaseRecord {
    const STORAGE_KEY: &'static str = PURCHASE_STORAGE_KEY;

    fn owner(&self) -> Option<&Pubkey> {
        self.owner.as_ref()
    }

    fn course_id(&self) -> CourseId {
        self.course_id
    }
}

/// Evidence of holding a course NFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftRecord {
    /// Holding identity.
    #[serde(default)]
    pub owner: Option<Pubkey>,
    /// Mint address of the course token.
    pub mint_address: Pubkey,
    /// Course the token grants.
    pub course_id: CourseId,
    /// When the record was created, in ms since the epoch.
    pub timestamp: i64,
}

impl CachedRecord for NftRecord {
    const STORAGE_KEY: &'static str = NFT_STORAGE_KEY;

    fn owner(&self) -> Option<&Pubkey> {
        self.owner.as_ref()
    }

    fn course_id(&self) -> CourseId {
        self.course_id
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries added.
    pub additions: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Best-effort persisted list of records of one kind.
///
/// Reads never fail: a missing or undecodable entry is an empty list.
/// Writes are read-modify-write and not transactional, so overlapping
/// writers race and the last one wins. The cache is advisory; a lost
/// write only costs a rescan.
pub struct OwnershipCache<R> {
    store: Arc<dyn KeyValueStore>,
    stats: Arc<Mutex<CacheStats>>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for OwnershipCache<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            stats: Arc::clone(&self.stats),
            _record: PhantomData,
        }
    }
}

/// Cache of purchase records.
pub type PurchaseCache = OwnershipCache<PurchaseRecord>;

/// Cache of NFT records.
pub type NftCache = OwnershipCache<NftRecord>;

impl<R: CachedRecord> OwnershipCache<R> {
    /// Create a cache over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            stats: Arc::new(Mutex::new(CacheStats::default())),
            _record: PhantomData,
        }
    }

    /// All cached records.
    #[must_use]
    pub fn get_cached(&self) -> Vec<R> {
        let raw = match self.store.get_item(R::STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!("Error reading cache {}: {e}", R::STORAGE_KEY);
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            error!("Error decoding cache {}: {e}", R::STORAGE_KEY);
            Vec::new()
        })
    }

    /// Find the record proving `owner` holds `course_id`.
    #[must_use]
    pub fn find(&self, owner: &Pubkey, course_id: CourseId) -> Option<R> {
        let found = self
            .get_cached()
            .into_iter()
            .find(|r| r.matches(owner, course_id));

        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }

        found
    }

    /// Store `record`, replacing any record for the same owner and course.
    pub fn cache(&self, record: R) {
        let course_id = record.course_id();
        let mut records = self.get_cached();
        records.retain(|r| {
            !(r.course_id() == course_id && r.owner().is_some() && r.owner() == record.owner())
        });
        records.push(record);

        let encoded = match serde_json::to_string(&records) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Error encoding cache {}: {e}", R::STORAGE_KEY);
                return;
            }
        };

        if let Err(e) = self.store.set_item(R::STORAGE_KEY, &encoded) {
            error!("Error writing cache {}: {e}", R::STORAGE_KEY);
            return;
        }

        debug!("Cached {} record for course {course_id}", R::STORAGE_KEY);
        self.stats.lock().additions += 1;
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }
}
