//! Course entitlement verification.
//!
//! Entitlement is never stored as a boolean. Only the evidence behind it is
//! cached, and it is re-confirmed on every check:
//!
//! ```text
//! verify_purchase(identity, course, price)
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ Merchant configured?│── no ──▶ false
//! └─────────┬───────────┘
//!           │
//!           ▼
//! ┌─────────────────────┐
//! │ Cached record for   │
//! │ (identity, course)  │
//! └─────────┬───────────┘
//!    ┌──────┴──────┐
//!   HIT          MISS
//!    │             │
//!    ▼             │
//! Re-fetch tx      │
//! (10s bound)      │
//!    │             │
//!  ok / err        │
//!    │    └────────┤
//!    ▼             ▼
//!  true     Scan last 100 signatures
//!                  │
//!           ┌──────┴──────┐
//!           │             │
//!       QUALIFYING      NONE
//!           │             │
//!           ▼             ▼
//!    Cache + true       false
//! ```
//!
//! The NFT variant has the same shape, with "current owner of the cached
//! mint" as the fast path and "tokens held in the course collection" as the
//! fallback.

mod cache;
mod checkout;
mod nft;
mod verifier;

pub use cache::{
    CacheStats, CachedRecord, NftCache, NftRecord, OwnershipCache, PurchaseCache, PurchaseRecord,
    NFT_STORAGE_KEY, PURCHASE_STORAGE_KEY,
};
pub use checkout::{
    Checkout, CheckoutConfig, PurchaseReceipt, TransferRequest, Wallet, DEFAULT_PROCESSING_FEE,
};
pub use nft::{is_course_token, NftVerifier, NftVerifierConfig, COURSE_ID_TRAIT};
pub use verifier::{
    is_qualifying_payment, EntitlementStatus, PurchaseVerifier, PurchaseVerifierConfig,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_SIGNATURE_LIMIT,
};
