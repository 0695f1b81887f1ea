//! End-to-end tests of entitlement checks against in-memory collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

mod nft;
mod purchase;
