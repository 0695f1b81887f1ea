//! Course entitlement verification for StudyCake.
//!
//! Course content is unlocked by paying a fixed amount of the network's
//! native token to a merchant account, or by holding a course NFT. This
//! crate answers "does this wallet own this course" from on-chain evidence,
//! caching that evidence per wallet so repeat checks stay cheap.
//!
//! - [`payment::PurchaseVerifier`] scans payment history
//! - [`payment::NftVerifier`] checks token ownership
//! - [`payment::Checkout`] runs a payment through a connected wallet
//! - [`EntitlementServiceBuilder`] wires them from an [`EntitlementConfig`]

pub mod catalog;
pub mod config;
pub mod error;
pub mod payment;
pub mod rpc;
pub mod service;
pub mod storage;
pub mod types;

pub use config::EntitlementConfig;
pub use error::{Error, Result};
pub use service::{EntitlementService, EntitlementServiceBuilder};
pub use types::{Lamports, Pubkey, TxSignature, LAMPORTS_PER_SOL};
