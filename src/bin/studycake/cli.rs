//! Command-line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use studycake_entitlements::{EntitlementConfig, Pubkey};

/// Verify StudyCake course entitlements against the chain.
#[derive(Parser, Debug)]
#[command(name = "studycake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON-RPC endpoint.
    #[arg(long, env = "STUDYCAKE_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Merchant account receiving course payments.
    #[arg(long, env = "STUDYCAKE_MERCHANT_WALLET")]
    pub merchant: Option<String>,

    /// Collection address of course NFTs.
    #[arg(long, env = "STUDYCAKE_COLLECTION_ADDRESS")]
    pub collection: Option<String>,

    /// Directory holding the ownership caches.
    #[arg(long, env = "STUDYCAKE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Bound on each RPC fetch, in seconds.
    #[arg(long)]
    pub fetch_timeout: Option<u64>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check whether a wallet has paid for a course.
    Verify {
        /// Wallet address.
        #[arg(long, short)]
        wallet: Pubkey,
        /// Course identifier.
        #[arg(long)]
        course: u32,
        /// Expected price in SOL; defaults to the catalog price.
        #[arg(long)]
        price: Option<String>,
    },

    /// List catalog courses a wallet has paid for.
    Owned {
        /// Wallet address.
        #[arg(long, short)]
        wallet: Pubkey,
        /// Check courses one at a time instead of concurrently.
        #[arg(long)]
        sequential: bool,
    },

    /// Check whether a wallet holds the NFT for a course.
    Nft {
        /// Wallet address.
        #[arg(long, short)]
        wallet: Pubkey,
        /// Course identifier.
        #[arg(long)]
        course: u32,
    },

    /// List catalog courses a wallet holds NFTs for.
    NftOwned {
        /// Wallet address.
        #[arg(long, short)]
        wallet: Pubkey,
    },

    /// Print the course catalog.
    Courses,

    /// Print cached entitlement evidence.
    Cache {
        /// Only records for this wallet.
        #[arg(long, short)]
        wallet: Option<Pubkey>,
    },
}

impl Cli {
    /// Build the configuration: file (if any), then CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn to_config(&self) -> color_eyre::Result<EntitlementConfig> {
        let mut config = if let Some(ref path) = self.config {
            EntitlementConfig::from_file(path)?
        } else {
            EntitlementConfig::default()
        };

        if let Some(ref url) = self.rpc_url {
            config.rpc.url.clone_from(url);
        }
        if let Some(ref merchant) = self.merchant {
            config.merchant.address = Some(merchant.clone());
        }
        if let Some(ref collection) = self.collection {
            config.nft.collection = Some(collection.clone());
        }
        if let Some(ref dir) = self.cache_dir {
            config.cache.dir.clone_from(dir);
        }
        if let Some(secs) = self.fetch_timeout {
            config.rpc.fetch_timeout_secs = secs;
        }
        config.log_level.clone_from(&self.log_level);

        Ok(config)
    }
}
