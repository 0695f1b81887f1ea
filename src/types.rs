//! Shared value types: account addresses, signatures and token amounts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Number of fractional digits a SOL amount can carry.
const SOL_DECIMALS: usize = 9;

/// A 32-byte account address, rendered as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    /// Wrap raw address bytes.
    #[must_use]
    pub const fn new_from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl FromStr for Pubkey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidAddress {
            address: s.to_string(),
            reason,
        };
        let decoded = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| invalid(e.to_string()))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|v: Vec<u8>| invalid(format!("expected 32 bytes, got {}", v.len())))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Pubkey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Pubkey> for String {
    fn from(key: Pubkey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({self})")
    }
}

/// Opaque transaction signature as returned by the RPC node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxSignature(pub String);

impl TxSignature {
    /// Borrow the signature text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines and receipts.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxSignature {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An amount in the network's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lamports(pub u64);

impl Lamports {
    /// Zero lamports.
    pub const ZERO: Self = Self(0);

    /// Parse a decimal SOL amount such as `"0.35"` without going through floats.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAmount`] for negative, malformed, over-precise
    /// or overflowing input.
    pub fn from_sol_str(s: &str) -> Result<Self> {
        let invalid = |why: &str| Error::InvalidAmount(format!("{s:?}: {why}"));
        let s_trim = s.trim();
        let (whole, frac) = s_trim.split_once('.').unwrap_or((s_trim, ""));

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("not a non-negative decimal"));
        }
        if frac.len() > SOL_DECIMALS {
            return Err(invalid("more than 9 fractional digits"));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("overflow"))?
        };
        let padded = format!("{frac:0<width$}", width = SOL_DECIMALS);
        let frac: u64 = padded.parse().map_err(|_| invalid("bad fraction"))?;

        whole
            .checked_mul(LAMPORTS_PER_SOL)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or_else(|| invalid("overflow"))
    }

    /// Convert a floating SOL amount, rounding to the nearest lamport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAmount`] for negative, non-finite or
    /// out-of-range input.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn from_sol(sol: f64) -> Result<Self> {
        if !sol.is_finite() || sol < 0.0 {
            return Err(Error::InvalidAmount(format!("{sol} SOL")));
        }
        let lamports = (sol * LAMPORTS_PER_SOL as f64).round();
        if lamports >= u64::MAX as f64 {
            return Err(Error::InvalidAmount(format!("{sol} SOL overflows")));
        }
        Ok(Self(lamports as u64))
    }

    /// Checked addition.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / LAMPORTS_PER_SOL;
        let frac = self.0 % LAMPORTS_PER_SOL;
        if frac == 0 {
            write!(f, "{whole} SOL")
        } else {
            let digits = format!("{frac:09}");
            write!(f, "{whole}.{} SOL", digits.trim_end_matches('0'))
        }
    }
}

/// Milliseconds since the Unix epoch, as stored on cache records.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
