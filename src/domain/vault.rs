//! Vault, position and balance types.
//!
//! These are the validated, strongly-typed forms of what the upstream
//! portfolio API reports. Adapters convert raw JSON into these types;
//! use cases and the selector only ever see these.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed length of a position nickname.
pub const NICKNAME_LEN: usize = 10;

/// Derive the short handle used to address a position on the command line.
///
/// Whitespace is removed and the result truncated to [`NICKNAME_LEN`]
/// characters. Distinct vault names may collide; callers accept that.
pub fn nickname(vault_name: &str) -> String {
    vault_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(NICKNAME_LEN)
        .collect()
}

/// Lookback window of an annualized yield figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApyInterval {
    #[default]
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "7day")]
    SevenDay,
    #[serde(rename = "30day")]
    ThirtyDay,
}

impl ApyInterval {
    /// Wire name used by the upstream API.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1day",
            Self::SevenDay => "7day",
            Self::ThirtyDay => "30day",
        }
    }
}

impl fmt::Display for ApyInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApyInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1day" => Ok(Self::OneDay),
            "7day" => Ok(Self::SevenDay),
            "30day" => Ok(Self::ThirtyDay),
            other => Err(format!("unknown APY interval '{other}' (expected 1day, 7day or 30day)")),
        }
    }
}

/// APY figures keyed by interval, as fractions (0.05 = 5%).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ApyFigures {
    pub one_day: Option<f64>,
    pub seven_day: Option<f64>,
    pub thirty_day: Option<f64>,
}

impl ApyFigures {
    /// Figure for a given interval, if the upstream reported one.
    pub const fn get(&self, interval: ApyInterval) -> Option<f64> {
        match interval {
            ApyInterval::OneDay => self.one_day,
            ApyInterval::SevenDay => self.seven_day,
            ApyInterval::ThirtyDay => self.thirty_day,
        }
    }
}

/// Uncommitted asset balance held directly by the wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct IdleBalance {
    /// Asset ticker (e.g. "USDC").
    pub symbol: String,
    /// Asset contract address.
    pub asset: Address,
    /// Asset decimals.
    pub decimals: u32,
    /// Balance in minor units.
    pub amount_minor: u128,
    /// Balance in whole-asset units.
    pub amount: Decimal,
    /// USD valuation as reported upstream.
    pub balance_usd: f64,
}

impl IdleBalance {
    /// An empty balance for an asset the upstream did not report.
    pub fn zero(symbol: &str, asset: Address, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            asset,
            decimals,
            amount_minor: 0,
            amount: Decimal::ZERO,
            balance_usd: 0.0,
        }
    }
}

/// A deposit the wallet currently holds in a vault.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// Vault contract address.
    pub vault: Address,
    /// Vault display name.
    pub vault_name: String,
    /// Derived handle, see [`nickname`].
    pub nickname: String,
    /// Network identifier (e.g. "base").
    pub network: String,
    /// Asset decimals of the balance below.
    pub decimals: u32,
    /// Redeemable balance in asset minor units.
    pub balance_minor: u128,
    /// Redeemable balance in whole-asset units.
    pub balance: Decimal,
    /// USD valuation as reported upstream.
    pub balance_usd: f64,
    /// Current yields.
    pub apy: ApyFigures,
}

impl Position {
    /// Fully redeemed but still indexed.
    pub const fn is_empty(&self) -> bool {
        self.balance_minor == 0
    }
}

/// A vault the upstream offered as a deposit target.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultCandidate {
    /// Vault contract address.
    pub address: Address,
    /// Vault display name.
    pub name: String,
    /// Network identifier.
    pub network: String,
    /// Yields by interval.
    pub apy: ApyFigures,
    /// Total value locked, USD.
    pub tvl_usd: f64,
    /// Whether the upstream can generate transactions for this vault.
    pub transactional: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_strips_whitespace_and_truncates() {
        assert_eq!(nickname("Spark USDC Vault"), "SparkUSDCV");
        assert_eq!(nickname("Morpho\tGauntlet USDC Prime"), "MorphoGaun");
        assert_eq!(nickname("Tiny"), "Tiny");
        assert_eq!(nickname(""), "");
    }

    #[test]
    fn test_nickname_collisions_are_not_deduplicated() {
        assert_eq!(nickname("Spark USDC Vault A"), nickname("Spark USDC Vault B"));
    }

    #[test]
    fn test_nickname_counts_characters_not_bytes() {
        assert_eq!(nickname("Vault Ünïcode Prime").chars().count(), NICKNAME_LEN);
    }

    #[test]
    fn test_apy_interval_roundtrip() {
        for interval in [ApyInterval::OneDay, ApyInterval::SevenDay, ApyInterval::ThirtyDay] {
            assert_eq!(interval.as_str().parse::<ApyInterval>().unwrap(), interval);
        }
        assert!("2day".parse::<ApyInterval>().is_err());
    }

    #[test]
    fn test_apy_figures_lookup() {
        let apy = ApyFigures {
            one_day: Some(0.07),
            seven_day: None,
            thirty_day: Some(0.05),
        };
        assert_eq!(apy.get(ApyInterval::OneDay), Some(0.07));
        assert_eq!(apy.get(ApyInterval::SevenDay), None);
    }
}
