//! Upstream Yield API Adapter
//!
//! Implements the payment-gated HTTP client and the three typed views
//! over the upstream portfolio and transaction endpoints.
//!
//! Sub-modules:
//! - `client`: x402 pay-per-call HTTP client
//! - `positions`: idle balance and vault positions
//! - `opportunities`: best deposit options
//! - `transactions`: deposit/redeem transaction plans
//! - `types`: API request/response type definitions

pub mod client;
pub mod opportunities;
pub mod positions;
pub mod transactions;
pub mod types;

use alloy::primitives::Address;

/// Wallet, network and asset every upstream query is scoped to.
#[derive(Debug, Clone)]
pub struct ApiScope {
  /// Wallet whose portfolio is queried.
  pub wallet: Address,
  /// Network identifier (e.g. "base").
  pub network: String,
  /// Asset ticker (e.g. "USDC").
  pub asset_symbol: String,
  /// Asset contract address.
  pub asset: Address,
  /// Asset decimals.
  pub decimals: u32,
}

impl ApiScope {
  /// `network` and `asset` query parameters shared by portfolio endpoints.
  pub fn portfolio_params(&self) -> Vec<(String, String)> {
    vec![
      ("network".to_string(), self.network.clone()),
      ("asset".to_string(), self.asset_symbol.clone()),
    ]
  }
}
