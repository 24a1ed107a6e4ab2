//! Opportunity Discovery - Best Deposit Options
//!
//! Asks the upstream for vaults accepting the configured asset on the
//! configured network. TVL, APY and transactional filters are applied
//! server-side; the returned order is preserved for tie-breaking.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::ApiScope;
use super::types::{DepositOptionsResponse, decode};
use crate::domain::vault::{ApyInterval, VaultCandidate};
use crate::error::Result;
use crate::ports::paid_api::PaidApi;

/// Server-side filters for the deposit options query.
#[derive(Debug, Clone)]
pub struct DiscoveryCriteria {
  /// APY interval to rank and filter by.
  pub apy_interval: ApyInterval,
  /// Minimum TVL in USD.
  pub min_tvl: f64,
  /// Minimum APY as a fraction.
  pub min_apy: f64,
  /// Only vaults the upstream can build transactions for.
  pub only_transactional: bool,
  /// Ignore wallet holdings below this USD value.
  pub min_usd_asset_value_threshold: f64,
}

impl Default for DiscoveryCriteria {
  fn default() -> Self {
    Self {
      apy_interval: ApyInterval::OneDay,
      min_tvl: 1_000_000.0,
      min_apy: 0.01,
      only_transactional: true,
      min_usd_asset_value_threshold: 1.0,
    }
  }
}

/// Lists deposit candidates.
pub struct OpportunityDiscovery<A> {
  api: Arc<A>,
  scope: ApiScope,
  criteria: DiscoveryCriteria,
}

impl<A: PaidApi> OpportunityDiscovery<A> {
  pub const fn new(api: Arc<A>, scope: ApiScope, criteria: DiscoveryCriteria) -> Self {
    Self { api, scope, criteria }
  }

  fn params(&self) -> Vec<(String, String)> {
    vec![
      ("allowedAssets".to_string(), self.scope.asset_symbol.clone()),
      ("allowedNetworks".to_string(), self.scope.network.clone()),
      ("minTvl".to_string(), self.criteria.min_tvl.to_string()),
      ("minApy".to_string(), self.criteria.min_apy.to_string()),
      ("onlyTransactional".to_string(), self.criteria.only_transactional.to_string()),
      ("apyInterval".to_string(), self.criteria.apy_interval.to_string()),
      (
        "minUsdAssetValueThreshold".to_string(),
        self.criteria.min_usd_asset_value_threshold.to_string(),
      ),
    ]
  }

  /// Candidates in upstream order.
  #[instrument(skip(self), fields(wallet = %self.scope.wallet))]
  pub async fn best_deposit_options(&self) -> Result<Vec<VaultCandidate>> {
    let endpoint = format!("/v2/portfolio/best-deposit-options/{}", self.scope.wallet);
    let value = self.api.call(&endpoint, &self.params()).await?;
    let response: DepositOptionsResponse = decode(&endpoint, value)?;

    let mut candidates = response
      .vaults
      .into_iter()
      .map(|v| v.into_domain(&endpoint, &self.scope.network, self.criteria.only_transactional))
      .collect::<Result<Vec<_>>>()?;

    if self.criteria.only_transactional {
      candidates.retain(|c| c.transactional);
    }

    debug!(count = candidates.len(), "Deposit options read");
    Ok(candidates)
  }
}
