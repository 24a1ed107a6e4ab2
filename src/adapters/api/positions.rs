//! Portfolio Queries - Idle Balance and Vault Positions
//!
//! Reads what the wallet holds: the idle asset balance available for
//! deployment and every vault position the upstream indexes. Each read
//! is a fresh paid call; nothing is cached between calls.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::ApiScope;
use super::types::{IdleAssetsResponse, PositionsResponse, decode};
use crate::domain::vault::{IdleBalance, Position};
use crate::error::Result;
use crate::ports::paid_api::PaidApi;

/// Reads the wallet's idle balance and positions.
pub struct PositionQuery<A> {
  api: Arc<A>,
  scope: ApiScope,
}

impl<A: PaidApi> PositionQuery<A> {
  pub const fn new(api: Arc<A>, scope: ApiScope) -> Self {
    Self { api, scope }
  }

  /// Idle balance of the configured asset.
  ///
  /// An asset the upstream does not list is reported as a zero balance.
  #[instrument(skip(self), fields(wallet = %self.scope.wallet))]
  pub async fn idle_balance(&self) -> Result<IdleBalance> {
    let endpoint = format!("/v2/portfolio/idle-assets/{}", self.scope.wallet);
    let value = self.api.call(&endpoint, &self.scope.portfolio_params()).await?;
    let response: IdleAssetsResponse = decode(&endpoint, value)?;

    let entry = response
      .assets
      .into_iter()
      .find(|a| a.matches(&self.scope.asset_symbol, self.scope.asset, &self.scope.network));

    let balance = match entry {
      Some(entry) => entry.into_domain(&endpoint, self.scope.asset, self.scope.decimals)?,
      None => IdleBalance::zero(&self.scope.asset_symbol, self.scope.asset, self.scope.decimals),
    };
    debug!(amount_minor = balance.amount_minor, "Idle balance read");
    Ok(balance)
  }

  /// Every indexed position, including ones already fully redeemed.
  #[instrument(skip(self), fields(wallet = %self.scope.wallet))]
  pub async fn positions(&self) -> Result<Vec<Position>> {
    let endpoint = format!("/v2/portfolio/positions/{}", self.scope.wallet);
    let value = self.api.call(&endpoint, &self.scope.portfolio_params()).await?;
    let response: PositionsResponse = decode(&endpoint, value)?;

    let positions = response
      .positions
      .into_iter()
      .map(|p| p.into_domain(&endpoint, &self.scope.network, self.scope.decimals))
      .collect::<Result<Vec<_>>>()?;

    debug!(
      count = positions.len(),
      empty = positions.iter().filter(|p| p.is_empty()).count(),
      "Positions read"
    );
    Ok(positions)
  }
}
