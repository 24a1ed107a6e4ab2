//! Typed Settings - Validated Runtime Configuration
//!
//! `AgentSettings` is what the rest of the crate consumes: addresses are
//! parsed, amounts are in minor units and intervals are `Duration`s.
//! It is built once from a validated `AppConfig` and passed explicitly.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use rust_decimal::Decimal;

use super::AppConfig;
use crate::adapters::api::client::PaymentClientConfig;
use crate::adapters::api::opportunities::DiscoveryCriteria;
use crate::adapters::chain::executor::ExecutorConfig;
use crate::domain::amount::to_minor_units;
use crate::domain::selector::SelectionPolicy;
use crate::error::{AgentError, Result};

/// Smallest position value upstream should consider, USD.
const MIN_USD_ASSET_VALUE_THRESHOLD: f64 = 1.0;

/// Fully resolved agent settings.
#[derive(Debug, Clone)]
pub struct AgentSettings {
  pub agent_name: String,
  pub network: String,
  pub chain_id: u64,
  pub rpc_url: String,
  pub rpc_timeout: Duration,
  pub asset_symbol: String,
  pub asset: Address,
  pub decimals: u32,
  /// Minimum deposit in minor units.
  pub min_deposit_minor: u128,
  pub approval_buffer_pct: Decimal,
  pub api_base_url: String,
  pub api_timeout: Duration,
  pub max_payment_minor: u128,
  pub selection: SelectionPolicy,
  pub discovery: DiscoveryCriteria,
  pub refresh_attempts: u32,
  pub refresh_delay: Duration,
  pub gas_buffer_pct: u32,
  pub nominal_gas_units: u64,
  pub gas_limit_multiplier_pct: u64,
  pub confirmation_timeout: Duration,
  pub poll_interval: Duration,
  pub display_decimals: u32,
}

impl AgentSettings {
  /// Resolve a validated `AppConfig`.
  pub fn from_config(config: &AppConfig) -> Result<Self> {
    let asset = parse_address("asset.address", &config.asset.address)?;
    let whitelist = config
      .criteria
      .vault_whitelist
      .iter()
      .map(|raw| parse_address("criteria.vault_whitelist", raw))
      .collect::<Result<Vec<_>>>()?;

    let min_deposit_minor = to_minor_units(config.investment.min_deposit, config.asset.decimals).ok_or_else(|| {
      AgentError::Configuration(format!(
        "investment.min_deposit {} cannot be expressed with {} decimals",
        config.investment.min_deposit, config.asset.decimals
      ))
    })?;

    Ok(Self {
      agent_name: config.agent.name.clone(),
      network: config.network.name.clone(),
      chain_id: config.network.chain_id,
      rpc_url: config.network.rpc_url.clone(),
      rpc_timeout: Duration::from_secs(config.network.rpc_timeout_seconds),
      asset_symbol: config.asset.symbol.clone(),
      asset,
      decimals: config.asset.decimals,
      min_deposit_minor,
      approval_buffer_pct: config.investment.approval_buffer_pct,
      api_base_url: config.api.base_url.clone(),
      api_timeout: Duration::from_secs(config.api.timeout_seconds),
      max_payment_minor: u128::from(config.api.max_payment_minor_units),
      selection: SelectionPolicy {
        interval: config.criteria.apy_interval,
        whitelist,
        bypass_diversification: config.criteria.bypass_diversification,
        zero_balance_counts_as_existing: config.criteria.zero_balance_counts_as_existing,
      },
      discovery: DiscoveryCriteria {
        apy_interval: config.criteria.apy_interval,
        min_tvl: config.criteria.min_tvl,
        min_apy: config.criteria.min_apy,
        only_transactional: config.criteria.only_transactional,
        min_usd_asset_value_threshold: MIN_USD_ASSET_VALUE_THRESHOLD,
      },
      refresh_attempts: config.refresh.attempts,
      refresh_delay: Duration::from_secs(config.refresh.delay_seconds),
      gas_buffer_pct: config.gas.buffer_pct,
      nominal_gas_units: config.gas.nominal_gas_units,
      gas_limit_multiplier_pct: config.gas.gas_limit_multiplier_pct,
      confirmation_timeout: Duration::from_secs(config.executor.confirmation_timeout_seconds),
      poll_interval: Duration::from_secs(config.executor.poll_interval_seconds),
      display_decimals: config.display.decimals,
    })
  }

  /// Payment client settings derived from these.
  pub fn payment_client(&self) -> PaymentClientConfig {
    PaymentClientConfig {
      base_url: self.api_base_url.clone(),
      timeout: self.api_timeout,
      network: self.network.clone(),
      chain_id: self.chain_id,
      asset: self.asset,
      max_payment: self.max_payment_minor,
    }
  }

  /// Executor settings derived from these.
  pub const fn executor(&self) -> ExecutorConfig {
    ExecutorConfig {
      chain_id: self.chain_id,
      gas_limit_multiplier_pct: self.gas_limit_multiplier_pct,
      poll_interval: self.poll_interval,
      confirmation_timeout: self.confirmation_timeout,
    }
  }
}

fn parse_address(field: &str, raw: &str) -> Result<Address> {
  Address::from_str(raw.trim())
    .map_err(|e| AgentError::Configuration(format!("{field}: invalid address '{raw}': {e}")))
}
