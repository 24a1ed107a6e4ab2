//! Configuration Module - TOML-based Agent Configuration
//!
//! Loads and validates configuration from `config.toml`; the wallet key
//! comes from the environment (`.env` honoured). The raw file shape lives
//! here, and `settings` turns it into the typed values the orchestrator
//! is constructed with. Nothing reads configuration implicitly at runtime.

pub mod loader;
pub mod settings;

pub use settings::AgentSettings;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::vault::ApyInterval;

/// Top-level agent configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before any network call is made.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Agent identity and logging.
  #[serde(default)]
  pub agent: AgentConfig,
  /// Chain connection.
  pub network: NetworkConfig,
  /// The single asset the agent manages.
  pub asset: AssetConfig,
  /// Upstream yield API.
  #[serde(default)]
  pub api: ApiConfig,
  /// Deposit sizing.
  #[serde(default)]
  pub investment: InvestmentConfig,
  /// Vault selection filters.
  #[serde(default)]
  pub criteria: CriteriaConfig,
  /// Post-deployment position refresh.
  #[serde(default)]
  pub refresh: RefreshConfig,
  /// Gas checks and limits.
  #[serde(default)]
  pub gas: GasConfig,
  /// Receipt polling.
  #[serde(default)]
  pub executor: ExecutorSection,
  /// Output formatting.
  #[serde(default)]
  pub display: DisplayConfig,
}

/// Agent identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
  /// Human-readable agent name.
  #[serde(default = "default_agent_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

impl Default for AgentConfig {
  fn default() -> Self {
    Self {
      name: default_agent_name(),
      log_level: default_log_level(),
    }
  }
}

/// Chain connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
  /// Network identifier used by the upstream API and x402 (e.g. "base").
  pub name: String,
  /// Expected chain ID, checked against the RPC at startup.
  pub chain_id: u64,
  /// RPC endpoint URL.
  pub rpc_url: String,
  /// Per-call RPC timeout.
  #[serde(default = "default_rpc_timeout")]
  pub rpc_timeout_seconds: u64,
}

/// Asset configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
  /// Ticker, e.g. "USDC".
  pub symbol: String,
  /// ERC-20 contract address.
  pub address: String,
  /// Token decimals.
  pub decimals: u32,
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL.
  #[serde(default = "default_api_url")]
  pub base_url: String,
  /// HTTP request timeout.
  #[serde(default = "default_api_timeout")]
  pub timeout_seconds: u64,
  /// Per-call x402 payment cap in asset minor units.
  #[serde(default = "default_max_payment")]
  pub max_payment_minor_units: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_api_url(),
      timeout_seconds: default_api_timeout(),
      max_payment_minor_units: default_max_payment(),
    }
  }
}

/// Deposit sizing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InvestmentConfig {
  /// Smallest deposit, in whole asset units.
  #[serde(default = "default_min_deposit")]
  pub min_deposit: Decimal,
  /// Extra allowance on deposit approvals, percent (0 disables).
  #[serde(default = "default_approval_buffer")]
  pub approval_buffer_pct: Decimal,
}

impl Default for InvestmentConfig {
  fn default() -> Self {
    Self {
      min_deposit: default_min_deposit(),
      approval_buffer_pct: default_approval_buffer(),
    }
  }
}

/// Vault selection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CriteriaConfig {
  /// APY lookback used for filtering and ranking.
  #[serde(default)]
  pub apy_interval: ApyInterval,
  /// Minimum vault TVL in USD.
  #[serde(default = "default_min_tvl")]
  pub min_tvl: f64,
  /// Minimum APY as a fraction (0.01 = 1%).
  #[serde(default = "default_min_apy")]
  pub min_apy: f64,
  /// Only vaults the upstream can build transactions for.
  #[serde(default = "default_true")]
  pub only_transactional: bool,
  /// Allowed vault addresses; empty allows all.
  #[serde(default)]
  pub vault_whitelist: Vec<String>,
  /// Permit depositing into a vault already held.
  #[serde(default)]
  pub bypass_diversification: bool,
  /// Count zero-balance positions as held.
  #[serde(default)]
  pub zero_balance_counts_as_existing: bool,
}

impl Default for CriteriaConfig {
  fn default() -> Self {
    Self {
      apy_interval: ApyInterval::default(),
      min_tvl: default_min_tvl(),
      min_apy: default_min_apy(),
      only_transactional: true,
      vault_whitelist: Vec::new(),
      bypass_diversification: false,
      zero_balance_counts_as_existing: false,
    }
  }
}

/// Position refresh configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
  /// Reads attempted after a deployment.
  #[serde(default = "default_refresh_attempts")]
  pub attempts: u32,
  /// Fixed delay between reads.
  #[serde(default = "default_refresh_delay")]
  pub delay_seconds: u64,
}

impl Default for RefreshConfig {
  fn default() -> Self {
    Self {
      attempts: default_refresh_attempts(),
      delay_seconds: default_refresh_delay(),
    }
  }
}

/// Gas configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
  /// Safety margin on estimated cost, percent.
  #[serde(default = "default_gas_buffer")]
  pub buffer_pct: u32,
  /// Gas units assumed by the approximate pre-check.
  #[serde(default = "default_nominal_gas")]
  pub nominal_gas_units: u64,
  /// Gas limit as a percentage of the estimate.
  #[serde(default = "default_gas_limit_multiplier")]
  pub gas_limit_multiplier_pct: u64,
}

impl Default for GasConfig {
  fn default() -> Self {
    Self {
      buffer_pct: default_gas_buffer(),
      nominal_gas_units: default_nominal_gas(),
      gas_limit_multiplier_pct: default_gas_limit_multiplier(),
    }
  }
}

/// Receipt polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
  /// Give up waiting for a receipt after this long.
  #[serde(default = "default_confirmation_timeout")]
  pub confirmation_timeout_seconds: u64,
  /// Receipt poll interval.
  #[serde(default = "default_poll_interval")]
  pub poll_interval_seconds: u64,
}

impl Default for ExecutorSection {
  fn default() -> Self {
    Self {
      confirmation_timeout_seconds: default_confirmation_timeout(),
      poll_interval_seconds: default_poll_interval(),
    }
  }
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
  /// Decimal places shown for asset amounts.
  #[serde(default = "default_display_decimals")]
  pub decimals: u32,
}

impl Default for DisplayConfig {
  fn default() -> Self {
    Self {
      decimals: default_display_decimals(),
    }
  }
}

// Default value functions for serde
fn default_agent_name() -> String {
  "vault-yield-agent".to_string()
}
fn default_log_level() -> String {
  "info".to_string()
}
const fn default_rpc_timeout() -> u64 {
  30
}
fn default_api_url() -> String {
  "https://api.vaults.fyi".to_string()
}
const fn default_api_timeout() -> u64 {
  60
}
const fn default_max_payment() -> u64 {
  100_000
}
const fn default_min_deposit() -> Decimal {
  dec!(0.10)
}
const fn default_approval_buffer() -> Decimal {
  dec!(10)
}
const fn default_min_tvl() -> f64 {
  1_000_000.0
}
const fn default_min_apy() -> f64 {
  0.01
}
const fn default_true() -> bool {
  true
}
const fn default_refresh_attempts() -> u32 {
  3
}
const fn default_refresh_delay() -> u64 {
  5
}
const fn default_gas_buffer() -> u32 {
  10
}
const fn default_nominal_gas() -> u64 {
  300_000
}
const fn default_gas_limit_multiplier() -> u64 {
  150
}
const fn default_confirmation_timeout() -> u64 {
  120
}
const fn default_poll_interval() -> u64 {
  2
}
const fn default_display_decimals() -> u32 {
  2
}
