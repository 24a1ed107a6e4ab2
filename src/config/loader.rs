//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    network = %config.network.name,
    chain_id = config.network.chain_id,
    asset = %config.asset.symbol,
    apy_interval = %config.criteria.apy_interval,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Network validation
  anyhow::ensure!(!config.network.name.is_empty(), "network.name must not be empty");
  anyhow::ensure!(config.network.chain_id > 0, "network.chain_id must be positive");
  anyhow::ensure!(!config.network.rpc_url.is_empty(), "network.rpc_url must not be empty");
  anyhow::ensure!(
    config.network.rpc_timeout_seconds > 0,
    "network.rpc_timeout_seconds must be positive"
  );

  // Asset validation
  anyhow::ensure!(!config.asset.symbol.is_empty(), "asset.symbol must not be empty");
  anyhow::ensure!(
    config.asset.decimals <= 18,
    "asset.decimals must be at most 18, got {}",
    config.asset.decimals
  );

  // API validation
  anyhow::ensure!(!config.api.base_url.is_empty(), "api.base_url must not be empty");
  anyhow::ensure!(config.api.timeout_seconds > 0, "api.timeout_seconds must be positive");
  anyhow::ensure!(
    config.api.max_payment_minor_units > 0,
    "api.max_payment_minor_units must be positive"
  );

  // Investment validation
  anyhow::ensure!(
    config.investment.min_deposit > Decimal::ZERO,
    "investment.min_deposit must be positive, got {}",
    config.investment.min_deposit
  );
  anyhow::ensure!(
    config.investment.approval_buffer_pct >= Decimal::ZERO
      && config.investment.approval_buffer_pct <= dec!(100),
    "investment.approval_buffer_pct must be in [0, 100], got {}",
    config.investment.approval_buffer_pct
  );

  // Criteria validation
  anyhow::ensure!(config.criteria.min_tvl >= 0.0, "criteria.min_tvl must not be negative");
  anyhow::ensure!(config.criteria.min_apy >= 0.0, "criteria.min_apy must not be negative");

  // Refresh validation
  anyhow::ensure!(
    config.refresh.attempts >= 1 && config.refresh.attempts <= 20,
    "refresh.attempts must be in [1, 20], got {}",
    config.refresh.attempts
  );

  // Gas validation
  anyhow::ensure!(
    config.gas.gas_limit_multiplier_pct >= 100,
    "gas.gas_limit_multiplier_pct must be at least 100, got {}",
    config.gas.gas_limit_multiplier_pct
  );
  anyhow::ensure!(config.gas.nominal_gas_units > 0, "gas.nominal_gas_units must be positive");

  // Executor validation
  anyhow::ensure!(
    config.executor.poll_interval_seconds > 0,
    "executor.poll_interval_seconds must be positive"
  );
  anyhow::ensure!(
    config.executor.confirmation_timeout_seconds >= config.executor.poll_interval_seconds,
    "executor.confirmation_timeout_seconds must be at least the poll interval"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AgentSettings;
  use crate::domain::vault::ApyInterval;

  const MINIMAL: &str = r#"
[network]
name = "base"
chain_id = 8453
rpc_url = "https://mainnet.base.org"

[asset]
symbol = "USDC"
address = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
decimals = 6
"#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_minimal_config_gets_defaults() {
    let config = parse_config(MINIMAL).unwrap();
    assert_eq!(config.api.base_url, "https://api.vaults.fyi");
    assert_eq!(config.refresh.attempts, 3);
    assert_eq!(config.refresh.delay_seconds, 5);
    assert_eq!(config.gas.buffer_pct, 10);
    assert_eq!(config.gas.gas_limit_multiplier_pct, 150);
    assert_eq!(config.executor.confirmation_timeout_seconds, 120);
    assert_eq!(config.criteria.apy_interval, ApyInterval::OneDay);
    assert!(!config.criteria.bypass_diversification);
    assert_eq!(config.investment.approval_buffer_pct, dec!(10));
  }

  #[test]
  fn test_settings_resolve_minor_units() {
    let config = parse_config(MINIMAL).unwrap();
    let settings = AgentSettings::from_config(&config).unwrap();
    assert_eq!(settings.min_deposit_minor, 100_000);
    assert_eq!(settings.refresh_delay.as_secs(), 5);
    assert!(settings.selection.whitelist.is_empty());
  }

  #[test]
  fn test_whitelist_and_interval_parse() {
    let text = format!(
      "{MINIMAL}\n[criteria]\napy_interval = \"7day\"\nvault_whitelist = [\"0x1111111111111111111111111111111111111111\"]\n"
    );
    let config = parse_config(&text).unwrap();
    let settings = AgentSettings::from_config(&config).unwrap();
    assert_eq!(settings.selection.interval, ApyInterval::SevenDay);
    assert_eq!(settings.selection.whitelist.len(), 1);
  }

  #[test]
  fn test_bad_whitelist_address_rejected() {
    let text = format!("{MINIMAL}\n[criteria]\nvault_whitelist = [\"0xnope\"]\n");
    let config = parse_config(&text).unwrap();
    assert!(AgentSettings::from_config(&config).is_err());
  }

  #[test]
  fn test_zero_refresh_attempts_rejected() {
    let text = format!("{MINIMAL}\n[refresh]\nattempts = 0\n");
    assert!(parse_config(&text).is_err());
  }

  #[test]
  fn test_gas_multiplier_below_estimate_rejected() {
    let text = format!("{MINIMAL}\n[gas]\ngas_limit_multiplier_pct = 90\n");
    assert!(parse_config(&text).is_err());
  }
}
