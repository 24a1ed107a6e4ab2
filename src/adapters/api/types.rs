//! Upstream API Request/Response Types
//!
//! Explicit serde shapes for every endpoint the agent calls, plus the
//! x402 challenge and payment header payloads. Decoding into these
//! structs is the validation step: a body that does not fit is an
//! `AgentError::Api`, never a silently-defaulted value.

use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::amount::{parse_minor_units, to_decimal, to_minor_units};
use crate::domain::vault::{ApyFigures, IdleBalance, Position, VaultCandidate, nickname};
use crate::error::{AgentError, Result};

/// Decode a JSON body into an endpoint's response struct.
pub fn decode<T: DeserializeOwned>(endpoint: &str, value: serde_json::Value) -> Result<T> {
  serde_json::from_value(value).map_err(|e| shape_error(endpoint, format!("unexpected response shape: {e}")))
}

pub(crate) fn shape_error(endpoint: &str, body: String) -> AgentError {
  AgentError::Api {
    endpoint: endpoint.to_string(),
    status: 200,
    body,
  }
}

fn parse_address(endpoint: &str, field: &str, raw: &str) -> Result<Address> {
  Address::from_str(raw).map_err(|e| shape_error(endpoint, format!("invalid {field} '{raw}': {e}")))
}

/// Amount given either as a JSON string or a JSON integer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
  Text(String),
  Number(u64),
}

impl RawAmount {
  fn minor_units(&self) -> Option<u128> {
    match self {
      Self::Text(s) => parse_minor_units(s),
      Self::Number(n) => Some(u128::from(*n)),
    }
  }

  fn wei(&self) -> Option<U256> {
    match self {
      Self::Text(s) if s.trim().is_empty() => Some(U256::ZERO),
      Self::Text(s) => U256::from_str(s.trim()).ok(),
      Self::Number(n) => Some(U256::from(*n)),
    }
  }
}

/// Flattened APY fields shared by positions and vault listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApyFields {
  #[serde(default, rename = "apy1d")]
  pub one_day: Option<f64>,
  #[serde(default, rename = "apy7d")]
  pub seven_day: Option<f64>,
  #[serde(default, rename = "apy30d")]
  pub thirty_day: Option<f64>,
}

impl From<&ApyFields> for ApyFigures {
  fn from(f: &ApyFields) -> Self {
    Self {
      one_day: f.one_day,
      seven_day: f.seven_day,
      thirty_day: f.thirty_day,
    }
  }
}

/// Resolve a balance to minor units from whichever form the upstream sent.
///
/// `balanceNative` (integer minor units) wins; `balanceTokens` (decimal
/// whole units) is the fallback and is truncated to the asset precision.
fn resolve_balance(
  endpoint: &str,
  native: Option<&RawAmount>,
  tokens: Option<Decimal>,
  decimals: u32,
) -> Result<(u128, Decimal)> {
  let minor = match (native, tokens) {
    (Some(raw), _) => raw
      .minor_units()
      .ok_or_else(|| shape_error(endpoint, format!("invalid balanceNative {raw:?}")))?,
    (None, Some(tokens)) => to_minor_units(tokens, decimals)
      .ok_or_else(|| shape_error(endpoint, format!("invalid balanceTokens {tokens}")))?,
    (None, None) => 0,
  };
  let amount = to_decimal(minor, decimals)
    .ok_or_else(|| shape_error(endpoint, format!("balance {minor} out of range")))?;
  Ok((minor, amount))
}

// ---------------------------------------------------------------------------
// GET /v2/portfolio/idle-assets/{wallet}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct IdleAssetsResponse {
  #[serde(default)]
  pub assets: Vec<IdleAssetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleAssetEntry {
  pub symbol: String,
  #[serde(default)]
  pub network: Option<String>,
  #[serde(default, alias = "assetAddress")]
  pub address: Option<String>,
  #[serde(default)]
  pub decimals: Option<u32>,
  #[serde(default)]
  pub balance_native: Option<RawAmount>,
  #[serde(default)]
  pub balance_tokens: Option<Decimal>,
  #[serde(default)]
  pub balance_usd: Option<f64>,
}

impl IdleAssetEntry {
  /// Whether this entry is the configured asset on the configured network.
  pub fn matches(&self, symbol: &str, asset: Address, network: &str) -> bool {
    let network_ok = self.network.as_deref().is_none_or(|n| n.eq_ignore_ascii_case(network));
    let asset_ok = match self.address.as_deref().map(Address::from_str) {
      Some(Ok(address)) => address == asset,
      _ => self.symbol.eq_ignore_ascii_case(symbol),
    };
    network_ok && asset_ok
  }

  pub fn into_domain(self, endpoint: &str, asset: Address, default_decimals: u32) -> Result<IdleBalance> {
    let decimals = self.decimals.unwrap_or(default_decimals);
    let (amount_minor, amount) =
      resolve_balance(endpoint, self.balance_native.as_ref(), self.balance_tokens, decimals)?;
    Ok(IdleBalance {
      symbol: self.symbol,
      asset,
      decimals,
      amount_minor,
      amount,
      balance_usd: self.balance_usd.unwrap_or_default(),
    })
  }
}

// ---------------------------------------------------------------------------
// GET /v2/portfolio/positions/{wallet}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PositionsResponse {
  #[serde(default)]
  pub positions: Vec<PositionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEntry {
  pub vault_address: String,
  #[serde(default)]
  pub vault_name: String,
  #[serde(default)]
  pub network: Option<String>,
  #[serde(default)]
  pub decimals: Option<u32>,
  #[serde(default)]
  pub balance_native: Option<RawAmount>,
  #[serde(default)]
  pub balance_tokens: Option<Decimal>,
  #[serde(default)]
  pub balance_usd: Option<f64>,
  #[serde(flatten)]
  pub apy: ApyFields,
}

impl PositionEntry {
  pub fn into_domain(self, endpoint: &str, default_network: &str, default_decimals: u32) -> Result<Position> {
    let vault = parse_address(endpoint, "vaultAddress", &self.vault_address)?;
    let decimals = self.decimals.unwrap_or(default_decimals);
    let (balance_minor, balance) =
      resolve_balance(endpoint, self.balance_native.as_ref(), self.balance_tokens, decimals)?;
    Ok(Position {
      vault,
      nickname: nickname(&self.vault_name),
      apy: ApyFigures::from(&self.apy),
      vault_name: self.vault_name,
      network: self.network.unwrap_or_else(|| default_network.to_string()),
      decimals,
      balance_minor,
      balance,
      balance_usd: self.balance_usd.unwrap_or_default(),
    })
  }
}

// ---------------------------------------------------------------------------
// GET /v2/portfolio/best-deposit-options/{wallet}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DepositOptionsResponse {
  #[serde(default)]
  pub vaults: Vec<VaultEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultEntry {
  pub vault_address: String,
  #[serde(default)]
  pub vault_name: String,
  #[serde(default)]
  pub network: Option<String>,
  #[serde(default)]
  pub tvl: Option<f64>,
  #[serde(default)]
  pub is_transactional: Option<bool>,
  #[serde(flatten)]
  pub apy: ApyFields,
}

impl VaultEntry {
  pub fn into_domain(self, endpoint: &str, default_network: &str, only_transactional: bool) -> Result<VaultCandidate> {
    Ok(VaultCandidate {
      address: parse_address(endpoint, "vaultAddress", &self.vault_address)?,
      apy: ApyFigures::from(&self.apy),
      name: self.vault_name,
      network: self.network.unwrap_or_else(|| default_network.to_string()),
      tvl_usd: self.tvl.unwrap_or_default(),
      // Requested with onlyTransactional, so absence means yes
      transactional: self.is_transactional.unwrap_or(only_transactional),
    })
  }
}

// ---------------------------------------------------------------------------
// GET /v2/transactions/{deposit,redeem}/{wallet}/{network}/{vault}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionsResponse {
  pub actions: Vec<ActionEntry>,
  #[serde(default)]
  pub current_action_index: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionEntry {
  #[serde(default)]
  pub name: Option<String>,
  /// Some responses nest the call under `tx`.
  #[serde(default)]
  pub tx: Option<RawCall>,
  #[serde(flatten)]
  pub call: Option<RawCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCall {
  pub to: String,
  pub data: String,
  #[serde(default)]
  pub value: Option<RawAmount>,
}

/// A call decoded into typed fields.
#[derive(Debug, Clone)]
pub struct DecodedCall {
  pub to: Address,
  pub data: Bytes,
  pub value: U256,
}

impl ActionEntry {
  pub fn decode_call(&self, endpoint: &str) -> Result<DecodedCall> {
    let call = self
      .tx
      .as_ref()
      .or(self.call.as_ref())
      .ok_or_else(|| shape_error(endpoint, "action without to/data".to_string()))?;

    let to = parse_address(endpoint, "to", &call.to)?;
    let data = Bytes::from_str(&call.data)
      .map_err(|e| shape_error(endpoint, format!("invalid calldata: {e}")))?;
    let value = match &call.value {
      None => U256::ZERO,
      Some(raw) => raw
        .wei()
        .ok_or_else(|| shape_error(endpoint, format!("invalid value {raw:?}")))?,
    };
    Ok(DecodedCall { to, data, value })
  }

  pub fn label(&self) -> String {
    self.name.clone().unwrap_or_else(|| "unnamed".to_string())
  }
}

// ---------------------------------------------------------------------------
// x402 payment protocol
// ---------------------------------------------------------------------------

/// Body of an HTTP 402 answer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentChallenge {
  pub x402_version: u32,
  #[serde(default)]
  pub error: Option<String>,
  #[serde(default)]
  pub accepts: Vec<PaymentRequirement>,
}

impl PaymentChallenge {
  /// Nonce the server pinned in its first `exact` requirement, if any.
  pub fn pinned_nonce(&self) -> Option<&str> {
    self.accepts
      .iter()
      .filter(|r| r.scheme == "exact")
      .find_map(|r| r.extra.as_ref()?.nonce.as_deref())
  }
}

/// One way the server is willing to be paid.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirement {
  pub scheme: String,
  pub network: String,
  pub max_amount_required: String,
  pub pay_to: String,
  pub asset: String,
  #[serde(default = "default_max_timeout_seconds")]
  pub max_timeout_seconds: u64,
  #[serde(default)]
  pub resource: Option<String>,
  #[serde(default)]
  pub extra: Option<PaymentExtra>,
}

const fn default_max_timeout_seconds() -> u64 {
  60
}

/// EIP-712 domain hints and an optional server-pinned nonce.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentExtra {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub version: Option<String>,
  #[serde(default)]
  pub nonce: Option<String>,
}

/// Decoded `X-PAYMENT` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
  pub x402_version: u32,
  pub scheme: String,
  pub network: String,
  pub payload: ExactPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExactPayload {
  pub signature: String,
  pub authorization: AuthorizationFields,
}

/// EIP-3009 authorization with integers rendered as decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationFields {
  pub from: String,
  pub to: String,
  pub value: String,
  pub valid_after: String,
  pub valid_before: String,
  pub nonce: String,
}

/// Decoded `X-PAYMENT-RESPONSE` header.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
  pub success: bool,
  #[serde(default)]
  pub transaction: Option<String>,
  #[serde(default)]
  pub network: Option<String>,
  #[serde(default)]
  pub payer: Option<String>,
  #[serde(default)]
  pub error_reason: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_position_entry_prefers_native_balance() {
    let entry: PositionEntry = serde_json::from_value(json!({
      "vaultAddress": "0x1111111111111111111111111111111111111111",
      "vaultName": "Spark USDC Vault",
      "balanceNative": "5000000",
      "balanceTokens": 4.9,
      "balanceUsd": 5.0,
      "apy1d": 0.061
    }))
    .unwrap();
    let position = entry.into_domain("positions", "base", 6).unwrap();
    assert_eq!(position.balance_minor, 5_000_000);
    assert_eq!(position.nickname, "SparkUSDCV");
    assert_eq!(position.apy.one_day, Some(0.061));
    assert_eq!(position.network, "base");
  }

  #[test]
  fn test_position_entry_falls_back_to_tokens() {
    let entry: PositionEntry = serde_json::from_value(json!({
      "vaultAddress": "0x1111111111111111111111111111111111111111",
      "vaultName": "Morpho",
      "balanceTokens": "12.3456789"
    }))
    .unwrap();
    assert_eq!(entry.into_domain("positions", "base", 6).unwrap().balance_minor, 12_345_678);
  }

  #[test]
  fn test_bad_vault_address_is_api_error() {
    let entry: PositionEntry = serde_json::from_value(json!({
      "vaultAddress": "not-an-address",
      "vaultName": "X"
    }))
    .unwrap();
    assert!(matches!(entry.into_domain("positions", "base", 6), Err(AgentError::Api { .. })));
  }

  #[test]
  fn test_actions_require_array() {
    let err = decode::<ActionsResponse>("deposit", json!({ "actions": "nope" })).unwrap_err();
    assert!(matches!(err, AgentError::Api { .. }));
  }

  #[test]
  fn test_action_flat_and_nested_calls() {
    let response: ActionsResponse = serde_json::from_value(json!({
      "actions": [
        { "name": "approve", "tx": { "to": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", "data": "0x095ea7b3", "value": "0" } },
        { "name": "deposit", "to": "0x1111111111111111111111111111111111111111", "data": "0x6e553f65", "value": 0 }
      ]
    }))
    .unwrap();
    let approve = response.actions[0].decode_call("deposit").unwrap();
    let deposit = response.actions[1].decode_call("deposit").unwrap();
    assert_eq!(approve.data.as_ref(), &[0x09, 0x5e, 0xa7, 0xb3]);
    assert_eq!(deposit.to, Address::repeat_byte(0x11));
    assert_eq!(deposit.value, U256::ZERO);
  }

  #[test]
  fn test_challenge_parses_and_exposes_nonce() {
    let challenge: PaymentChallenge = serde_json::from_value(json!({
      "x402Version": 1,
      "error": "X-PAYMENT header is required",
      "accepts": [{
        "scheme": "exact",
        "network": "base",
        "maxAmountRequired": "10000",
        "payTo": "0x2222222222222222222222222222222222222222",
        "asset": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
        "maxTimeoutSeconds": 300,
        "resource": "https://api.vaults.fyi/v2/portfolio/positions/0x0",
        "extra": { "name": "USD Coin", "version": "2", "nonce": "0xabc" }
      }]
    }))
    .unwrap();
    assert_eq!(challenge.x402_version, 1);
    assert_eq!(challenge.pinned_nonce(), Some("0xabc"));
    assert_eq!(challenge.accepts[0].max_timeout_seconds, 300);
  }

  #[test]
  fn test_idle_entry_matching() {
    let usdc = Address::from_str("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap();
    let entry: IdleAssetEntry = serde_json::from_value(json!({
      "symbol": "USDC",
      "network": "base",
      "balanceNative": "100000000"
    }))
    .unwrap();
    assert!(entry.matches("USDC", usdc, "base"));
    assert!(!entry.matches("USDC", usdc, "arbitrum"));
    let balance = entry.into_domain("idle", usdc, 6).unwrap();
    assert_eq!(balance.amount_minor, 100_000_000);
  }
}
