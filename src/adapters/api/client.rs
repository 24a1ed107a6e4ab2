//! x402 HTTP Client - Pay-per-call REST API Client
//!
//! Wraps reqwest with the x402 challenge/response flow. A request goes
//! out with `x-402-auth: true`; if the server answers 402 the client
//! picks the matching `exact` requirement, signs an EIP-3009
//! `TransferWithAuthorization` for it and resends the request once with
//! an `X-PAYMENT` header.
//!
//! Payments are irreversible. There is exactly one paid retry per call
//! and no retry at all on ordinary API errors.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256, hex};
use alloy::sol_types::{Eip712Domain, SolStruct};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::types::{
  AuthorizationFields, ExactPayload, PaymentChallenge, PaymentPayload, PaymentRequirement, SettlementResponse,
};
use crate::domain::amount::parse_minor_units;
use crate::error::{AgentError, PaymentError, Result};
use crate::ports::paid_api::PaidApi;
use crate::ports::signer::TransactionSigner;

const PAYMENT_HEADER: &str = "X-PAYMENT";
const PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";
const INSUFFICIENT_FUNDS: &str = "insufficient_funds";

/// Clock skew allowance for `validAfter`.
const VALID_AFTER_SKEW_SECS: i64 = 60;

alloy::sol! {
  /// EIP-3009 transfer authorization signed for x402 `exact` payments.
  #[derive(Debug)]
  struct TransferWithAuthorization {
    address from;
    address to;
    uint256 value;
    uint256 validAfter;
    uint256 validBefore;
    bytes32 nonce;
  }
}

/// Configuration for the payment-gated client.
#[derive(Debug, Clone)]
pub struct PaymentClientConfig {
  /// Base URL for the upstream API.
  pub base_url: String,
  /// Per-request timeout.
  pub timeout: Duration,
  /// Network the agent pays on (x402 network name).
  pub network: String,
  /// Chain ID of that network, for the EIP-712 domain.
  pub chain_id: u64,
  /// Payment asset contract.
  pub asset: Address,
  /// Largest payment accepted for a single call, minor units.
  pub max_payment: u128,
}

impl Default for PaymentClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.vaults.fyi".to_string(),
      timeout: Duration::from_secs(60),
      network: "base".to_string(),
      chain_id: 8453,
      asset: alloy::primitives::address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
      max_payment: 100_000,
    }
  }
}

/// HTTP client that pays for access via x402.
pub struct PaymentGatedClient<S> {
  /// Underlying HTTP client.
  http: Client,
  /// Wallet used to sign payment authorizations.
  signer: Arc<S>,
  /// Client configuration.
  config: PaymentClientConfig,
}

impl<S: TransactionSigner> PaymentGatedClient<S> {
  /// Create a new client.
  pub fn new(signer: Arc<S>, config: PaymentClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()?;

    Ok(Self { http, signer, config })
  }

  pub const fn config(&self) -> &PaymentClientConfig {
    &self.config
  }

  async fn send(&self, endpoint: &str, params: &[(String, String)], payment: Option<&str>) -> Result<Response> {
    let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
    let mut request = self
      .http
      .get(&url)
      .query(params)
      .header("x-402-auth", "true")
      .header("Accept", "application/json");

    if let Some(header) = payment {
      request = request.header(PAYMENT_HEADER, header);
    }

    Ok(request.send().await?)
  }

  /// Pick the first requirement this agent can satisfy.
  fn select_requirement<'a>(&self, challenge: &'a PaymentChallenge) -> Result<&'a PaymentRequirement> {
    challenge
      .accepts
      .iter()
      .find(|r| {
        r.scheme == "exact"
          && r.network.eq_ignore_ascii_case(&self.config.network)
          && r.asset.parse::<Address>().is_ok_and(|a| a == self.config.asset)
      })
      .ok_or_else(|| {
        PaymentError::NoAcceptableRequirement {
          network: self.config.network.clone(),
          asset: self.config.asset.to_string(),
        }
        .into()
      })
  }

  /// Build and sign the `X-PAYMENT` header for a requirement.
  ///
  /// Returns the header value and the nonce that was signed.
  async fn payment_header(&self, x402_version: u32, requirement: &PaymentRequirement) -> Result<(String, B256)> {
    let amount = parse_minor_units(&requirement.max_amount_required).ok_or_else(|| {
      PaymentError::MalformedChallenge(format!("maxAmountRequired '{}'", requirement.max_amount_required))
    })?;
    if amount > self.config.max_payment {
      return Err(PaymentError::AmountExceedsCap {
        required: amount,
        cap: self.config.max_payment,
      }
      .into());
    }

    let pay_to: Address = requirement
      .pay_to
      .parse()
      .map_err(|e| PaymentError::MalformedChallenge(format!("payTo '{}': {e}", requirement.pay_to)))?;

    let extra = requirement.extra.clone().unwrap_or_default();
    let nonce = match extra.nonce.as_deref() {
      Some(pinned) => pinned
        .parse::<B256>()
        .map_err(|e| PaymentError::MalformedChallenge(format!("nonce '{pinned}': {e}")))?,
      None => random_nonce(),
    };

    let now = chrono::Utc::now().timestamp();
    let valid_after = u64::try_from(now - VALID_AFTER_SKEW_SECS).unwrap_or_default();
    let valid_before = u64::try_from(now)
      .unwrap_or_default()
      .saturating_add(requirement.max_timeout_seconds);

    let authorization = TransferWithAuthorization {
      from: self.signer.address(),
      to: pay_to,
      value: U256::from(amount),
      validAfter: U256::from(valid_after),
      validBefore: U256::from(valid_before),
      nonce,
    };
    let domain = Eip712Domain::new(
      Some(extra.name.unwrap_or_else(|| "USD Coin".to_string()).into()),
      Some(extra.version.unwrap_or_else(|| "2".to_string()).into()),
      Some(U256::from(self.config.chain_id)),
      Some(self.config.asset),
      None,
    );
    let digest = authorization.eip712_signing_hash(&domain);
    let signature = self.signer.sign_hash(digest).await?;

    let payload = PaymentPayload {
      x402_version,
      scheme: "exact".to_string(),
      network: requirement.network.clone(),
      payload: ExactPayload {
        signature: hex::encode_prefixed(&signature),
        authorization: AuthorizationFields {
          from: authorization.from.to_string(),
          to: pay_to.to_string(),
          value: amount.to_string(),
          valid_after: valid_after.to_string(),
          valid_before: valid_before.to_string(),
          nonce: nonce.to_string(),
        },
      },
    };
    let json = serde_json::to_vec(&payload)
      .map_err(|e| AgentError::Signing(format!("failed to encode payment payload: {e}")))?;

    info!(
      amount_minor = amount,
      pay_to = %pay_to,
      network = %requirement.network,
      "Signing x402 payment authorization"
    );
    Ok((STANDARD.encode(json), nonce))
  }
}

#[async_trait]
impl<S: TransactionSigner> PaidApi for PaymentGatedClient<S> {
  #[instrument(skip(self, params), fields(endpoint = %endpoint))]
  async fn call(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
    let response = self.send(endpoint, params, None).await?;
    let status = response.status();

    if status.is_success() {
      debug!(status = status.as_u16(), "Served without payment");
      return read_json(endpoint, response).await;
    }
    if status != StatusCode::PAYMENT_REQUIRED {
      return Err(api_error(endpoint, response).await);
    }

    let challenge: PaymentChallenge = response
      .json()
      .await
      .map_err(|e| PaymentError::MalformedChallenge(e.to_string()))?;
    let requirement = self.select_requirement(&challenge)?;
    let (header, signed_nonce) = self.payment_header(challenge.x402_version, requirement).await?;

    let paid = self.send(endpoint, params, Some(&header)).await?;
    let status = paid.status();
    let settlement = settlement(paid.headers());

    if let Some(s) = &settlement {
      debug!(
        success = s.success,
        transaction = s.transaction.as_deref().unwrap_or_default(),
        payer = s.payer.as_deref().unwrap_or_default(),
        "Payment settlement reported"
      );
      if !s.success && s.error_reason.as_deref() == Some(INSUFFICIENT_FUNDS) {
        return Err(PaymentError::InsufficientFunds(format!("settlement on {}", s.network.as_deref().unwrap_or("?"))).into());
      }
    }

    if status.is_success() {
      return read_json(endpoint, paid).await;
    }

    if status == StatusCode::INTERNAL_SERVER_ERROR && settlement.as_ref().is_some_and(|s| s.success) {
      let body = paid.text().await?;
      if let Ok(value) = serde_json::from_str::<Value>(&body) {
        warn!("Upstream returned 500 after a settled payment; using body");
        return Ok(value);
      }
      return Err(AgentError::Api {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
      });
    }

    if status == StatusCode::PAYMENT_REQUIRED {
      let body = paid.text().await?;
      return Err(rejection(&body, signed_nonce).into());
    }

    Err(api_error(endpoint, paid).await)
  }
}

/// Classify a 402 received in answer to a paid request.
fn rejection(body: &str, signed_nonce: B256) -> PaymentError {
  let Ok(challenge) = serde_json::from_str::<PaymentChallenge>(body) else {
    return PaymentError::Rejected(body.to_string());
  };
  if challenge.error.as_deref() == Some(INSUFFICIENT_FUNDS) {
    return PaymentError::InsufficientFunds(body.to_string());
  }
  if let Some(expected) = challenge.pinned_nonce() {
    let matches = expected.parse::<B256>().is_ok_and(|n| n == signed_nonce);
    if !matches {
      return PaymentError::NonceMismatch {
        signed: signed_nonce.to_string(),
        expected: expected.to_string(),
      };
    }
  }
  PaymentError::Rejected(challenge.error.unwrap_or_else(|| body.to_string()))
}

fn settlement(headers: &HeaderMap) -> Option<SettlementResponse> {
  let raw = headers.get(PAYMENT_RESPONSE_HEADER)?.to_str().ok()?;
  let decoded = STANDARD.decode(raw.trim()).ok()?;
  serde_json::from_slice(&decoded).ok()
}

/// 32 random bytes from two v4 UUIDs.
fn random_nonce() -> B256 {
  let mut bytes = [0u8; 32];
  bytes[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
  bytes[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
  B256::from(bytes)
}

async fn read_json(endpoint: &str, response: Response) -> Result<Value> {
  let status = response.status().as_u16();
  let body = response.text().await?;
  serde_json::from_str(&body).map_err(|e| AgentError::Api {
    endpoint: endpoint.to_string(),
    status,
    body: format!("invalid JSON ({e}): {body}"),
  })
}

async fn api_error(endpoint: &str, response: Response) -> AgentError {
  let status = response.status().as_u16();
  let body = response.text().await.unwrap_or_default();
  AgentError::Api {
    endpoint: endpoint.to_string(),
    status,
    body,
  }
}
