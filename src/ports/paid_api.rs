//! Paid API Port - x402-Gated Upstream Access
//!
//! Every upstream call may be answered with HTTP 402 and a payment
//! challenge. Implementations settle the challenge transparently and
//! hand back the decoded JSON body; callers never see the payment.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Trait for payment-gated JSON endpoints.
#[async_trait]
pub trait PaidApi: Send + Sync + 'static {
  /// GET `endpoint` (a path relative to the configured base URL) with
  /// query `params`, paying for access if challenged.
  ///
  /// At most one payment is attempted per call. A second 402 after a
  /// signed payment is an error, never another payment.
  async fn call(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value>;
}
