//! Transaction Builder - Deposit and Redeem Plans
//!
//! Fetches ready-to-sign calls from the upstream transaction endpoints.
//! Deposit plans are taken verbatim in upstream order (typically
//! approve then deposit). Redeem plans are limited to the default
//! action; any further actions (cooldown or claim flows) are logged and
//! dropped.

use std::sync::Arc;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use super::ApiScope;
use super::types::{ActionsResponse, decode, shape_error};
use crate::domain::plan::{RedeemPlan, StepKind, TransactionStep, with_approval_buffer};
use crate::error::Result;
use crate::ports::paid_api::PaidApi;

/// Requests deposit/redeem calldata.
pub struct TransactionBuilder<A> {
  api: Arc<A>,
  scope: ApiScope,
  /// Extra allowance on the deposit approve, percent.
  approval_buffer_pct: Decimal,
}

impl<A: PaidApi> TransactionBuilder<A> {
  pub const fn new(api: Arc<A>, scope: ApiScope, approval_buffer_pct: Decimal) -> Self {
    Self {
      api,
      scope,
      approval_buffer_pct,
    }
  }

  async fn actions(&self, endpoint: &str, params: &[(String, String)]) -> Result<ActionsResponse> {
    let value = self.api.call(endpoint, params).await?;
    let response: ActionsResponse = decode(endpoint, value)?;
    if response.actions.is_empty() {
      return Err(shape_error(endpoint, "response contained no actions".to_string()));
    }
    Ok(response)
  }

  /// Ordered steps depositing `amount_minor` into `vault`.
  #[instrument(skip(self), fields(vault = %vault))]
  pub async fn build_deposit(&self, vault: Address, network: &str, amount_minor: u128) -> Result<Vec<TransactionStep>> {
    let endpoint = format!("/v2/transactions/deposit/{}/{network}/{vault}", self.scope.wallet);
    let params = vec![
      ("amount".to_string(), amount_minor.to_string()),
      ("assetAddress".to_string(), self.scope.asset.to_string()),
    ];
    let response = self.actions(&endpoint, &params).await?;

    let steps = response
      .actions
      .iter()
      .map(|action| {
        let call = action.decode_call(&endpoint)?;
        Ok(TransactionStep {
          kind: StepKind::infer(action.name.as_deref(), &call.data, StepKind::Deposit),
          to: call.to,
          data: call.data,
          value: call.value,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    debug!(steps = steps.len(), "Deposit plan built");
    Ok(with_approval_buffer(steps, self.approval_buffer_pct))
  }

  /// Single-action plan redeeming `amount_minor` from `vault`.
  #[instrument(skip(self), fields(vault = %vault))]
  pub async fn build_redeem(&self, vault: Address, network: &str, amount_minor: u128, is_full: bool) -> Result<RedeemPlan> {
    let endpoint = format!("/v2/transactions/redeem/{}/{network}/{vault}", self.scope.wallet);
    let params = vec![
      ("amount".to_string(), amount_minor.to_string()),
      ("assetAddress".to_string(), self.scope.asset.to_string()),
      ("step".to_string(), "default".to_string()),
      ("all".to_string(), is_full.to_string()),
    ];
    let response = self.actions(&endpoint, &params).await?;

    let default_index = response
      .current_action_index
      .filter(|i| *i < response.actions.len())
      .unwrap_or(0);
    let action = &response.actions[default_index];
    let call = action.decode_call(&endpoint)?;

    let rejected_actions: Vec<String> = response
      .actions
      .iter()
      .enumerate()
      .filter(|(i, _)| *i != default_index)
      .map(|(_, a)| a.label())
      .collect();
    if !rejected_actions.is_empty() {
      warn!(
        extra_actions = rejected_actions.len(),
        names = ?rejected_actions,
        "Redeem offered multi-step flow; only the default action will run"
      );
    }

    Ok(RedeemPlan {
      steps: vec![TransactionStep {
        kind: StepKind::infer(action.name.as_deref(), &call.data, StepKind::Redeem),
        to: call.to,
        data: call.data,
        value: call.value,
      }],
      rejected_actions,
    })
  }
}
