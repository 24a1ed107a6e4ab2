//! Deployment Orchestrator - Top-level Capital Deployment Workflows
//!
//! Sequences gas checks, paid portfolio reads, vault selection, plan
//! building and execution for every caller-facing operation.
//!
//! Deployment flow:
//! 1. Approximate gas pre-check
//! 2. Read idle balance and size the deposit
//! 3. Read positions and deposit options, select a vault
//! 4. Build and execute the deposit plan
//! 5. Re-read positions until the new one is visible (bounded)
//!
//! Every call re-derives state from the network. The post-deployment
//! refresh is the only automatic retry anywhere in the agent.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::adapters::api::ApiScope;
use crate::adapters::api::opportunities::OpportunityDiscovery;
use crate::adapters::api::positions::PositionQuery;
use crate::adapters::api::transactions::TransactionBuilder;
use crate::adapters::chain::executor::TransactionExecutor;
use crate::adapters::chain::gas::GasValidator;
use crate::config::AgentSettings;
use crate::domain::amount::{is_full_redemption, redeem_amount, share_of, to_decimal, validate_percentage};
use crate::domain::plan::{DeploymentPlan, ExecutionResult};
use crate::domain::selector::VaultSelector;
use crate::domain::vault::{IdleBalance, Position, VaultCandidate};
use crate::error::{AgentError, Result};
use crate::ports::chain_client::ChainClient;
use crate::ports::paid_api::PaidApi;
use crate::ports::signer::TransactionSigner;

/// Snapshot returned by `show_state`.
#[derive(Debug, Clone)]
pub struct StateSummary {
  /// Agent wallet.
  pub address: Address,
  /// Native balance available for gas, wei.
  pub gas_balance: U256,
  /// Idle asset balance.
  pub idle: IdleBalance,
  /// Positions with a non-zero balance.
  pub active_positions: usize,
}

/// Result of the bounded post-execution position read.
#[derive(Debug, Clone, Default)]
pub struct PositionRefresh {
  /// Positions from the attempt that was returned.
  pub positions: Vec<Position>,
  /// Reads performed.
  pub attempts: u32,
  /// Whether the awaited condition was observed.
  pub satisfied: bool,
  /// Read failure, if the refresh could not complete.
  pub error: Option<String>,
}

/// Result of a successful `deploy_capital`.
#[derive(Debug, Clone)]
pub struct DeploymentReport {
  /// Vault deposited into.
  pub vault: VaultCandidate,
  /// Deposited amount, minor units.
  pub amount_minor: u128,
  /// Deposited amount, whole units.
  pub amount: Decimal,
  /// Why the vault was chosen.
  pub rationale: String,
  /// Confirmed transaction hashes in plan order.
  pub tx_hashes: Vec<TxHash>,
  /// Per-step execution record.
  pub execution: ExecutionResult,
  /// Post-deployment position view.
  pub refresh: PositionRefresh,
}

/// Result of a successful single-position redemption.
#[derive(Debug, Clone)]
pub struct RedemptionReport {
  /// Position as it was before redeeming.
  pub position: Position,
  /// Amount requested, minor units.
  pub amount_minor: u128,
  /// Whether this was treated as a full exit.
  pub full: bool,
  /// Confirmed transaction hashes.
  pub tx_hashes: Vec<TxHash>,
  /// Upstream actions that were not executed.
  pub rejected_actions: Vec<String>,
  /// Positions read after execution; empty for the shared path of `redeem_all`.
  pub positions_after: Vec<Position>,
  /// Post-execution read failure; the redemption itself stands.
  pub positions_error: Option<String>,
}

/// Outcome for one position during `redeem_all`.
#[derive(Debug)]
pub struct RedeemOutcome {
  pub nickname: String,
  pub vault: Address,
  pub result: Result<RedemptionReport>,
}

/// Result of `redeem_all`.
#[derive(Debug)]
pub struct RedeemAllReport {
  /// One entry per position attempted, in upstream order.
  pub outcomes: Vec<RedeemOutcome>,
  /// Positions read after all attempts.
  pub positions_after: Vec<Position>,
  /// Final read failure; per-position outcomes are still reported.
  pub positions_error: Option<String>,
}

impl RedeemAllReport {
  pub fn succeeded(&self) -> usize {
    self.outcomes.iter().filter(|o| o.result.is_ok()).count()
  }
}

/// Top-level coordinator for every caller-facing operation.
pub struct DeploymentOrchestrator<A, C, S> {
  positions: PositionQuery<A>,
  opportunities: OpportunityDiscovery<A>,
  builder: TransactionBuilder<A>,
  selector: VaultSelector,
  gas: Arc<GasValidator<C>>,
  executor: TransactionExecutor<C, S>,
  settings: AgentSettings,
  address: Address,
}

impl<A: PaidApi, C: ChainClient, S: TransactionSigner> DeploymentOrchestrator<A, C, S> {
  /// Wire the pipeline from its three external seams and validated settings.
  pub fn new(api: Arc<A>, chain: Arc<C>, signer: Arc<S>, settings: AgentSettings) -> Self {
    let address = signer.address();
    let scope = ApiScope {
      wallet: address,
      network: settings.network.clone(),
      asset_symbol: settings.asset_symbol.clone(),
      asset: settings.asset,
      decimals: settings.decimals,
    };
    let gas = Arc::new(GasValidator::new(
      Arc::clone(&chain),
      address,
      settings.gas_buffer_pct,
      settings.nominal_gas_units,
    ));

    Self {
      positions: PositionQuery::new(Arc::clone(&api), scope.clone()),
      opportunities: OpportunityDiscovery::new(Arc::clone(&api), scope.clone(), settings.discovery.clone()),
      builder: TransactionBuilder::new(api, scope, settings.approval_buffer_pct),
      selector: VaultSelector::new(settings.selection.clone()),
      executor: TransactionExecutor::new(chain, signer, Arc::clone(&gas), settings.executor()),
      gas,
      settings,
      address,
    }
  }

  pub const fn address(&self) -> Address {
    self.address
  }

  pub const fn settings(&self) -> &AgentSettings {
    &self.settings
  }

  /// Gas balance, idle balance and number of active positions.
  #[instrument(skip(self))]
  pub async fn show_state(&self) -> Result<StateSummary> {
    let gas_balance = self.gas.balance().await?;
    let idle = self.positions.idle_balance().await?;
    let positions = self.positions.positions().await?;

    Ok(StateSummary {
      address: self.address,
      gas_balance,
      idle,
      active_positions: positions.iter().filter(|p| !p.is_empty()).count(),
    })
  }

  /// Idle balance of the configured asset.
  pub async fn show_idle_assets(&self) -> Result<IdleBalance> {
    self.positions.idle_balance().await
  }

  /// Active positions; with `retry`, re-read until at least one is visible.
  #[instrument(skip(self))]
  pub async fn show_positions(&self, retry: bool) -> Result<Vec<Position>> {
    let positions = if retry {
      self.refresh_positions(|ps| ps.iter().any(|p| !p.is_empty())).await?.positions
    } else {
      self.positions.positions().await?
    };
    Ok(positions.into_iter().filter(|p| !p.is_empty()).collect())
  }

  /// Deposit `percentage` of the idle balance into the best eligible vault.
  #[instrument(skip(self), fields(percentage = %percentage))]
  pub async fn deploy_capital(&self, percentage: Decimal) -> Result<DeploymentReport> {
    validate_percentage(percentage)?;
    self.gas.ensure_approximate().await?;

    let idle = self.positions.idle_balance().await?;
    let amount_minor = share_of(idle.amount_minor, percentage)?;
    if amount_minor < self.settings.min_deposit_minor {
      return Err(AgentError::BelowMinimumDeposit {
        amount: amount_minor,
        minimum: self.settings.min_deposit_minor,
      });
    }

    let existing = self.positions.positions().await?;
    let candidates = self.opportunities.best_deposit_options().await?;
    let selection = self
      .selector
      .select(&candidates, &existing)
      .map_err(AgentError::NoSuitableVault)?;
    info!(
      vault = %selection.vault.address,
      name = %selection.vault.name,
      amount_minor,
      "Vault selected"
    );

    let plan = DeploymentPlan {
      amount_minor,
      steps: self
        .builder
        .build_deposit(selection.vault.address, &selection.vault.network, amount_minor)
        .await?,
      vault: selection.vault,
      rationale: selection.rationale,
    };

    let execution = self.executor.execute(&plan.steps).await;
    if let Some(approval) = execution.orphaned_approval() {
      warn!(
        tx_hash = ?approval.tx_hash,
        spender_contract = %approval.to,
        "Approval confirmed but deposit did not; allowance left in place"
      );
    }
    let tx_hashes = execution.clone().into_result()?;

    // Visible once the vault's balance has grown past what was held before
    let vault_address = plan.vault.address;
    let prior_balance = existing
      .iter()
      .filter(|p| p.vault == vault_address)
      .map(|p| p.balance_minor)
      .max()
      .unwrap_or(0);
    let deposited = |ps: &[Position]| {
      ps.iter()
        .any(|p| p.vault == vault_address && p.balance_minor > prior_balance)
    };
    let refresh = match self.refresh_positions(deposited).await {
      Ok(refresh) => refresh,
      Err(e) => {
        warn!(error = %e, "Deposit confirmed but position refresh failed");
        PositionRefresh {
          error: Some(e.to_string()),
          ..PositionRefresh::default()
        }
      }
    };

    info!(
      vault = %plan.vault.name,
      confirmed = tx_hashes.len(),
      visible = refresh.satisfied,
      "Deployment complete"
    );

    Ok(DeploymentReport {
      amount: to_decimal(plan.amount_minor, self.settings.decimals).unwrap_or_default(),
      amount_minor: plan.amount_minor,
      vault: plan.vault,
      rationale: plan.rationale,
      tx_hashes,
      execution,
      refresh,
    })
  }

  /// Redeem `percentage` of the position whose nickname matches.
  #[instrument(skip(self), fields(percentage = %percentage))]
  pub async fn redeem(&self, nickname: &str, percentage: Decimal) -> Result<RedemptionReport> {
    validate_percentage(percentage)?;
    self.gas.ensure_approximate().await?;

    let positions = self.positions.positions().await?;
    // Nicknames can collide; a funded position wins over an emptied one
    let position = positions
      .iter()
      .find(|p| p.nickname == nickname && !p.is_empty())
      .or_else(|| positions.iter().find(|p| p.nickname == nickname))
      .cloned()
      .ok_or_else(|| AgentError::PositionNotFound {
        nickname: nickname.to_string(),
        available: positions
          .iter()
          .filter(|p| !p.is_empty())
          .map(|p| p.nickname.clone())
          .collect(),
      })?;

    let mut report = self.redeem_position(&position, percentage).await?;
    (report.positions_after, report.positions_error) = self.positions_after_execution().await;
    Ok(report)
  }

  /// Fully redeem every active position, continuing past failures.
  #[instrument(skip(self))]
  pub async fn redeem_all(&self) -> Result<RedeemAllReport> {
    self.gas.ensure_approximate().await?;

    let positions = self.positions.positions().await?;
    let mut outcomes = Vec::new();

    for position in positions.into_iter().filter(|p| !p.is_empty()) {
      let result = self.redeem_position(&position, Decimal::ONE_HUNDRED).await;
      if let Err(e) = &result {
        warn!(nickname = %position.nickname, error = %e, "Redemption failed; continuing");
      }
      outcomes.push(RedeemOutcome {
        nickname: position.nickname,
        vault: position.vault,
        result,
      });
    }

    let (positions_after, positions_error) = self.positions_after_execution().await;
    Ok(RedeemAllReport {
      outcomes,
      positions_after,
      positions_error,
    })
  }

  /// Shared single-position path used by `redeem` and `redeem_all`.
  async fn redeem_position(&self, position: &Position, percentage: Decimal) -> Result<RedemptionReport> {
    let full = is_full_redemption(percentage);
    let amount_minor = redeem_amount(position.balance_minor, percentage)?;
    if amount_minor == 0 {
      return Err(AgentError::InsufficientBalance {
        available: position.balance_minor,
        requested: 1,
      });
    }

    info!(
      nickname = %position.nickname,
      vault = %position.vault,
      amount_minor,
      full,
      "Redeeming position"
    );

    let plan = self
      .builder
      .build_redeem(position.vault, &position.network, amount_minor, full)
      .await?;
    let tx_hashes = self.executor.execute(&plan.steps).await.into_result()?;

    Ok(RedemptionReport {
      position: position.clone(),
      amount_minor,
      full,
      tx_hashes,
      rejected_actions: plan.rejected_actions,
      positions_after: Vec::new(),
      positions_error: None,
    })
  }

  /// Single positions read once transactions have landed.
  ///
  /// A failure here must not turn a confirmed redemption into an error,
  /// so it is logged and handed back alongside an empty list.
  async fn positions_after_execution(&self) -> (Vec<Position>, Option<String>) {
    match self.positions.positions().await {
      Ok(positions) => (positions, None),
      Err(e) => {
        warn!(error = %e, "Redemption confirmed but position read failed");
        (Vec::new(), Some(e.to_string()))
      }
    }
  }

  /// Re-read positions until `visible` holds or attempts run out.
  ///
  /// Returns the first satisfying read, otherwise the last one.
  async fn refresh_positions<F>(&self, visible: F) -> Result<PositionRefresh>
  where
    F: Fn(&[Position]) -> bool + Send + Sync,
  {
    let attempts = self.settings.refresh_attempts.max(1);
    let mut last = Vec::new();

    for attempt in 1..=attempts {
      if attempt > 1 {
        tokio::time::sleep(self.settings.refresh_delay).await;
      }
      let positions = self.positions.positions().await?;
      if visible(&positions) {
        info!(attempt, "Positions refreshed");
        return Ok(PositionRefresh {
          positions,
          attempts: attempt,
          satisfied: true,
          error: None,
        });
      }
      info!(attempt, attempts, "Positions not yet updated upstream");
      last = positions;
    }

    Ok(PositionRefresh {
      positions: last,
      attempts,
      satisfied: false,
      error: None,
    })
  }
}
