//! Transaction plans and execution results.
//!
//! A plan is an ordered list of steps produced by the upstream
//! transaction endpoints. Order is significant: steps are executed
//! strictly one after another and never reordered or batched.
//!
//! `ExecutionResult` keeps one record per attempted step so a caller
//! can see exactly which transactions landed when a later one failed.

use std::fmt;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

use crate::domain::vault::VaultCandidate;
use crate::error::{AgentError, Result};

/// ERC-20 `approve(address,uint256)` selector.
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// What a step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Approve,
    Deposit,
    Redeem,
}

impl StepKind {
    /// Resolve a step's kind from the upstream action name and calldata.
    ///
    /// Unknown names fall back to the calldata selector, then to the
    /// default kind of the operation being planned.
    pub fn infer(name: Option<&str>, data: &[u8], fallback: Self) -> Self {
        match name.map(str::to_ascii_lowercase).as_deref() {
            Some("approve" | "approval") => Self::Approve,
            Some("deposit" | "supply") => Self::Deposit,
            Some("redeem" | "withdraw") => Self::Redeem,
            _ if data.starts_with(&APPROVE_SELECTOR) => Self::Approve,
            _ => fallback,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "approve"),
            Self::Deposit => write!(f, "deposit"),
            Self::Redeem => write!(f, "redeem"),
        }
    }
}

/// One on-chain call of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStep {
    /// Contract to call.
    pub to: Address,
    /// ABI-encoded calldata.
    pub data: Bytes,
    /// Native value attached, in wei.
    pub value: U256,
    /// Step role.
    pub kind: StepKind,
}

impl TransactionStep {
    /// Whether the calldata is a plain ERC-20 approve.
    pub fn is_erc20_approve(&self) -> bool {
        self.data.len() == 68 && self.data.starts_with(&APPROVE_SELECTOR)
    }

    /// Amount word of an ERC-20 approve, if this is one.
    pub fn approve_amount(&self) -> Option<U256> {
        self.is_erc20_approve()
            .then(|| U256::from_be_slice(&self.data[36..68]))
    }
}

/// Raise the amount of the first ERC-20 approve step by `buffer_pct` percent.
///
/// Covers vaults that pull slightly more than the nominal deposit (fees,
/// share rounding). Every other step and byte is left untouched, and a
/// zero buffer returns the steps unchanged.
pub fn with_approval_buffer(mut steps: Vec<TransactionStep>, buffer_pct: Decimal) -> Vec<TransactionStep> {
    if buffer_pct <= Decimal::ZERO {
        return steps;
    }
    let Some(step) = steps.iter_mut().find(|s| s.kind == StepKind::Approve) else {
        return steps;
    };
    let Some(current) = step.approve_amount() else {
        return steps;
    };
    let Some(mantissa) = buffer_pct.mantissa().to_u128() else {
        return steps;
    };

    let scale = U256::from(10u8).pow(U256::from(buffer_pct.scale()));
    let hundred = U256::from(100u8) * scale;
    let raised = current
        .saturating_mul(hundred.saturating_add(U256::from(mantissa)))
        / hundred;

    let mut data = step.data.to_vec();
    data[36..68].copy_from_slice(&raised.to_be_bytes::<32>());
    step.data = Bytes::from(data);
    steps
}

/// A fully resolved deposit.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    /// Amount deposited, minor units.
    pub amount_minor: u128,
    /// Target vault.
    pub vault: VaultCandidate,
    /// Ordered steps, verbatim from upstream.
    pub steps: Vec<TransactionStep>,
    /// Why this vault was chosen.
    pub rationale: String,
}

/// A single-action redemption and anything upstream offered beyond it.
#[derive(Debug, Clone)]
pub struct RedeemPlan {
    /// Exactly the default action.
    pub steps: Vec<TransactionStep>,
    /// Names of extra actions (cooldown/claim flows) that were not taken.
    pub rejected_actions: Vec<String>,
}

/// Why a step stopped before confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// `eth_estimateGas` rejected the call; nothing was broadcast.
    GasEstimation(String),
    /// Native balance cannot pay for this step.
    InsufficientGas {
        balance: U256,
        required: U256,
        shortfall: U256,
    },
    /// Building or signing the raw transaction failed.
    Signing(String),
    /// The node refused the raw transaction.
    Broadcast(String),
    /// Any other RPC failure around the step.
    Rpc(String),
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GasEstimation(e) => write!(f, "gas estimation failed: {e}"),
            Self::InsufficientGas { shortfall, .. } => {
                write!(f, "insufficient gas balance (short {shortfall} wei)")
            }
            Self::Signing(e) => write!(f, "signing failed: {e}"),
            Self::Broadcast(e) => write!(f, "broadcast failed: {e}"),
            Self::Rpc(e) => write!(f, "rpc failure: {e}"),
        }
    }
}

/// Terminal state of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Mined with success status.
    Confirmed { block_number: Option<u64> },
    /// Mined with failure status.
    Reverted,
    /// Broadcast but no receipt within the confirmation window.
    Pending { waited_secs: u64 },
    /// Never made it on-chain.
    Failed(StepFailure),
}

impl StepOutcome {
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed { .. } => write!(f, "confirmed"),
            Self::Reverted => write!(f, "reverted"),
            Self::Pending { waited_secs } => write!(f, "pending after {waited_secs}s"),
            Self::Failed(reason) => write!(f, "{reason}"),
        }
    }
}

/// Record of one attempted step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// Position in the plan.
    pub index: usize,
    /// Step role.
    pub kind: StepKind,
    /// Target contract.
    pub to: Address,
    /// Hash, once broadcast.
    pub tx_hash: Option<TxHash>,
    /// How it ended.
    pub outcome: StepOutcome,
}

/// Outcome of running a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Attempted steps in order; steps after a failure are absent.
    pub steps: Vec<StepRecord>,
    /// Length of the plan that was submitted.
    pub total_steps: usize,
    /// Index of the first step that did not confirm.
    pub failed_index: Option<usize>,
}

impl ExecutionResult {
    pub const fn is_success(&self) -> bool {
        self.failed_index.is_none()
    }

    /// Hashes of every confirmed step, in plan order.
    pub fn confirmed_hashes(&self) -> Vec<TxHash> {
        self.steps
            .iter()
            .filter(|s| s.outcome.is_confirmed())
            .filter_map(|s| s.tx_hash)
            .collect()
    }

    /// The record of the failing step.
    pub fn failure(&self) -> Option<&StepRecord> {
        self.failed_index.and_then(|i| self.steps.get(i))
    }

    /// A confirmed approve left behind by a later failure.
    ///
    /// The allowance stays in place; it is reported, never revoked.
    pub fn orphaned_approval(&self) -> Option<&StepRecord> {
        self.failed_index?;
        self.steps
            .iter()
            .find(|s| s.kind == StepKind::Approve && s.outcome.is_confirmed())
    }

    /// Collapse into confirmed hashes or the error matching the failure.
    ///
    /// Single-step plans surface the specific revert/timeout/gas error;
    /// longer plans always report a partial execution so callers see which
    /// earlier steps already landed.
    pub fn into_result(self) -> Result<Vec<TxHash>> {
        let Some(failure) = self.failure().cloned() else {
            return Ok(self.confirmed_hashes());
        };

        if self.total_steps == 1 {
            match (&failure.outcome, failure.tx_hash) {
                (StepOutcome::Reverted, Some(tx_hash)) => {
                    return Err(AgentError::TransactionReverted {
                        index: failure.index,
                        tx_hash,
                    });
                }
                (StepOutcome::Pending { waited_secs }, Some(tx_hash)) => {
                    return Err(AgentError::TransactionTimeout {
                        index: failure.index,
                        tx_hash,
                        waited_secs: *waited_secs,
                    });
                }
                (
                    StepOutcome::Failed(StepFailure::InsufficientGas {
                        balance,
                        required,
                        shortfall,
                    }),
                    _,
                ) => {
                    return Err(AgentError::InsufficientGas {
                        balance: *balance,
                        required: *required,
                        shortfall: *shortfall,
                    });
                }
                _ => {}
            }
        }

        Err(AgentError::PartialExecution {
            completed: self.confirmed_hashes(),
            failed_index: failure.index,
            total_steps: self.total_steps,
            cause: format!("{} step {}", failure.kind, failure.outcome),
        })
    }
}
