//! Transaction Executor - Sequential Sign, Broadcast and Confirm
//!
//! Runs a plan's steps strictly in order. Each step is estimated, gas
//! checked, signed with a freshly fetched pending nonce, broadcast and
//! polled for a receipt. The first step that does not confirm stops the
//! plan; confirmed steps before it stay on-chain and are reported, never
//! reversed.

use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use tokio::time::{interval, timeout};
use tracing::{debug, info, instrument, warn};

use super::gas::GasValidator;
use crate::domain::plan::{ExecutionResult, StepFailure, StepOutcome, StepRecord, TransactionStep};
use crate::ports::chain_client::ChainClient;
use crate::ports::signer::TransactionSigner;

/// Executor tuning.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Chain ID stamped on every transaction.
    pub chain_id: u64,
    /// Gas limit as a percentage of the node's estimate.
    pub gas_limit_multiplier_pct: u64,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
    /// How long to wait for a receipt before reporting `Pending`.
    pub confirmation_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            chain_id: 8453,
            gas_limit_multiplier_pct: 150,
            poll_interval: Duration::from_secs(2),
            confirmation_timeout: Duration::from_secs(120),
        }
    }
}

/// Signs and submits plan steps one at a time.
pub struct TransactionExecutor<C, S> {
    chain: Arc<C>,
    signer: Arc<S>,
    gas: Arc<GasValidator<C>>,
    config: ExecutorConfig,
}

impl<C: ChainClient, S: TransactionSigner> TransactionExecutor<C, S> {
    pub const fn new(chain: Arc<C>, signer: Arc<S>, gas: Arc<GasValidator<C>>, config: ExecutorConfig) -> Self {
        Self {
            chain,
            signer,
            gas,
            config,
        }
    }

    /// Execute `steps` in order, stopping at the first non-confirmed step.
    #[instrument(skip(self, steps), fields(total_steps = steps.len()))]
    pub async fn execute(&self, steps: &[TransactionStep]) -> ExecutionResult {
        let mut records = Vec::with_capacity(steps.len());
        let mut failed_index = None;

        for (index, step) in steps.iter().enumerate() {
            let record = self.run_step(index, step).await;
            let confirmed = record.outcome.is_confirmed();

            if confirmed {
                info!(index, kind = %step.kind, tx_hash = ?record.tx_hash, "Step confirmed");
            } else {
                warn!(index, kind = %step.kind, tx_hash = ?record.tx_hash, outcome = %record.outcome, "Step failed; aborting plan");
            }

            records.push(record);
            if !confirmed {
                failed_index = Some(index);
                break;
            }
        }

        ExecutionResult {
            steps: records,
            total_steps: steps.len(),
            failed_index,
        }
    }

    async fn run_step(&self, index: usize, step: &TransactionStep) -> StepRecord {
        let (tx_hash, outcome) = match self.submit(step).await {
            Ok(tx_hash) => (Some(tx_hash), self.wait_for_receipt(tx_hash).await),
            Err(failure) => (None, StepOutcome::Failed(failure)),
        };
        StepRecord {
            index,
            kind: step.kind,
            to: step.to,
            tx_hash,
            outcome,
        }
    }

    /// Estimate, check, sign and broadcast. Nothing is sent on error.
    async fn submit(&self, step: &TransactionStep) -> Result<TxHash, StepFailure> {
        let from = self.signer.address();
        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(step.to)
            .with_input(step.data.clone())
            .with_value(step.value);

        let estimate = self
            .chain
            .estimate_gas(&request)
            .await
            .map_err(|e| StepFailure::GasEstimation(e.to_string()))?;
        let gas_limit = estimate.saturating_mul(self.config.gas_limit_multiplier_pct) / 100;
        let gas_price = self
            .chain
            .gas_price()
            .await
            .map_err(|e| StepFailure::Rpc(e.to_string()))?;

        let cost = U256::from(gas_limit).saturating_mul(U256::from(gas_price));
        let check = self
            .gas
            .validate_sufficient(cost)
            .await
            .map_err(|e| StepFailure::Rpc(e.to_string()))?;
        if !check.is_sufficient() {
            return Err(StepFailure::InsufficientGas {
                balance: check.balance,
                required: check.required,
                shortfall: check.shortfall,
            });
        }

        // Fetched per step so a stuck or external transaction is accounted for
        let nonce = self
            .chain
            .pending_nonce(from)
            .await
            .map_err(|e| StepFailure::Rpc(e.to_string()))?;

        let request = request
            .with_nonce(nonce)
            .with_chain_id(self.config.chain_id)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price);

        debug!(estimate, gas_limit, gas_price, nonce, "Signing step");
        let raw = self
            .signer
            .sign_transaction(request)
            .await
            .map_err(|e| StepFailure::Signing(e.to_string()))?;

        self.chain
            .send_raw_transaction(raw)
            .await
            .map_err(|e| StepFailure::Broadcast(e.to_string()))
    }

    /// Poll for a receipt until mined or the confirmation window closes.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> StepOutcome {
        let result = timeout(self.config.confirmation_timeout, async {
            let mut ticker = interval(self.config.poll_interval);

            loop {
                ticker.tick().await;

                match self.chain.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) if receipt.success => {
                        return StepOutcome::Confirmed {
                            block_number: receipt.block_number,
                        };
                    }
                    Ok(Some(_)) => return StepOutcome::Reverted,
                    Ok(None) => debug!(tx_hash = %tx_hash, "Transaction pending"),
                    Err(e) => warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed; still polling"),
                }
            }
        })
        .await;

        result.unwrap_or(StepOutcome::Pending {
            waited_secs: self.config.confirmation_timeout.as_secs(),
        })
    }
}
