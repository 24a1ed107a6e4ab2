//! Gas Validator - Native Balance Pre-flight Checks
//!
//! Confirms the wallet holds enough native token to pay for gas before
//! anything is broadcast. The orchestrator runs an approximate check
//! (gas price × nominal units) before spending on paid reads; the
//! executor runs a refined check per step with the real estimate.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::{debug, instrument, warn};

use crate::error::{AgentError, Result};
use crate::ports::chain_client::ChainClient;

/// Outcome of comparing the native balance with a required amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasCheck {
    /// Native balance, wei.
    pub balance: U256,
    /// Estimated cost plus buffer, wei.
    pub required: U256,
    /// `required - balance`, zero when covered.
    pub shortfall: U256,
}

impl GasCheck {
    pub fn is_sufficient(&self) -> bool {
        self.shortfall.is_zero()
    }

    /// Turn a failed check into `InsufficientGas`.
    pub fn into_result(self) -> Result<Self> {
        if self.is_sufficient() {
            Ok(self)
        } else {
            Err(AgentError::InsufficientGas {
                balance: self.balance,
                required: self.required,
                shortfall: self.shortfall,
            })
        }
    }
}

/// Native balance checker for the agent wallet.
pub struct GasValidator<C> {
    chain: Arc<C>,
    address: Address,
    /// Safety margin on top of the estimate, percent.
    buffer_pct: u32,
    /// Gas units assumed by the approximate pre-check.
    nominal_gas_units: u64,
}

impl<C: ChainClient> GasValidator<C> {
    pub const fn new(chain: Arc<C>, address: Address, buffer_pct: u32, nominal_gas_units: u64) -> Self {
        Self {
            chain,
            address,
            buffer_pct,
            nominal_gas_units,
        }
    }

    /// Native balance in wei.
    pub async fn balance(&self) -> Result<U256> {
        self.chain.native_balance(self.address).await
    }

    /// Best-effort cost of a typical transaction at the current gas price.
    pub async fn approximate_cost(&self) -> Result<U256> {
        let gas_price = self.chain.gas_price().await?;
        Ok(U256::from(gas_price).saturating_mul(U256::from(self.nominal_gas_units)))
    }

    /// `cost` with the configured buffer applied.
    pub fn with_buffer(&self, cost: U256) -> U256 {
        cost.saturating_mul(U256::from(100 + self.buffer_pct)) / U256::from(100u8)
    }

    /// Compare the balance against `estimated_cost` plus buffer.
    #[instrument(skip(self), fields(address = %self.address))]
    pub async fn validate_sufficient(&self, estimated_cost: U256) -> Result<GasCheck> {
        let balance = self.balance().await?;
        let required = self.with_buffer(estimated_cost);
        let check = GasCheck {
            balance,
            required,
            shortfall: required.saturating_sub(balance),
        };

        if check.is_sufficient() {
            debug!(balance = %balance, required = %required, "Gas balance sufficient");
        } else {
            warn!(
                balance = %balance,
                required = %required,
                shortfall = %check.shortfall,
                "Insufficient native balance for gas"
            );
        }
        Ok(check)
    }

    /// Approximate pre-check; fails with `InsufficientGas` on a shortfall.
    pub async fn ensure_approximate(&self) -> Result<GasCheck> {
        let cost = self.approximate_cost().await?;
        self.validate_sufficient(cost).await?.into_result()
    }
}
