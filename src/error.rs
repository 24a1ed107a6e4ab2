//! Error Taxonomy - Structured Failures for Every Pipeline Stage
//!
//! Every failure carries enough context (amounts, addresses, step indices,
//! filter counts) for the caller to render an actionable message. Nothing
//! in the pipeline swallows an error; the only automatic retry is the
//! post-deployment position refresh, which is not failure recovery.

use alloy::primitives::{TxHash, U256};
use thiserror::Error;

use crate::domain::selector::SelectionBreakdown;

/// Convenience alias used across ports, adapters and use cases.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Top-level error for all agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Invalid or incomplete configuration (fatal at startup).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller supplied an argument outside its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Native balance cannot cover the estimated transaction cost plus buffer.
    #[error("insufficient native balance for gas: have {balance} wei, need {required} wei (short {shortfall} wei)")]
    InsufficientGas {
        balance: U256,
        required: U256,
        shortfall: U256,
    },

    /// Asset balance cannot cover the requested operation.
    #[error("insufficient balance: available {available} minor units, need at least {requested}")]
    InsufficientBalance { available: u128, requested: u128 },

    /// Computed deposit is below the configured minimum.
    #[error("deposit of {amount} minor units is below the minimum of {minimum}")]
    BelowMinimumDeposit { amount: u128, minimum: u128 },

    /// Every candidate vault was excluded.
    #[error("no suitable vault: {0}")]
    NoSuitableVault(SelectionBreakdown),

    /// No current position matches the nickname.
    #[error("position '{nickname}' not found (available: {})", available.join(", "))]
    PositionNotFound {
        nickname: String,
        available: Vec<String>,
    },

    /// x402 payment negotiation failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Upstream API answered with a non-2xx status or an unexpected shape.
    #[error("API error on {endpoint} (status {status}): {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// HTTP transport failure (connect, timeout, TLS).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Chain RPC failure or timeout.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Signing a transaction or payment authorization failed.
    #[error("signing error: {0}")]
    Signing(String),

    /// Single-step plan reverted on-chain.
    #[error("transaction {tx_hash} at step {index} reverted")]
    TransactionReverted { index: usize, tx_hash: TxHash },

    /// Single-step plan broadcast but not mined within the confirmation window.
    #[error("transaction {tx_hash} at step {index} still pending after {waited_secs}s")]
    TransactionTimeout {
        index: usize,
        tx_hash: TxHash,
        waited_secs: u64,
    },

    /// Multi-step plan stopped part-way; earlier steps remain on-chain.
    #[error(
        "execution stopped at step {failed_index} of {total_steps} ({cause}); confirmed earlier: {}; any approval among them was left in place, not revoked",
        format_hashes(completed)
    )]
    PartialExecution {
        completed: Vec<TxHash>,
        failed_index: usize,
        total_steps: usize,
        cause: String,
    },
}

/// Failures of the x402 challenge/response exchange.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// 402 body could not be decoded as a payment challenge.
    #[error("malformed payment challenge: {0}")]
    MalformedChallenge(String),

    /// No offered requirement matches the configured network and asset.
    #[error("no acceptable payment requirement (wanted scheme=exact network={network} asset={asset})")]
    NoAcceptableRequirement { network: String, asset: String },

    /// Required amount exceeds the per-call payment cap.
    #[error("payment of {required} minor units exceeds the cap of {cap}")]
    AmountExceedsCap { required: u128, cap: u128 },

    /// Server rejected the paid retry with another 402.
    #[error("payment rejected by server: {0}")]
    Rejected(String),

    /// Server challenged again with a different nonce than the one signed.
    #[error("payment nonce mismatch: signed {signed}, server expects {expected}")]
    NonceMismatch { signed: String, expected: String },

    /// Payer does not hold enough of the payment asset.
    #[error("insufficient funds for payment: {0}")]
    InsufficientFunds(String),
}

fn format_hashes(hashes: &[TxHash]) -> String {
    if hashes.is_empty() {
        return "none".to_string();
    }
    hashes.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
