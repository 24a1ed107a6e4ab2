//! Chain Adapters - EVM Interaction Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - RPC provider management with chain-ID validation
//! - Local private-key signing (transactions and EIP-712 digests)
//! - Native balance gas checks
//! - Sequential transaction execution with receipt polling

pub mod executor;
pub mod gas;
pub mod provider;
pub mod wallet;

pub use executor::{ExecutorConfig, TransactionExecutor};
pub use gas::{GasCheck, GasValidator};
pub use provider::EvmProvider;
pub use wallet::LocalWallet;
