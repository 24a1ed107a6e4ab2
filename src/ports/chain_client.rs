//! Chain Client Port - EVM RPC Interface
//!
//! The narrow set of JSON-RPC reads and writes the agent needs: native
//! balance, gas price, gas estimation, nonce, raw broadcast and receipt
//! lookup. Signing is a separate port so the RPC side never holds keys.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::error::Result;

/// Mined status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptStatus {
  /// `true` for status 1, `false` for a revert.
  pub success: bool,
  /// Block the transaction was included in.
  pub block_number: Option<u64>,
}

/// Trait for on-chain interactions via alloy-rs.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
  /// Native (gas token) balance in wei.
  async fn native_balance(&self, address: Address) -> Result<U256>;

  /// Current gas price in wei.
  async fn gas_price(&self) -> Result<u128>;

  /// Gas units the node expects `tx` to consume.
  ///
  /// An error here usually means the call would revert.
  async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64>;

  /// Next nonce for `address`, counting pending transactions.
  async fn pending_nonce(&self, address: Address) -> Result<u64>;

  /// Broadcast a signed, EIP-2718 encoded transaction.
  async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash>;

  /// Receipt for `tx_hash`, or `None` while not yet mined.
  async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<ReceiptStatus>>;

  /// Chain ID reported by the node.
  async fn chain_id(&self) -> Result<u64>;
}
