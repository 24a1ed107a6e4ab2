//! Signer Port - Wallet Key Operations
//!
//! The wallet key signs two things: fully-populated transactions before
//! broadcast, and EIP-712 digests for x402 payment authorizations.

use alloy::primitives::{Address, B256, Bytes};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::error::Result;

/// Trait for the agent's single signing identity.
#[async_trait]
pub trait TransactionSigner: Send + Sync + 'static {
  /// Address derived from the key.
  fn address(&self) -> Address;

  /// Sign `tx` and return the EIP-2718 encoded envelope.
  ///
  /// `tx` must already carry nonce, gas limit, gas price and chain ID.
  async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes>;

  /// Sign a 32-byte digest, returning the 65-byte `r || s || v` signature.
  async fn sign_hash(&self, hash: B256) -> Result<Bytes>;
}
