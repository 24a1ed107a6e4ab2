//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use case layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `PaidApi`: x402 payment-gated upstream API
//! - `ChainClient`: EVM JSON-RPC reads and broadcast
//! - `TransactionSigner`: wallet key operations

pub mod chain_client;
pub mod paid_api;
pub mod signer;

pub use chain_client::{ChainClient, ReceiptStatus};
pub use paid_api::PaidApi;
pub use signer::TransactionSigner;
