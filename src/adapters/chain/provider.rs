//! EVM RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Manages the connection to the configured EVM chain via alloy-rs.
//! Validates the chain ID at startup and implements the `ChainClient`
//! port. Every call is bounded by a fixed timeout.
//!
//! In alloy 0.9, `ProviderBuilder::new().on_http()` returns a complex
//! filler type. We store it as a type-erased `dyn Provider` to keep
//! the API clean across the adapter layer.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::error::{AgentError, Result};
use crate::ports::chain_client::{ChainClient, ReceiptStatus};

/// Shared RPC provider backed by alloy-rs 0.9.
///
/// Uses `dyn Provider` for type erasure because alloy 0.9's
/// `ProviderBuilder::new().on_http()` returns a deeply-nested
/// generic filler type that would leak implementation details.
pub struct EvmProvider {
    /// The alloy HTTP provider (type-erased).
    provider: Arc<dyn Provider<Http<Client>> + Send + Sync>,
    /// Bound on every RPC round trip.
    timeout: Duration,
}

impl EvmProvider {
    /// Connect to the RPC endpoint and validate the chain ID.
    ///
    /// The URL comes from `config.toml` and may embed an API key, so it
    /// is never logged.
    #[instrument(skip_all, fields(expected_chain_id))]
    pub async fn connect(rpc_url: &str, expected_chain_id: u64, timeout: Duration) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| AgentError::Configuration(format!("invalid RPC URL: {e}")))?;

        // alloy 0.9: on_http() is synchronous, returns impl Provider
        let provider = ProviderBuilder::new().on_http(url);

        // Wrap in Arc<dyn Provider> for type erasure
        let provider: Arc<dyn Provider<Http<Client>> + Send + Sync> = Arc::new(provider);

        let this = Self { provider, timeout };
        let chain_id = this.chain_id().await?;

        if chain_id != expected_chain_id {
            return Err(AgentError::Configuration(format!(
                "expected chain_id={expected_chain_id}, RPC reports {chain_id}"
            )));
        }

        info!(chain_id, "Connected to RPC");
        Ok(this)
    }

    /// Run one RPC future under the configured timeout.
    async fn bounded<T, E, F>(&self, method: &'static str, fut: F) -> Result<T>
    where
        E: Display,
        F: Future<Output = std::result::Result<T, E>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AgentError::Rpc(format!("{method}: {e}"))),
            Err(_) => Err(AgentError::Rpc(format!(
                "{method}: timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl ChainClient for EvmProvider {
    async fn native_balance(&self, address: Address) -> Result<U256> {
        self.bounded("eth_getBalance", async { self.provider.get_balance(address).await })
            .await
    }

    async fn gas_price(&self) -> Result<u128> {
        let price = self
            .bounded("eth_gasPrice", async { self.provider.get_gas_price().await })
            .await?;
        debug!(gas_price_wei = price, "Gas price read");
        Ok(price)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64> {
        self.bounded("eth_estimateGas", async { self.provider.estimate_gas(tx).await })
            .await
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64> {
        self.bounded("eth_getTransactionCount", async {
            self.provider.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash> {
        self.bounded("eth_sendRawTransaction", async {
            self.provider
                .send_raw_transaction(&raw)
                .await
                .map(|pending| *pending.tx_hash())
        })
        .await
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<ReceiptStatus>> {
        let receipt = self
            .bounded("eth_getTransactionReceipt", async {
                self.provider.get_transaction_receipt(tx_hash).await
            })
            .await?;

        Ok(receipt.map(|r| ReceiptStatus {
            success: r.status(),
            block_number: r.block_number,
        }))
    }

    async fn chain_id(&self) -> Result<u64> {
        self.bounded("eth_chainId", async { self.provider.get_chain_id().await })
            .await
    }
}
