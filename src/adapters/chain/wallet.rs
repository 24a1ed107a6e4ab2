//! Local Wallet - Private-Key Signer
//!
//! Holds the agent's single signing key. The key is read from the
//! `PRIVATE_KEY` environment variable (a `.env` file is honoured) and is
//! never logged, serialized or printed by `Debug`.

use std::fmt;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, B256, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::Signer;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::info;

use crate::error::{AgentError, Result};
use crate::ports::signer::TransactionSigner;

/// Environment variable holding the hex private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";

/// Wallet backed by an in-memory private key.
pub struct LocalWallet {
    signer: PrivateKeySigner,
    wallet: EthereumWallet,
}

impl LocalWallet {
    /// Create a wallet from a hex private key (with or without `0x`).
    pub fn from_hex(private_key_hex: &str) -> Result<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| AgentError::Configuration(format!("invalid private key format: {e}")))?;
        let wallet = EthereumWallet::from(signer.clone());

        info!(address = %signer.address(), "Wallet initialized");
        Ok(Self { signer, wallet })
    }

    /// Load the key from `PRIVATE_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            AgentError::Configuration(format!("environment variable {PRIVATE_KEY_ENV_VAR} not set"))
        })?;
        Self::from_hex(&key)
    }
}

impl fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.signer.address())
            .field("key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl TransactionSigner for LocalWallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes> {
        let envelope = tx
            .with_from(self.signer.address())
            .build(&self.wallet)
            .await
            .map_err(|e| AgentError::Signing(e.to_string()))?;
        Ok(Bytes::from(envelope.encoded_2718()))
    }

    async fn sign_hash(&self, hash: B256) -> Result<Bytes> {
        let signature = self
            .signer
            .sign_hash(&hash)
            .await
            .map_err(|e| AgentError::Signing(e.to_string()))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{U256, address};

    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_address_derivation() {
        let wallet = LocalWallet::from_hex(ANVIL_KEY).unwrap();
        assert_eq!(wallet.address(), address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
    }

    #[test]
    fn test_prefix_is_optional() {
        let bare = LocalWallet::from_hex(ANVIL_KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(bare.address(), address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(matches!(LocalWallet::from_hex("0xnothex"), Err(AgentError::Configuration(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = LocalWallet::from_hex(ANVIL_KEY).unwrap();
        let debug = format!("{wallet:?}");
        assert!(debug.contains("redacted"));
        assert!(!debug.contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478"));
    }

    #[test]
    fn test_sign_hash_is_65_bytes() {
        let wallet = LocalWallet::from_hex(ANVIL_KEY).unwrap();
        let sig = tokio_test::block_on(wallet.sign_hash(B256::repeat_byte(7))).unwrap();
        assert_eq!(sig.len(), 65);
    }

    #[tokio::test]
    async fn test_sign_legacy_transaction() {
        let wallet = LocalWallet::from_hex(ANVIL_KEY).unwrap();
        let tx = TransactionRequest::default()
            .with_to(address!("1111111111111111111111111111111111111111"))
            .with_value(U256::ZERO)
            .with_input(Bytes::from(vec![0x6e, 0x55, 0x3f, 0x65]))
            .with_nonce(0)
            .with_chain_id(8453)
            .with_gas_limit(100_000)
            .with_gas_price(1_000_000_000);
        let raw = wallet.sign_transaction(tx).await.unwrap();
        assert!(!raw.is_empty());
    }
}
