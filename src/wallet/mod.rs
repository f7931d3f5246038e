//! Wallet access
//!
//! Everything the orchestrator needs from a wallet goes through the
//! [`WalletProvider`] trait: account discovery, chain management, contract
//! reads, and transaction submission with a stream of lifecycle events.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use bigdecimal::num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::ChainDescriptor;
use crate::error::ProviderError;
use crate::types::{BlockSummary, TxReceipt};

pub mod gateway;
#[cfg(feature = "http")]
pub mod http;

pub use gateway::WalletGateway;

/// Capacity of per-submission event channels.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Call parameters in the wire shape wallets accept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    /// Hex-encoded wei quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Hex-encoded calldata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Hex-encoded gas limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
}

/// 0x-prefixed hex for raw bytes.
pub fn hex_bytes(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// 0x-prefixed hex quantity for a non-negative integer.
pub fn hex_uint(value: &BigInt) -> String {
    format!("0x{}", value.to_str_radix(16))
}

/// Lifecycle event for a submitted transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TxEvent {
    /// Wallet accepted the submission and returned its hash.
    Hash(B256),
    /// The transaction is included and has this many confirmations.
    Confirmation { number: u32, receipt: TxReceipt },
    /// Submission or tracking failed.
    Error {
        message: String,
        receipt: Option<TxReceipt>,
    },
}

/// Stream of [`TxEvent`]s for one submission. Closes once the confirmation
/// target is reached or a terminal error was emitted.
pub type TxEventStream = mpsc::Receiver<TxEvent>;

/// Snapshot of wallet availability, taken before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletContext {
    pub provider_present: bool,
    pub chain_id: Option<u64>,
    pub accounts: Vec<Address>,
}

impl WalletContext {
    /// First unlocked account, the one submissions are signed with.
    pub fn active_account(&self) -> Option<Address> {
        self.accounts.first().copied()
    }
}

/// Wallet-side operations the bridge depends on.
///
/// Implementations wrap an EIP-1193 style provider. Errors carry the
/// provider's numeric code so user rejections (4001) and unregistered
/// chains (4902) stay distinguishable.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts the wallet exposes, requesting access if needed.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Chain the wallet is currently on.
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Ask the wallet to switch to `chain_id`.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// Register a chain the wallet does not know yet.
    async fn register_chain(&self, descriptor: &ChainDescriptor) -> Result<(), ProviderError>;

    /// Read-only contract call; returns the raw hex result.
    async fn call(&self, request: &CallRequest) -> Result<String, ProviderError>;

    /// Gas estimate for a call.
    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ProviderError>;

    /// Block lookup by hash; `None` when the node does not know the block.
    async fn get_block_by_hash(&self, hash: B256) -> Result<Option<BlockSummary>, ProviderError>;

    /// Submit a transaction and stream its lifecycle events.
    async fn send(&self, request: &CallRequest) -> Result<TxEventStream, ProviderError>;

    /// Track an already-submitted transaction by hash.
    async fn watch(&self, tx_hash: B256) -> Result<TxEventStream, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_request_serialization() {
        let request = CallRequest {
            to: Address::repeat_byte(0x11),
            data: Some("0xdead".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["to"], "0x1111111111111111111111111111111111111111");
        assert_eq!(json["data"], "0xdead");
        assert!(json.get("from").is_none());
        assert!(json.get("value").is_none());
        assert!(json.get("gas").is_none());
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(hex_bytes(&[0xde, 0xad]), "0xdead");
        assert_eq!(hex_bytes(&[]), "0x");
        assert_eq!(hex_uint(&BigInt::from(5700)), "0x1644");
    }

    #[test]
    fn test_active_account() {
        let context = WalletContext::default();
        assert!(context.active_account().is_none());

        let context = WalletContext {
            provider_present: true,
            chain_id: Some(5700),
            accounts: vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)],
        };
        assert_eq!(context.active_account(), Some(Address::repeat_byte(0x01)));
    }
}
