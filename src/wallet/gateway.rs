//! Shared handle to the attached wallet provider.

use std::sync::Arc;

use alloy::primitives::{Address, B256};
use bigdecimal::num_bigint::BigInt;
use tracing::debug;

use crate::contracts;
use crate::error::BridgeError;
use crate::types::BlockSummary;

use super::{hex_bytes, CallRequest, TxEventStream, WalletContext, WalletProvider};

/// Cloneable wallet handle. A gateway may have no provider attached, in
/// which case every wallet operation fails with
/// [`BridgeError::ProviderUnavailable`] and validation reports the absence.
#[derive(Clone)]
pub struct WalletGateway {
    provider: Option<Arc<dyn WalletProvider>>,
}

impl WalletGateway {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Gateway with no provider attached.
    pub fn detached() -> Self {
        Self { provider: None }
    }

    pub fn is_attached(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Result<&Arc<dyn WalletProvider>, BridgeError> {
        self.provider
            .as_ref()
            .ok_or(BridgeError::ProviderUnavailable)
    }

    /// Snapshot of wallet availability. Probe failures degrade to absent
    /// fields rather than errors so validation can report them.
    pub async fn context(&self) -> WalletContext {
        let provider = match &self.provider {
            Some(provider) => provider,
            None => return WalletContext::default(),
        };
        let accounts = provider.request_accounts().await.unwrap_or_default();
        let chain_id = provider.chain_id().await.ok();
        WalletContext {
            provider_present: true,
            chain_id,
            accounts,
        }
    }

    /// ERC-20 allowance granted by `owner` to `spender` on `token`.
    pub async fn read_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<BigInt, BridgeError> {
        let request = CallRequest {
            to: token,
            data: Some(hex_bytes(&contracts::allowance_data(owner, spender))),
            ..Default::default()
        };
        let result = self.provider()?.call(&request).await?;
        Ok(contracts::decode_uint(&result)?)
    }

    /// Whether `operator` may move all of `owner`'s tokens on `token`.
    pub async fn read_approval_for_all(
        &self,
        token: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool, BridgeError> {
        let request = CallRequest {
            to: token,
            data: Some(hex_bytes(&contracts::is_approved_for_all_data(owner, operator))),
            ..Default::default()
        };
        let result = self.provider()?.call(&request).await?;
        Ok(contracts::decode_bool(&result)?)
    }

    pub async fn block_by_hash(&self, hash: B256) -> Result<Option<BlockSummary>, BridgeError> {
        Ok(self.provider()?.get_block_by_hash(hash).await?)
    }

    /// Estimate gas for `request`, pad the estimate by a fifth, and submit.
    /// Estimation failure aborts the submission.
    pub async fn send_with_estimated_gas(
        &self,
        mut request: CallRequest,
    ) -> Result<TxEventStream, BridgeError> {
        let provider = self.provider()?;
        let estimate = provider.estimate_gas(&request).await?;
        let limit = estimate + estimate / 5;
        debug!(estimate, limit, "gas estimated");
        request.gas = Some(format!("0x{limit:x}"));
        Ok(provider.send(&request).await?)
    }

    /// Track an already-submitted transaction by hash.
    pub async fn watch(&self, tx_hash: B256) -> Result<TxEventStream, BridgeError> {
        Ok(self.provider()?.watch(tx_hash).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainDescriptor;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct StubProvider {
        sent_gas: Mutex<Option<String>>,
    }

    #[async_trait]
    impl WalletProvider for StubProvider {
        async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
            Ok(vec![Address::repeat_byte(0x01)])
        }

        async fn chain_id(&self) -> Result<u64, ProviderError> {
            Ok(5700)
        }

        async fn switch_chain(&self, _chain_id: u64) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn register_chain(
            &self,
            _descriptor: &ChainDescriptor,
        ) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn call(&self, _request: &CallRequest) -> Result<String, ProviderError> {
            Ok(format!("0x{:064x}", 250))
        }

        async fn estimate_gas(&self, _request: &CallRequest) -> Result<u64, ProviderError> {
            Ok(100_000)
        }

        async fn get_block_by_hash(
            &self,
            _hash: B256,
        ) -> Result<Option<BlockSummary>, ProviderError> {
            Ok(None)
        }

        async fn send(&self, request: &CallRequest) -> Result<TxEventStream, ProviderError> {
            *self.sent_gas.lock().unwrap() = request.gas.clone();
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn watch(&self, _tx_hash: B256) -> Result<TxEventStream, ProviderError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn test_detached_gateway() {
        let gateway = WalletGateway::detached();
        assert!(!gateway.is_attached());

        let context = gateway.context().await;
        assert!(!context.provider_present);
        assert!(context.accounts.is_empty());

        let result = gateway
            .read_allowance(
                Address::repeat_byte(0x02),
                Address::repeat_byte(0x01),
                Address::repeat_byte(0x03),
            )
            .await;
        assert!(matches!(result, Err(BridgeError::ProviderUnavailable)));
    }

    #[tokio::test]
    async fn test_context_snapshot() {
        let gateway = WalletGateway::new(Arc::new(StubProvider {
            sent_gas: Mutex::new(None),
        }));
        let context = gateway.context().await;
        assert!(context.provider_present);
        assert_eq!(context.chain_id, Some(5700));
        assert_eq!(context.active_account(), Some(Address::repeat_byte(0x01)));
    }

    #[tokio::test]
    async fn test_allowance_read_decodes_quantity() {
        let gateway = WalletGateway::new(Arc::new(StubProvider {
            sent_gas: Mutex::new(None),
        }));
        let allowance = gateway
            .read_allowance(
                Address::repeat_byte(0x02),
                Address::repeat_byte(0x01),
                Address::repeat_byte(0x03),
            )
            .await
            .unwrap();
        assert_eq!(allowance, BigInt::from(250));
    }

    #[tokio::test]
    async fn test_gas_estimate_padded_by_fifth() {
        let provider = Arc::new(StubProvider {
            sent_gas: Mutex::new(None),
        });
        let gateway = WalletGateway::new(provider.clone());
        let request = CallRequest {
            to: Address::repeat_byte(0x11),
            ..Default::default()
        };
        gateway.send_with_estimated_gas(request).await.unwrap();

        let sent = provider.sent_gas.lock().unwrap().clone();
        assert_eq!(sent, Some(format!("0x{:x}", 120_000)));
    }
}
