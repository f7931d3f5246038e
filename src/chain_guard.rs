//! Active-chain enforcement
//!
//! Every submission attempt goes through [`ChainGuard::ensure`], which puts
//! the wallet on the bridge chain, registering it on first use, and verifies
//! the switch took effect. Nothing is cached between attempts.

use tracing::{debug, info};

use crate::config::{BridgeConfig, ChainDescriptor};
use crate::error::{BridgeError, ProviderError};
use crate::wallet::WalletProvider;

pub struct ChainGuard {
    target_chain_id: u64,
    descriptor: ChainDescriptor,
}

/// Surface the wallet's own wording; users see these messages.
fn chain_error(error: ProviderError) -> BridgeError {
    match error {
        ProviderError::Rejected { message, .. } => BridgeError::Chain(message),
        other => BridgeError::Chain(other.to_string()),
    }
}

impl ChainGuard {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            target_chain_id: config.chain_id,
            descriptor: config.descriptor(),
        }
    }

    /// Switch the wallet to the bridge chain. A chain the wallet does not
    /// know is registered and the switch retried exactly once; the active
    /// chain id is re-read afterwards and must match.
    pub async fn ensure(&self, provider: &dyn WalletProvider) -> Result<(), BridgeError> {
        match provider.switch_chain(self.target_chain_id).await {
            Ok(()) => {}
            Err(ProviderError::ChainNotRegistered) => {
                info!(
                    chain_id = self.target_chain_id,
                    "chain not registered with wallet, adding it"
                );
                provider
                    .register_chain(&self.descriptor)
                    .await
                    .map_err(chain_error)?;
                provider
                    .switch_chain(self.target_chain_id)
                    .await
                    .map_err(chain_error)?;
            }
            Err(e) => return Err(chain_error(e)),
        }

        let active = provider.chain_id().await.map_err(chain_error)?;
        if active != self.target_chain_id {
            return Err(BridgeError::Chain(format!(
                "wallet is on chain {active}, expected {}",
                self.target_chain_id
            )));
        }
        debug!(chain_id = active, "active chain verified");
        Ok(())
    }
}
