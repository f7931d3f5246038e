//! JSON-RPC wallet provider
//!
//! Headless [`WalletProvider`] for deployments where the signer runs next to
//! the node: submissions go through `eth_sendTransaction` against
//! node-managed accounts. Wallet-extension methods (chain switch and
//! registration) are forwarded as-is; a node without them answers with an
//! error, which surfaces as a rejection.

use std::time::Duration;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::warn;

use crate::config::{BridgeConfig, ChainDescriptor};
use crate::error::ProviderError;
use crate::types::{BlockSummary, TxReceipt};

use super::{CallRequest, TxEvent, TxEventStream, WalletProvider, EVENT_CHANNEL_CAPACITY};

/// JSON-RPC response wrapper
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

/// JSON-RPC error object
#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Transaction receipt as returned over the wire, quantities still hex.
#[derive(Debug, Clone, Deserialize)]
struct RpcReceipt {
    #[serde(rename = "transactionHash")]
    transaction_hash: B256,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
    #[serde(rename = "blockHash")]
    block_hash: Option<B256>,
    status: Option<String>,
    #[serde(rename = "gasUsed")]
    gas_used: Option<String>,
}

impl RpcReceipt {
    fn into_receipt(self) -> Result<TxReceipt, ProviderError> {
        let block_number = self.block_number.as_deref().map(parse_quantity).transpose()?;
        let status = self
            .status
            .as_deref()
            .map(|s| parse_quantity(s).map(|v| v != 0))
            .transpose()?;
        let gas_used = self.gas_used.as_deref().map(parse_quantity).transpose()?;
        Ok(TxReceipt {
            transaction_hash: self.transaction_hash,
            block_number,
            block_hash: self.block_hash,
            status,
            gas_used,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    number: String,
    hash: B256,
}

fn parse_quantity(hex: &str) -> Result<u64, ProviderError> {
    u64::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| ProviderError::InvalidResponse(format!("bad hex quantity {hex:?}: {e}")))
}

fn rpc_error(error: RpcErrorBody) -> ProviderError {
    match error.code {
        4902 => ProviderError::ChainNotRegistered,
        code => ProviderError::Rejected {
            code,
            message: error.message,
        },
    }
}

#[derive(Clone)]
struct RpcClient {
    rpc_url: String,
    client: Client,
}

impl RpcClient {
    /// POST one JSON-RPC request; `None` when the node answers `result: null`.
    async fn request_opt<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, ProviderError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?
            .json::<RpcResponse<T>>()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(rpc_error(error));
        }
        Ok(response.result)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        self.request_opt(method, params).await?.ok_or_else(|| {
            ProviderError::InvalidResponse(format!("{method} returned no result"))
        })
    }
}

/// Provider speaking JSON-RPC 2.0 to a single endpoint.
pub struct HttpProvider {
    rpc: RpcClient,
    poll_interval: Duration,
    confirmation_target: u32,
}

impl HttpProvider {
    pub fn new(config: &BridgeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            rpc: RpcClient {
                rpc_url: config.rpc_url.clone(),
                client,
            },
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            confirmation_target: config.confirmation_target,
        })
    }

    fn spawn_poller(&self, tx_hash: B256) -> TxEventStream {
        let (events, stream) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let poller = Poller {
            rpc: self.rpc.clone(),
            poll_interval: self.poll_interval,
            confirmation_target: self.confirmation_target,
        };
        tokio::spawn(async move { poller.track(tx_hash, events).await });
        stream
    }
}

#[async_trait]
impl WalletProvider for HttpProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.rpc.request("eth_accounts", json!([])).await
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let hex: String = self.rpc.request("eth_chainId", json!([])).await?;
        parse_quantity(&hex)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.rpc
            .request_opt::<Value>(
                "wallet_switchEthereumChain",
                json!([{ "chainId": format!("0x{chain_id:x}") }]),
            )
            .await?;
        Ok(())
    }

    async fn register_chain(&self, descriptor: &ChainDescriptor) -> Result<(), ProviderError> {
        self.rpc
            .request_opt::<Value>("wallet_addEthereumChain", json!([descriptor]))
            .await?;
        Ok(())
    }

    async fn call(&self, request: &CallRequest) -> Result<String, ProviderError> {
        self.rpc.request("eth_call", json!([request, "latest"])).await
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ProviderError> {
        let hex: String = self.rpc.request("eth_estimateGas", json!([request])).await?;
        parse_quantity(&hex)
    }

    async fn get_block_by_hash(&self, hash: B256) -> Result<Option<BlockSummary>, ProviderError> {
        let block = self
            .rpc
            .request_opt::<RpcBlock>("eth_getBlockByHash", json!([hash, false]))
            .await?;
        match block {
            Some(block) => Ok(Some(BlockSummary {
                number: parse_quantity(&block.number)?,
                hash: block.hash,
            })),
            None => Ok(None),
        }
    }

    async fn send(&self, request: &CallRequest) -> Result<TxEventStream, ProviderError> {
        let hash: B256 = self
            .rpc
            .request("eth_sendTransaction", json!([request]))
            .await?;
        Ok(self.spawn_poller(hash))
    }

    async fn watch(&self, tx_hash: B256) -> Result<TxEventStream, ProviderError> {
        Ok(self.spawn_poller(tx_hash))
    }
}

/// Receipt poller for one transaction. Emits the hash, then a confirmation
/// event per new depth, and closes the stream at the target depth. The
/// containing block counts as the first confirmation.
struct Poller {
    rpc: RpcClient,
    poll_interval: Duration,
    confirmation_target: u32,
}

impl Poller {
    async fn track(self, tx_hash: B256, events: mpsc::Sender<TxEvent>) {
        if events.send(TxEvent::Hash(tx_hash)).await.is_err() {
            return;
        }

        let mut reported: u32 = 0;
        loop {
            sleep(self.poll_interval).await;

            // Receiver gone means nobody is interested anymore.
            if events.is_closed() {
                return;
            }

            let receipt = match self
                .rpc
                .request_opt::<RpcReceipt>("eth_getTransactionReceipt", json!([tx_hash]))
                .await
            {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!(%tx_hash, error = %e, "receipt poll failed");
                    continue;
                }
            };
            // No receipt yet, still pending.
            let Some(receipt) = receipt else { continue };

            let receipt = match receipt.into_receipt() {
                Ok(receipt) => receipt,
                Err(e) => {
                    let _ = events
                        .send(TxEvent::Error {
                            message: e.to_string(),
                            receipt: None,
                        })
                        .await;
                    return;
                }
            };

            if receipt.status == Some(false) {
                let _ = events
                    .send(TxEvent::Error {
                        message: "transaction reverted".to_string(),
                        receipt: Some(receipt),
                    })
                    .await;
                return;
            }

            let Some(tx_block) = receipt.block_number else {
                continue;
            };
            let current = match self.rpc.request::<String>("eth_blockNumber", json!([])).await {
                Ok(hex) => match parse_quantity(&hex) {
                    Ok(number) => number,
                    Err(e) => {
                        warn!(error = %e, "bad block number");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(error = %e, "block number poll failed");
                    continue;
                }
            };

            let confirmations = (current.saturating_sub(tx_block) + 1) as u32;
            if confirmations > reported {
                reported = confirmations;
                let event = TxEvent::Confirmation {
                    number: confirmations,
                    receipt: receipt.clone(),
                };
                if events.send(event).await.is_err() {
                    return;
                }
            }
            if reported >= self.confirmation_target {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1644").unwrap(), 5700);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("5700x").is_err());
    }

    #[test]
    fn test_rpc_error_mapping() {
        let unregistered = rpc_error(RpcErrorBody {
            code: 4902,
            message: "Unrecognized chain ID".to_string(),
        });
        assert_eq!(unregistered, ProviderError::ChainNotRegistered);

        let rejected = rpc_error(RpcErrorBody {
            code: 4001,
            message: "User rejected the request.".to_string(),
        });
        assert_eq!(
            rejected,
            ProviderError::Rejected {
                code: 4001,
                message: "User rejected the request.".to_string(),
            }
        );
    }

    #[test]
    fn test_error_response_deserializes() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":4902,"message":"unknown chain"}}"#;
        let response: RpcResponse<String> = serde_json::from_str(raw).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, 4902);
    }

    #[test]
    fn test_receipt_conversion() {
        let raw = json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x10",
            "blockHash": format!("0x{}", "22".repeat(32)),
            "status": "0x1",
            "gasUsed": "0x5208"
        });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        let receipt = receipt.into_receipt().unwrap();

        assert_eq!(receipt.transaction_hash, B256::repeat_byte(0x11));
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.status, Some(true));
        assert_eq!(receipt.gas_used, Some(21000));
    }

    #[test]
    fn test_reverted_receipt_status() {
        let raw = json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x10",
            "blockHash": null,
            "status": "0x0",
            "gasUsed": null
        });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        let receipt = receipt.into_receipt().unwrap();
        assert_eq!(receipt.status, Some(false));
    }
}
