//! Bridge configuration
//!
//! Loaded once at startup and read-only afterwards. Every knob falls back to
//! the Syscoin Tanenbaum testnet defaults, so a bare environment produces a
//! working testnet setup; any `BRIDGE_*` variable overrides its field.

use std::env;
use std::path::Path;

use alloy::primitives::{address, Address, B256};
use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use url::Url;

const TANENBAUM_CHAIN_ID: u64 = 5700;
const TANENBAUM_CHAIN_NAME: &str = "Syscoin Tanenbaum Testnet";
const TANENBAUM_RPC_URL: &str = "https://rpc.tanenbaum.io";
const TANENBAUM_EXPLORER_URL: &str = "https://tanenbaum.io";
const TANENBAUM_ERC20_MANAGER: Address = address!("A738a563F9ecb55e0b2245D1e9E380f0fE455ea1");
const TANENBAUM_RELAY_CONTRACT: Address = address!("D822557aC2F2b77A1988617308e4A29A89Cb95A6");
const TANENBAUM_SYSX_ASSET_GUID: &str = "123456";

/// Native-currency metadata advertised when registering the chain with a
/// wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Chain-registration descriptor in the shape wallets expect
/// (`wallet_addEthereumChain`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    /// Hex-encoded chain id, e.g. `0x1644`.
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

/// Main configuration for the bridge core.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Required NEVM chain id for every signing operation.
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    pub explorer_url: String,
    pub native_currency: NativeCurrency,
    /// Manager contract receiving `freezeBurn` calls.
    pub erc20_manager: Address,
    /// Relay contract receiving `relayTx` calls.
    pub relay_contract: Address,
    /// Asset GUID of the bridged SYSX asset on the UTXO chain.
    pub sysx_asset_guid: String,
    /// Decimals used when converting entered amounts to base units.
    pub token_decimals: u32,
    /// Confirmations a submission is tracked for before its event stream
    /// closes.
    pub confirmation_target: u32,
    pub poll_interval_ms: u64,
}

fn default_token_decimals() -> u32 {
    18
}

fn default_confirmation_target() -> u32 {
    6
}

fn default_poll_interval() -> u64 {
    1000
}

impl BridgeConfig {
    /// Built-in Tanenbaum testnet configuration.
    pub fn tanenbaum() -> Self {
        Self {
            chain_id: TANENBAUM_CHAIN_ID,
            chain_name: TANENBAUM_CHAIN_NAME.to_string(),
            rpc_url: TANENBAUM_RPC_URL.to_string(),
            explorer_url: TANENBAUM_EXPLORER_URL.to_string(),
            native_currency: NativeCurrency {
                name: "Testnet Syscoin".to_string(),
                symbol: "TSYS".to_string(),
                decimals: 18,
            },
            erc20_manager: TANENBAUM_ERC20_MANAGER,
            relay_contract: TANENBAUM_RELAY_CONTRACT,
            sysx_asset_guid: TANENBAUM_SYSX_ASSET_GUID.to_string(),
            token_decimals: default_token_decimals(),
            confirmation_target: default_confirmation_target(),
            poll_interval_ms: default_poll_interval(),
        }
    }

    /// Load configuration from environment variables.
    /// Loads .env file if present, then reads from environment.
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path.
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    fn load_from_env() -> Result<Self> {
        let defaults = Self::tanenbaum();

        let config = Self {
            chain_id: env::var("BRIDGE_CHAIN_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.chain_id),
            chain_name: env::var("BRIDGE_CHAIN_NAME").unwrap_or(defaults.chain_name),
            rpc_url: env::var("BRIDGE_RPC_URL").unwrap_or(defaults.rpc_url),
            explorer_url: env::var("BRIDGE_EXPLORER_URL").unwrap_or(defaults.explorer_url),
            native_currency: NativeCurrency {
                name: env::var("BRIDGE_NATIVE_NAME").unwrap_or(defaults.native_currency.name),
                symbol: env::var("BRIDGE_NATIVE_SYMBOL")
                    .unwrap_or(defaults.native_currency.symbol),
                decimals: defaults.native_currency.decimals,
            },
            // A present-but-malformed contract address must not silently
            // fall back to the default contract.
            erc20_manager: match env::var("BRIDGE_ERC20_MANAGER") {
                Ok(raw) => raw
                    .parse::<Address>()
                    .map_err(|e| eyre!("BRIDGE_ERC20_MANAGER is not a valid address: {e}"))?,
                Err(_) => defaults.erc20_manager,
            },
            relay_contract: match env::var("BRIDGE_RELAY_CONTRACT") {
                Ok(raw) => raw
                    .parse::<Address>()
                    .map_err(|e| eyre!("BRIDGE_RELAY_CONTRACT is not a valid address: {e}"))?,
                Err(_) => defaults.relay_contract,
            },
            sysx_asset_guid: env::var("BRIDGE_SYSX_ASSET_GUID").unwrap_or(defaults.sysx_asset_guid),
            token_decimals: env::var("BRIDGE_TOKEN_DECIMALS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.token_decimals),
            confirmation_target: env::var("BRIDGE_CONFIRMATION_TARGET")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.confirmation_target),
            poll_interval_ms: env::var("BRIDGE_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.poll_interval_ms),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(eyre!("chain_id cannot be 0"));
        }

        for (name, value) in [("rpc_url", &self.rpc_url), ("explorer_url", &self.explorer_url)] {
            let parsed =
                Url::parse(value).wrap_err_with(|| format!("{name} is not a valid URL"))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(eyre!("{name} must use http or https, got {}", parsed.scheme()));
            }
        }

        // Wallets reject chain registrations whose native currency is not
        // 18-decimal.
        if self.native_currency.decimals != 18 {
            return Err(eyre!(
                "native_currency.decimals must be 18, got {}",
                self.native_currency.decimals
            ));
        }

        // 10^77 < 2^256 < 10^78; anything deeper cannot be encoded as uint256.
        if self.token_decimals > 77 {
            return Err(eyre!(
                "token_decimals cannot exceed 77, got {}",
                self.token_decimals
            ));
        }

        if self.sysx_asset_guid.is_empty()
            || !self.sysx_asset_guid.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(eyre!(
                "sysx_asset_guid must be a decimal asset GUID, got {:?}",
                self.sysx_asset_guid
            ));
        }

        if self.erc20_manager == Address::ZERO || self.relay_contract == Address::ZERO {
            return Err(eyre!("contract addresses cannot be zero"));
        }
        if self.erc20_manager == self.relay_contract {
            return Err(eyre!(
                "erc20_manager and relay_contract must be distinct contracts"
            ));
        }

        if self.confirmation_target == 0 {
            return Err(eyre!("confirmation_target must be at least 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(eyre!("poll_interval_ms must be positive"));
        }

        Ok(())
    }

    /// Chain-registration descriptor for this configuration.
    pub fn descriptor(&self) -> ChainDescriptor {
        ChainDescriptor {
            chain_id: format!("0x{:x}", self.chain_id),
            chain_name: self.chain_name.clone(),
            native_currency: self.native_currency.clone(),
            rpc_urls: vec![self.rpc_url.clone()],
            block_explorer_urls: vec![self.explorer_url.clone()],
        }
    }

    /// Explorer link for a transaction, shown when a run is left pending.
    pub fn tx_url(&self, tx_hash: &B256) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}
