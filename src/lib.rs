//! Transaction orchestration core for the Syscoin NEVM <-> UTXO bridge.
//!
//! The crate takes a bridge request from a UI layer, validates it against a
//! wallet snapshot, walks the wallet onto the right chain, secures spending
//! authorization where the asset needs one, submits the burn or relay
//! transaction and tracks it to its confirmation target. Progress is a pure
//! state machine ([`orchestrator::state`]); everything chain-facing goes
//! through the [`wallet::WalletProvider`] trait so the whole lifecycle can
//! be driven against scripted providers in tests.

pub mod address;
pub mod amount;
pub mod chain_guard;
pub mod config;
pub mod contracts;
pub mod error;
pub mod merkle;
pub mod orchestrator;
pub mod store;
pub mod types;
pub mod validate;
pub mod wallet;

// Re-export the types a consumer touches on every run.
pub use config::BridgeConfig;
pub use error::{BridgeError, ErrorKind, ProviderError};
pub use orchestrator::{LifecycleEvent, LifecycleState, Orchestrator, Phase, RunError};
pub use store::{MemoryStore, SessionRecord, SessionStore};
pub use types::{
    AssetKind, BridgeDirection, BridgeRequest, RelayPayload, TxReceipt, ValidationReport,
};
pub use validate::validate;
pub use wallet::{WalletGateway, WalletProvider};

#[cfg(feature = "http")]
pub use wallet::http::HttpProvider;
