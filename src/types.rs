//! Common types for bridge orchestration
//!
//! The request, report and receipt types passed between the UI layer, the
//! validator and the orchestrator. Requests carry user input as entered;
//! parsing to on-chain types happens after validation.

use std::fmt;

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

// ============================================================================
// Direction and asset classification
// ============================================================================

/// Which way value moves through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeDirection {
    /// Burn/lock on the NEVM chain, mint on the UTXO chain.
    NevmToSys,
    /// Relay a UTXO-chain transaction proof to the NEVM contract.
    SysToNevm,
}

impl BridgeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeDirection::NevmToSys => "nevm_to_sys",
            BridgeDirection::SysToNevm => "sys_to_nevm",
        }
    }
}

impl fmt::Display for BridgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Asset category of a bridge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// The chain's own coin; moved by attaching value to the burn call.
    Native,
    /// ERC-20 style token, allowance-gated.
    Fungible,
    /// ERC-721 style token; the amount is fixed to one.
    NonFungibleUnique,
    /// ERC-1155 style token with per-id quantities.
    NonFungibleMulti,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Native => "native",
            AssetKind::Fungible => "fungible",
            AssetKind::NonFungibleUnique => "non_fungible_unique",
            AssetKind::NonFungibleMulti => "non_fungible_multi",
        }
    }

    /// NFT-like kinds require a token id and approval-for-all.
    pub fn is_nft(&self) -> bool {
        matches!(self, AssetKind::NonFungibleUnique | AssetKind::NonFungibleMulti)
    }

    /// Kinds whose spending authorization must be checked before a burn.
    pub fn requires_authorization(&self) -> bool {
        !matches!(self, AssetKind::Native)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Bridge request
// ============================================================================

/// Immutable input to one orchestration run, built by the UI layer.
///
/// String fields hold the user's input verbatim so the validator can report
/// on malformed values; the orchestrator parses them into on-chain types
/// only after the report comes back clean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub direction: BridgeDirection,
    pub asset_kind: AssetKind,
    /// Asset contract on the NEVM chain; present iff the kind is not Native.
    pub source_contract: Option<String>,
    /// Token id for NFT-like kinds.
    pub token_id: Option<String>,
    /// Decimal amount as entered; fixed to "1" for NonFungibleUnique.
    pub amount: String,
    /// Connected NEVM account the transaction is sent from.
    pub source_account: String,
    /// UTXO-chain witness address receiving the minted value.
    pub destination_address: String,
    /// Rehydrates an in-flight run after a reload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_tx_hash: Option<B256>,
}

impl BridgeRequest {
    /// The amount the run actually uses: unique NFTs always move one unit.
    pub fn effective_amount(&self) -> &str {
        match self.asset_kind {
            AssetKind::NonFungibleUnique => "1",
            _ => self.amount.as_str(),
        }
    }
}

/// Externally produced inputs for the relay flow: the recorded destination
/// block reference plus the raw transaction, its position and the block
/// header the proof is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPayload {
    /// Destination-chain block hash recorded when the superblock landed.
    pub block_hash: B256,
    /// Raw source-chain transaction bytes.
    pub tx_bytes: Vec<u8>,
    /// Position of the transaction within its block.
    pub tx_index: u64,
    /// Transaction digests of the whole block, in block order.
    pub siblings: Vec<[u8; 32]>,
    /// Serialized source-chain block header.
    pub block_header: Vec<u8>,
}

// ============================================================================
// Validation report
// ============================================================================

/// Outcome of one field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub valid: bool,
    pub message: String,
}

impl FieldCheck {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Field-by-field validation outcome plus the synthesized submit verdict.
///
/// Rebuilt from scratch on every call; never patched incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub source_account: FieldCheck,
    pub destination_address: FieldCheck,
    pub source_contract: FieldCheck,
    pub token_id: FieldCheck,
    pub amount: FieldCheck,
    /// Valid only when every field passes and the wallet preconditions hold.
    pub submit: FieldCheck,
}

impl ValidationReport {
    /// Field checks in declaration order, the order precedence uses.
    pub fn fields(&self) -> [(&'static str, &FieldCheck); 5] {
        [
            ("source_account", &self.source_account),
            ("destination_address", &self.destination_address),
            ("source_contract", &self.source_contract),
            ("token_id", &self.token_id),
            ("amount", &self.amount),
        ]
    }

    pub fn is_valid(&self) -> bool {
        self.submit.valid
    }
}

// ============================================================================
// Chain data
// ============================================================================

/// Receipt attached to confirmation events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    /// On-chain execution status; `Some(false)` means reverted.
    pub status: Option<bool>,
    pub gas_used: Option<u64>,
}

/// Minimal block view used by the relay precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSummary {
    pub number: u64,
    pub hash: B256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_as_str() {
        assert_eq!(BridgeDirection::NevmToSys.as_str(), "nevm_to_sys");
        assert_eq!(BridgeDirection::SysToNevm.as_str(), "sys_to_nevm");
        assert_eq!(format!("{}", BridgeDirection::NevmToSys), "nevm_to_sys");
    }

    #[test]
    fn test_asset_kind_classification() {
        assert!(!AssetKind::Native.is_nft());
        assert!(!AssetKind::Fungible.is_nft());
        assert!(AssetKind::NonFungibleUnique.is_nft());
        assert!(AssetKind::NonFungibleMulti.is_nft());

        assert!(!AssetKind::Native.requires_authorization());
        assert!(AssetKind::Fungible.requires_authorization());
        assert!(AssetKind::NonFungibleMulti.requires_authorization());
    }

    #[test]
    fn test_effective_amount_forced_for_unique() {
        let mut request = BridgeRequest {
            direction: BridgeDirection::NevmToSys,
            asset_kind: AssetKind::NonFungibleUnique,
            source_contract: Some("0x0000000000000000000000000000000000000001".into()),
            token_id: Some("7".into()),
            amount: "250".into(),
            source_account: "0x0000000000000000000000000000000000000002".into(),
            destination_address: "tsys1qexample".into(),
            resume_tx_hash: None,
        };
        assert_eq!(request.effective_amount(), "1");

        request.asset_kind = AssetKind::Fungible;
        assert_eq!(request.effective_amount(), "250");
    }

    #[test]
    fn test_request_serde_round_trip() {
        let request = BridgeRequest {
            direction: BridgeDirection::SysToNevm,
            asset_kind: AssetKind::Native,
            source_contract: None,
            token_id: None,
            amount: "0.5".into(),
            source_account: "0x0000000000000000000000000000000000000003".into(),
            destination_address: "tsys1qexample".into(),
            resume_tx_hash: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: BridgeRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
        assert!(json.contains("sys_to_nevm"));
    }

    #[test]
    fn test_report_field_order() {
        let report = ValidationReport {
            source_account: FieldCheck::ok(),
            destination_address: FieldCheck::fail("bad"),
            source_contract: FieldCheck::ok(),
            token_id: FieldCheck::ok(),
            amount: FieldCheck::ok(),
            submit: FieldCheck::fail("bad"),
        };
        let names: Vec<&str> = report.fields().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "source_account",
                "destination_address",
                "source_contract",
                "token_id",
                "amount"
            ]
        );
        assert!(!report.is_valid());
    }
}
