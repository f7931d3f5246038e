//! Address syntax checks for both sides of the bridge
//!
//! The account chain uses 20-byte hex addresses with EIP-55 mixed-case
//! checksums; the UTXO chain uses bech32 witness addresses (`sys`/`tsys`
//! prefixes) with base58 legacy addresses still in circulation. Exact
//! checksum validation for legacy addresses is not available here, so they
//! fall back to a minimum-length heuristic.

use alloy::primitives::Address;
use bech32::FromBase32;

use crate::error::BridgeError;

// ============================================================================
// Account-chain (NEVM) addresses
// ============================================================================

/// Parse a 0x-prefixed account-chain address.
///
/// All-lowercase and all-uppercase forms are accepted as written; a
/// mixed-case form must carry a valid EIP-55 checksum.
pub fn parse_account_address(input: &str) -> Result<Address, BridgeError> {
    let hex_part = input.strip_prefix("0x").ok_or_else(|| {
        BridgeError::Validation(format!("address {input:?} must start with 0x"))
    })?;

    if hex_part.len() != 40 {
        return Err(BridgeError::Validation(format!(
            "invalid address length: expected 40 hex chars, got {}",
            hex_part.len()
        )));
    }
    if !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BridgeError::Validation(format!(
            "address {input:?} contains non-hex characters"
        )));
    }

    let has_upper = hex_part.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = hex_part.bytes().any(|b| b.is_ascii_lowercase());
    if has_upper && has_lower {
        Address::parse_checksummed(input, None)
            .map_err(|_| BridgeError::Validation(format!("address {input:?} fails its checksum")))
    } else {
        input
            .parse::<Address>()
            .map_err(|e| BridgeError::Validation(format!("invalid address {input:?}: {e}")))
    }
}

pub fn is_valid_account_address(input: &str) -> bool {
    parse_account_address(input).is_ok()
}

// ============================================================================
// UTXO-chain (Syscoin) witness addresses
// ============================================================================

/// Human-readable prefixes accepted for bech32 witness addresses.
const WITNESS_HRPS: [&str; 2] = ["sys", "tsys"];

/// Minimum plausible length for a legacy base58 address.
const LEGACY_MIN_LEN: usize = 30;

/// Check a UTXO-chain destination address.
///
/// Bech32 strings must decode and carry a known prefix. Anything else is
/// treated as a legacy address and only screened by length and character
/// class.
pub fn check_witness_address(input: &str) -> Result<(), BridgeError> {
    if input.is_empty() {
        return Err(BridgeError::Validation(
            "destination address is empty".into(),
        ));
    }

    match bech32::decode(input) {
        Ok((hrp, data, _variant)) => {
            if !WITNESS_HRPS.contains(&hrp.as_str()) {
                return Err(BridgeError::Validation(format!(
                    "address prefix {hrp:?} does not belong to the destination chain"
                )));
            }
            let bytes = Vec::<u8>::from_base32(&data)
                .map_err(|e| BridgeError::Validation(format!("invalid bech32 payload: {e}")))?;
            if bytes.is_empty() {
                return Err(BridgeError::Validation(
                    "bech32 address carries no witness program".into(),
                ));
            }
            Ok(())
        }
        Err(_) => {
            if input.len() >= LEGACY_MIN_LEN && input.bytes().all(|b| b.is_ascii_alphanumeric()) {
                Ok(())
            } else {
                Err(BridgeError::Validation(format!(
                    "address {input:?} is not a valid destination address"
                )))
            }
        }
    }
}

pub fn is_valid_witness_address(input: &str) -> bool {
    check_witness_address(input).is_ok()
}
