//! Contract call encoding
//!
//! Calldata for the manager and relay contracts is assembled by hand from the
//! canonical signatures. Arguments are laid out as 32-byte words with dynamic
//! data (bytes, strings, arrays) placed after the head, offset-addressed.

use alloy::primitives::Address;
use bigdecimal::num_bigint::{BigInt, Sign};
use tiny_keccak::{Hasher, Keccak};

use crate::amount::FixedPointAmount;
use crate::error::{BridgeError, ProviderError};

pub const FREEZE_BURN_SIGNATURE: &str = "freezeBurn(uint256,address,uint256,string)";
pub const APPROVE_SIGNATURE: &str = "approve(address,uint256)";
pub const ALLOWANCE_SIGNATURE: &str = "allowance(address,address)";
pub const IS_APPROVED_FOR_ALL_SIGNATURE: &str = "isApprovedForAll(address,address)";
pub const SET_APPROVAL_FOR_ALL_SIGNATURE: &str = "setApprovalForAll(address,bool)";
pub const RELAY_TX_SIGNATURE: &str = "relayTx(uint256,bytes,uint256,uint256[],bytes)";

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// First four bytes of the keccak256 hash of a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// One argument in a call's head, or a reference to its tail data.
enum AbiToken<'a> {
    Word([u8; 32]),
    Bytes(&'a [u8]),
    Str(&'a str),
    WordArray(&'a [[u8; 32]]),
}

fn uint_word(value: &BigInt) -> Result<[u8; 32], BridgeError> {
    let (sign, bytes) = value.to_bytes_be();
    if sign == Sign::Minus {
        return Err(BridgeError::Validation(
            "negative value cannot be encoded as uint256".to_string(),
        ));
    }
    if bytes.len() > 32 {
        return Err(BridgeError::Validation(
            "value exceeds uint256 range".to_string(),
        ));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn usize_word(value: usize) -> [u8; 32] {
    u64_word(value as u64)
}

fn address_word(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

fn bool_word(value: bool) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[31] = value as u8;
    word
}

fn padded_len(len: usize) -> usize {
    ((len + 31) / 32) * 32
}

/// Assemble selector + head words + tail data for a call.
///
/// Head slots for dynamic arguments hold the offset from the start of the
/// argument block to that argument's tail data.
fn encode_call(signature: &str, args: &[AbiToken<'_>]) -> Vec<u8> {
    let head_size = args.len() * 32;
    let mut head: Vec<[u8; 32]> = Vec::with_capacity(args.len());
    let mut tail: Vec<u8> = Vec::new();

    for arg in args {
        match arg {
            AbiToken::Word(word) => head.push(*word),
            AbiToken::Bytes(bytes) => {
                head.push(usize_word(head_size + tail.len()));
                tail.extend_from_slice(&usize_word(bytes.len()));
                tail.extend_from_slice(bytes);
                tail.resize(tail.len() + padded_len(bytes.len()) - bytes.len(), 0);
            }
            AbiToken::Str(s) => {
                let bytes = s.as_bytes();
                head.push(usize_word(head_size + tail.len()));
                tail.extend_from_slice(&usize_word(bytes.len()));
                tail.extend_from_slice(bytes);
                tail.resize(tail.len() + padded_len(bytes.len()) - bytes.len(), 0);
            }
            AbiToken::WordArray(words) => {
                head.push(usize_word(head_size + tail.len()));
                tail.extend_from_slice(&usize_word(words.len()));
                for word in *words {
                    tail.extend_from_slice(word);
                }
            }
        }
    }

    let mut data = Vec::with_capacity(4 + head_size + tail.len());
    data.extend_from_slice(&selector(signature));
    for word in &head {
        data.extend_from_slice(word);
    }
    data.extend_from_slice(&tail);
    data
}

fn token_word(token_id: &str) -> Result<[u8; 32], BridgeError> {
    let value = BigInt::parse_bytes(token_id.as_bytes(), 10).ok_or_else(|| {
        BridgeError::Validation(format!("token id {token_id:?} is not a decimal number"))
    })?;
    uint_word(&value)
}

/// `freezeBurn(value, assetContract, tokenId, syscoinAddr)` on the manager
/// contract. Fungible and native burns pass token id zero; the caller
/// attaches native value separately when the burned asset is the native coin.
pub fn freeze_burn_data(
    value: &FixedPointAmount,
    asset_contract: Address,
    token_id: &str,
    syscoin_address: &str,
) -> Result<Vec<u8>, BridgeError> {
    let value_word = uint_word(value.as_bigint())?;
    Ok(encode_call(
        FREEZE_BURN_SIGNATURE,
        &[
            AbiToken::Word(value_word),
            AbiToken::Word(address_word(asset_contract)),
            AbiToken::Word(token_word(token_id)?),
            AbiToken::Str(syscoin_address),
        ],
    ))
}

/// ERC-20 `approve(spender, value)`.
pub fn approve_data(spender: Address, value: &FixedPointAmount) -> Result<Vec<u8>, BridgeError> {
    let value_word = uint_word(value.as_bigint())?;
    Ok(encode_call(
        APPROVE_SIGNATURE,
        &[AbiToken::Word(address_word(spender)), AbiToken::Word(value_word)],
    ))
}

/// ERC-20 `allowance(owner, spender)`.
pub fn allowance_data(owner: Address, spender: Address) -> Vec<u8> {
    encode_call(
        ALLOWANCE_SIGNATURE,
        &[
            AbiToken::Word(address_word(owner)),
            AbiToken::Word(address_word(spender)),
        ],
    )
}

/// ERC-721/1155 `isApprovedForAll(account, operator)`.
pub fn is_approved_for_all_data(account: Address, operator: Address) -> Vec<u8> {
    encode_call(
        IS_APPROVED_FOR_ALL_SIGNATURE,
        &[
            AbiToken::Word(address_word(account)),
            AbiToken::Word(address_word(operator)),
        ],
    )
}

/// ERC-721/1155 `setApprovalForAll(operator, approved)`.
pub fn set_approval_for_all_data(operator: Address, approved: bool) -> Vec<u8> {
    encode_call(
        SET_APPROVAL_FOR_ALL_SIGNATURE,
        &[
            AbiToken::Word(address_word(operator)),
            AbiToken::Word(bool_word(approved)),
        ],
    )
}

/// `relayTx(blockNumber, txBytes, txIndex, txSiblings, blockHeader)` on the
/// relay contract. Each proof sibling digest occupies one uint256 word.
pub fn relay_tx_data(
    block_number: u64,
    tx_bytes: &[u8],
    tx_index: u64,
    siblings: &[[u8; 32]],
    block_header: &[u8],
) -> Vec<u8> {
    encode_call(
        RELAY_TX_SIGNATURE,
        &[
            AbiToken::Word(u64_word(block_number)),
            AbiToken::Bytes(tx_bytes),
            AbiToken::Word(u64_word(tx_index)),
            AbiToken::WordArray(siblings),
            AbiToken::Bytes(block_header),
        ],
    )
}

/// Decode a hex quantity returned by `eth_call` into an integer.
pub fn decode_uint(result: &str) -> Result<BigInt, ProviderError> {
    let hex_str = result.trim_start_matches("0x");
    if hex_str.is_empty() || !hex_str.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ProviderError::InvalidResponse(format!(
            "not a hex quantity: {result:?}"
        )));
    }
    BigInt::parse_bytes(hex_str.as_bytes(), 16).ok_or_else(|| {
        ProviderError::InvalidResponse(format!("not a hex quantity: {result:?}"))
    })
}

/// Decode an `eth_call` result word as a boolean (any nonzero value is true).
pub fn decode_bool(result: &str) -> Result<bool, ProviderError> {
    let value = decode_uint(result)?;
    Ok(value.sign() == Sign::Plus)
}
