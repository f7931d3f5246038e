//! Request validation
//!
//! Pure checks over a request and a wallet snapshot. Field rules depend on
//! direction and asset kind; the relay direction carries no form fields, so
//! only the wallet preconditions apply there. The submit verdict is the
//! first failure in a fixed precedence order.

use crate::address;
use crate::amount::to_fixed_point;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::types::{AssetKind, BridgeDirection, BridgeRequest, FieldCheck, ValidationReport};
use crate::wallet::WalletContext;

fn field_from(result: Result<(), BridgeError>) -> FieldCheck {
    match result {
        Ok(()) => FieldCheck::ok(),
        Err(BridgeError::Validation(message)) => FieldCheck::fail(message),
        Err(e) => FieldCheck::fail(e.to_string()),
    }
}

pub fn validate(
    request: &BridgeRequest,
    ctx: &WalletContext,
    config: &BridgeConfig,
) -> ValidationReport {
    let relay = request.direction == BridgeDirection::SysToNevm;

    let source_account = if relay {
        FieldCheck::ok()
    } else if request.source_account.is_empty() {
        FieldCheck::fail("account address is required")
    } else {
        field_from(address::parse_account_address(&request.source_account).map(|_| ()))
    };

    let destination_address = if relay {
        FieldCheck::ok()
    } else {
        field_from(address::check_witness_address(&request.destination_address))
    };

    let source_contract = if relay || request.asset_kind == AssetKind::Native {
        FieldCheck::ok()
    } else {
        match request.source_contract.as_deref() {
            None | Some("") => FieldCheck::fail("token contract address is required"),
            Some(contract) => field_from(address::parse_account_address(contract).map(|_| ())),
        }
    };

    let token_id = if relay || !request.asset_kind.is_nft() {
        FieldCheck::ok()
    } else {
        match request.token_id.as_deref() {
            None | Some("") => FieldCheck::fail("token id is required"),
            Some(id) if id.bytes().all(|b| b.is_ascii_digit()) => FieldCheck::ok(),
            Some(id) => FieldCheck::fail(format!("token id {id:?} is not a non-negative integer")),
        }
    };

    let amount = if relay || request.asset_kind == AssetKind::NonFungibleUnique {
        FieldCheck::ok()
    } else {
        match to_fixed_point(request.effective_amount(), config.token_decimals) {
            Ok(value) if value.is_positive() => FieldCheck::ok(),
            Ok(_) => FieldCheck::fail("amount must be positive"),
            Err(BridgeError::InvalidAmountFormat(message)) => FieldCheck::fail(message),
            Err(e) => FieldCheck::fail(e.to_string()),
        }
    };

    let submit = if !ctx.provider_present {
        FieldCheck::fail("no wallet provider detected")
    } else {
        match ctx.chain_id {
            None => FieldCheck::fail("wallet chain is unknown"),
            Some(_) if ctx.accounts.is_empty() => FieldCheck::fail("no account connected"),
            Some(id) if id != config.chain_id => FieldCheck::fail(format!(
                "wallet is on chain {id}, expected {}",
                config.chain_id
            )),
            Some(_) => {
                let checks = [
                    &source_account,
                    &destination_address,
                    &source_contract,
                    &token_id,
                    &amount,
                ];
                match checks.into_iter().find(|check| !check.valid) {
                    Some(check) => FieldCheck::fail(check.message.clone()),
                    None => FieldCheck::ok(),
                }
            }
        }
    };

    ValidationReport {
        source_account,
        destination_address,
        source_contract,
        token_id,
        amount,
        submit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use bech32::{ToBase32, Variant};

    const ACCOUNT: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const TOKEN: &str = "0x0000000000000000000000000000000000000042";

    fn witness_address() -> String {
        bech32::encode("tsys", [0u8; 20].to_base32(), Variant::Bech32).unwrap()
    }

    fn burn_request() -> BridgeRequest {
        BridgeRequest {
            direction: BridgeDirection::NevmToSys,
            asset_kind: AssetKind::Fungible,
            source_contract: Some(TOKEN.to_string()),
            token_id: None,
            amount: "2.5".to_string(),
            source_account: ACCOUNT.to_string(),
            destination_address: witness_address(),
            resume_tx_hash: None,
        }
    }

    fn ready_context() -> WalletContext {
        WalletContext {
            provider_present: true,
            chain_id: Some(5700),
            accounts: vec![Address::repeat_byte(0x01)],
        }
    }

    fn config() -> BridgeConfig {
        BridgeConfig::tanenbaum()
    }

    #[test]
    fn test_valid_burn_request() {
        let report = validate(&burn_request(), &ready_context(), &config());
        for (name, check) in report.fields() {
            assert!(check.valid, "{name}: {}", check.message);
        }
        assert!(report.is_valid());
    }

    #[test]
    fn test_submit_precedence() {
        let mut request = burn_request();
        request.amount = "not-a-number".to_string();

        // No provider outranks everything, including the bad amount.
        let report = validate(&request, &WalletContext::default(), &config());
        assert_eq!(report.submit.message, "no wallet provider detected");

        let mut ctx = WalletContext {
            provider_present: true,
            chain_id: None,
            accounts: vec![],
        };
        let report = validate(&request, &ctx, &config());
        assert_eq!(report.submit.message, "wallet chain is unknown");

        ctx.chain_id = Some(1);
        let report = validate(&request, &ctx, &config());
        assert_eq!(report.submit.message, "no account connected");

        ctx.accounts = vec![Address::repeat_byte(0x01)];
        let report = validate(&request, &ctx, &config());
        assert_eq!(report.submit.message, "wallet is on chain 1, expected 5700");

        // Preconditions cleared, the first invalid field surfaces.
        ctx.chain_id = Some(5700);
        let report = validate(&request, &ctx, &config());
        assert!(!report.amount.valid);
        assert_eq!(report.submit.message, report.amount.message);
    }

    #[test]
    fn test_field_failure_order() {
        let mut request = burn_request();
        request.source_account = "0x123".to_string();
        request.amount = "bad".to_string();

        let report = validate(&request, &ready_context(), &config());
        assert!(!report.source_account.valid);
        assert!(!report.amount.valid);
        assert_eq!(report.submit.message, report.source_account.message);
    }

    #[test]
    fn test_native_skips_contract() {
        let mut request = burn_request();
        request.asset_kind = AssetKind::Native;
        request.source_contract = None;

        let report = validate(&request, &ready_context(), &config());
        assert!(report.source_contract.valid);
        assert!(report.is_valid());

        request.asset_kind = AssetKind::Fungible;
        let report = validate(&request, &ready_context(), &config());
        assert!(!report.source_contract.valid);
        assert_eq!(report.submit.message, "token contract address is required");
    }

    #[test]
    fn test_nft_token_id_rules() {
        let mut request = burn_request();
        request.asset_kind = AssetKind::NonFungibleUnique;
        request.amount = "ignored".to_string();

        let report = validate(&request, &ready_context(), &config());
        assert!(!report.token_id.valid);
        assert_eq!(report.submit.message, "token id is required");
        // Unique NFTs always move exactly one token.
        assert!(report.amount.valid);

        request.token_id = Some("7".to_string());
        let report = validate(&request, &ready_context(), &config());
        assert!(report.token_id.valid);
        assert!(report.is_valid());

        request.token_id = Some("7a".to_string());
        let report = validate(&request, &ready_context(), &config());
        assert!(!report.token_id.valid);
    }

    #[test]
    fn test_multi_nft_amount_still_checked() {
        let mut request = burn_request();
        request.asset_kind = AssetKind::NonFungibleMulti;
        request.token_id = Some("7".to_string());
        request.amount = "0".to_string();

        let report = validate(&request, &ready_context(), &config());
        assert!(!report.amount.valid);
        assert_eq!(report.amount.message, "amount must be positive");
    }

    #[test]
    fn test_checksum_enforced_on_mixed_case() {
        let mut request = burn_request();
        request.source_account = ACCOUNT.replace("Fd6", "fd6");

        let report = validate(&request, &ready_context(), &config());
        assert!(!report.source_account.valid);
        assert!(report.source_account.message.contains("checksum"));
    }

    #[test]
    fn test_relay_request_has_no_field_checks() {
        let request = BridgeRequest {
            direction: BridgeDirection::SysToNevm,
            asset_kind: AssetKind::Fungible,
            source_contract: None,
            token_id: None,
            amount: String::new(),
            source_account: String::new(),
            destination_address: String::new(),
            resume_tx_hash: None,
        };

        let report = validate(&request, &ready_context(), &config());
        assert!(report.is_valid());

        let report = validate(&request, &WalletContext::default(), &config());
        assert!(!report.is_valid());
        assert_eq!(report.submit.message, "no wallet provider detected");
    }

    #[test]
    fn test_zero_amount_rejected() {
        let mut request = burn_request();
        request.amount = "0.00".to_string();

        let report = validate(&request, &ready_context(), &config());
        assert!(!report.amount.valid);
        assert_eq!(report.amount.message, "amount must be positive");
    }
}
