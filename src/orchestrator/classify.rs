//! Provider error classification
//!
//! Wallet and node failures arrive as free-form strings, sometimes with a
//! JSON object buried inside. Classification is substring matching on the
//! lowercased text; the embedded JSON is salvaged so callers can show the
//! node's own message instead of the wrapper.

use serde_json::Value;

/// Broad class of a provider-reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorClass {
    /// The transaction may yet be mined; the run can keep waiting.
    StillPending,
    /// The user declined the signature prompt.
    UserRejected,
    /// Anything else the provider reported.
    Remote,
}

/// Classify an error message by its text.
pub fn classify_message(message: &str) -> ProviderErrorClass {
    let message_lower = message.to_lowercase();

    if message_lower.contains("might still be mined") {
        return ProviderErrorClass::StillPending;
    }
    if message_lower.contains("user denied") || message_lower.contains("user rejected") {
        return ProviderErrorClass::UserRejected;
    }

    ProviderErrorClass::Remote
}

/// Classify a structured provider rejection. Code 4001 is the EIP-1193
/// user-rejection code; other codes fall back to text matching.
pub fn classify_rejection(code: i64, message: &str) -> ProviderErrorClass {
    if code == 4001 {
        return ProviderErrorClass::UserRejected;
    }
    classify_message(message)
}

/// Best-effort recovery of a JSON object embedded in an error message.
/// Only short messages are scanned; anything over 512 bytes is passed
/// through untouched.
pub fn extract_json_payload(message: &str) -> Option<Value> {
    if message.len() > 512 {
        return None;
    }
    let start = message.find('{')?;
    let end = message.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&message[start..=end]).ok()
}

/// Message to show for an error: an inner `message` field from the salvaged
/// payload wins over the raw text.
pub fn display_message(message: &str, payload: Option<&Value>) -> String {
    payload
        .and_then(|value| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_still_pending_pattern() {
        let message = "Transaction was not mined within 50 blocks, please make \
                       sure your transaction was properly sent. Be aware that it \
                       might still be mined!";
        assert_eq!(classify_message(message), ProviderErrorClass::StillPending);
    }

    #[test]
    fn test_user_rejection_patterns() {
        assert_eq!(
            classify_message("MetaMask Tx Signature: User denied transaction signature."),
            ProviderErrorClass::UserRejected
        );
        assert_eq!(
            classify_message("User rejected the request."),
            ProviderErrorClass::UserRejected
        );
        assert_eq!(
            classify_message("USER DENIED something"),
            ProviderErrorClass::UserRejected
        );
    }

    #[test]
    fn test_remote_fallback() {
        assert_eq!(
            classify_message("execution reverted: burn value too low"),
            ProviderErrorClass::Remote
        );
        assert_eq!(classify_message(""), ProviderErrorClass::Remote);
    }

    #[test]
    fn test_rejection_code_beats_text() {
        assert_eq!(
            classify_rejection(4001, "whatever the wallet said"),
            ProviderErrorClass::UserRejected
        );
        assert_eq!(
            classify_rejection(-32000, "user denied it"),
            ProviderErrorClass::UserRejected
        );
        assert_eq!(classify_rejection(-32000, "nonce too low"), ProviderErrorClass::Remote);
    }

    #[test]
    fn test_json_payload_extraction() {
        let message = r#"Internal JSON-RPC error. {"code":-32603,"message":"execution reverted"}"#;
        let payload = extract_json_payload(message).unwrap();
        assert_eq!(payload["code"], -32603);
        assert_eq!(
            display_message(message, Some(&payload)),
            "execution reverted"
        );
    }

    #[test]
    fn test_long_messages_not_scanned() {
        let message = format!("{}{}", "x".repeat(600), r#"{"message":"hidden"}"#);
        assert!(extract_json_payload(&message).is_none());
    }

    #[test]
    fn test_extraction_rejects_non_json() {
        assert!(extract_json_payload("no braces here").is_none());
        assert!(extract_json_payload("half open { not json").is_none());
        assert!(extract_json_payload("} reversed {").is_none());
    }

    #[test]
    fn test_display_falls_back_to_raw_text() {
        let payload = extract_json_payload(r#"{"code": 7}"#).unwrap();
        assert_eq!(
            display_message("original words", Some(&payload)),
            "original words"
        );
        assert_eq!(display_message("original words", None), "original words");
    }

    #[test]
    fn test_inner_message_reclassified() {
        // The salvaged message is what classification should see.
        let raw = r#"{"message":"Be aware that it might still be mined!"}"#;
        let payload = extract_json_payload(raw).unwrap();
        let display = display_message(raw, Some(&payload));
        assert_eq!(classify_message(&display), ProviderErrorClass::StillPending);
    }
}
