//! Exact decimal-string to fixed-point conversion
//!
//! Bridge amounts are entered as decimal strings and sent on-chain as
//! integers scaled by the token's decimals. The conversion is pure integer
//! arithmetic on arbitrary-precision values; floating point never touches
//! this path.

use std::fmt;

use bigdecimal::num_bigint::{BigInt, Sign};

use crate::error::BridgeError;

/// Arbitrary-precision integer amount scaled by `10^decimals`.
///
/// Value type; cloning copies the digits. Negative values are representable
/// (sign-flagged) so parsed user input can round-trip, but only strictly
/// positive amounts pass request validation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedPointAmount(BigInt);

impl FixedPointAmount {
    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    pub fn into_bigint(self) -> BigInt {
        self.0
    }

    /// Strictly positive (zero is not positive).
    pub fn is_positive(&self) -> bool {
        self.0.sign() == Sign::Plus
    }
}

impl From<BigInt> for FixedPointAmount {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

impl fmt::Display for FixedPointAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Convert a decimal string to a fixed-point integer scaled by
/// `10^decimals`.
///
/// Splits on the decimal point, defaults a missing whole or fractional part
/// to zero, right-pads the fraction to `decimals` digits and computes
/// `whole * 10^decimals + fraction`, negating the result for a leading
/// minus. Exact over its whole domain: `to_fixed_point("-0.5", 2)` is -50
/// and `to_fixed_point("10", 0)` is 10.
///
/// Fails with [`BridgeError::InvalidAmountFormat`] when the input has more
/// than one decimal point, a fractional part longer than `decimals`,
/// non-digit characters, or no digits at all (`""`, `"."`, `"-"`).
pub fn to_fixed_point(value: &str, decimals: u32) -> Result<FixedPointAmount, BridgeError> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    if digits == "." {
        return Err(BridgeError::InvalidAmountFormat(format!(
            "value {value:?} cannot be converted with {decimals} decimals"
        )));
    }

    let mut parts = digits.splitn(3, '.');
    let whole_raw = parts.next().unwrap_or("");
    let fraction_raw = parts.next();
    if parts.next().is_some() {
        return Err(BridgeError::InvalidAmountFormat(
            "too many decimal points".into(),
        ));
    }

    // The length rule applies to an explicitly written fraction only; "10"
    // with 0 decimals stays valid.
    if let Some(fraction) = fraction_raw {
        if fraction.len() > decimals as usize {
            return Err(BridgeError::InvalidAmountFormat(format!(
                "fractional part of {value:?} exceeds {decimals} decimals"
            )));
        }
    }

    if whole_raw.is_empty() && fraction_raw.map_or(true, str::is_empty) {
        return Err(BridgeError::InvalidAmountFormat(format!(
            "value {value:?} contains no digits"
        )));
    }

    let whole_raw = if whole_raw.is_empty() { "0" } else { whole_raw };
    let whole = parse_digits(whole_raw, value)?;

    let mut padded = String::from(fraction_raw.unwrap_or("0"));
    if padded.is_empty() {
        padded.push('0');
    }
    while padded.len() < decimals as usize {
        padded.push('0');
    }
    let fraction = parse_digits(&padded, value)?;

    let mut scaled = whole * pow10(decimals) + fraction;
    if negative {
        scaled = -scaled;
    }
    Ok(FixedPointAmount(scaled))
}

fn parse_digits(digits: &str, original: &str) -> Result<BigInt, BridgeError> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BridgeError::InvalidAmountFormat(format!(
            "value {original:?} contains non-digit characters"
        )));
    }
    digits.parse::<BigInt>().map_err(|_| {
        BridgeError::InvalidAmountFormat(format!("value {original:?} is not a decimal number"))
    })
}

fn pow10(exp: u32) -> BigInt {
    let mut base = BigInt::from(1u8);
    for _ in 0..exp {
        base *= 10u32;
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(value: i64) -> FixedPointAmount {
        FixedPointAmount::from(BigInt::from(value))
    }

    #[test]
    fn test_whole_values() {
        assert_eq!(to_fixed_point("10", 0).unwrap(), fixed(10));
        assert_eq!(to_fixed_point("10", 2).unwrap(), fixed(1000));
        assert_eq!(to_fixed_point("0", 8).unwrap(), fixed(0));
    }

    #[test]
    fn test_fraction_padding() {
        assert_eq!(to_fixed_point("0.5", 2).unwrap(), fixed(50));
        assert_eq!(to_fixed_point("1.2", 4).unwrap(), fixed(12000));
        assert_eq!(to_fixed_point("1.23", 2).unwrap(), fixed(123));
        assert_eq!(to_fixed_point(".5", 2).unwrap(), fixed(50));
        assert_eq!(to_fixed_point("5.", 2).unwrap(), fixed(500));
    }

    #[test]
    fn test_negative_values() {
        assert_eq!(to_fixed_point("-0.5", 2).unwrap(), fixed(-50));
        assert_eq!(to_fixed_point("-10", 2).unwrap(), fixed(-1000));
        assert!(!to_fixed_point("-0.5", 2).unwrap().is_positive());
    }

    #[test]
    fn test_exact_large_values() {
        // 30 digits, well past u128; exactness must be preserved.
        let big = "123456789012345678901234567890";
        let parsed = to_fixed_point(big, 18).unwrap();
        let expected = format!("{}{}", big, "0".repeat(18));
        assert_eq!(parsed.to_string(), expected);
    }

    #[test]
    fn test_fraction_longer_than_decimals() {
        assert!(matches!(
            to_fixed_point("1.2345", 2),
            Err(BridgeError::InvalidAmountFormat(_))
        ));
        assert!(matches!(
            to_fixed_point("0.1", 0),
            Err(BridgeError::InvalidAmountFormat(_))
        ));
    }

    #[test]
    fn test_malformed_inputs() {
        for input in [".", "", "-", "-.", "1.2.3", "1..2", "1a", "0x10", "1.2b", "+5", " 5"] {
            assert!(
                matches!(
                    to_fixed_point(input, 8),
                    Err(BridgeError::InvalidAmountFormat(_))
                ),
                "expected rejection of {input:?}"
            );
        }
    }

    #[test]
    fn test_injective_on_valid_domain() {
        let inputs = ["1", "1.0", "0.10", "10", "1.01", "0.01", "1.1"];
        let mut seen: Vec<(String, FixedPointAmount)> = Vec::new();
        for input in inputs {
            let parsed = to_fixed_point(input, 2).unwrap();
            for (other, value) in &seen {
                // "1" and "1.0" denote the same quantity; distinct
                // quantities must never collide.
                if *value == parsed {
                    let lhs = to_fixed_point(input, 10).unwrap();
                    let rhs = to_fixed_point(other, 10).unwrap();
                    assert_eq!(lhs, rhs, "collision between {input} and {other}");
                }
            }
            seen.push((input.to_string(), parsed));
        }
    }
}
