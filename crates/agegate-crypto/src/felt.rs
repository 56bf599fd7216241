//! Field-element ("felt") encoding rules.
//!
//! Every protocol string (user ids, commitments, salts, proof hashes) is a
//! felt rendered either as a `0x`-prefixed hex string or an arbitrary
//! precision decimal string. Parsing happens exactly once, at the boundary,
//! through [`fr_from_str`]; all comparisons downstream are field-element
//! comparisons, so hex/decimal formatting differences can never cause a
//! false mismatch.

use agegate_types::{AgegateError, AgegateResult};
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField, Zero};

/// Parse a hex string (with or without `0x` prefix) as a big-endian integer
/// reduced into the field. Odd-length strings are left-padded with a zero
/// nibble.
pub fn fr_from_hex(s: &str) -> AgegateResult<Fr> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() {
        return Err(AgegateError::InvalidInput("empty hex string".into()));
    }
    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{}", digits);
        &padded
    } else {
        digits
    };
    let bytes = hex::decode(digits)
        .map_err(|e| AgegateError::InvalidInput(format!("invalid hex: {}", e)))?;
    Ok(Fr::from_be_bytes_mod_order(&bytes))
}

/// Parse an arbitrary-precision decimal string into the field by folding
/// digits through field arithmetic.
pub fn fr_from_dec(s: &str) -> AgegateResult<Fr> {
    if s.is_empty() {
        return Err(AgegateError::InvalidInput("empty decimal string".into()));
    }
    let ten = Fr::from(10u64);
    let mut acc = Fr::zero();
    for c in s.chars() {
        let d = c
            .to_digit(10)
            .ok_or_else(|| AgegateError::InvalidInput(format!("invalid decimal digit '{}'", c)))?;
        acc = acc * ten + Fr::from(d as u64);
    }
    Ok(acc)
}

/// Parse a protocol string: `0x` prefix selects hex, anything else is
/// decimal.
pub fn fr_from_str(s: &str) -> AgegateResult<Fr> {
    if s.starts_with("0x") || s.starts_with("0X") {
        fr_from_hex(s)
    } else {
        fr_from_dec(s)
    }
}

/// Render a felt as `0x` + lowercase big-endian hex with leading zeros
/// trimmed (`0x0` for zero).
pub fn fr_to_hex(f: &Fr) -> String {
    let bytes = f.into_bigint().to_bytes_be();
    let hex = hex::encode(bytes);
    let trimmed = hex.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{}", trimmed)
    }
}

/// 32-byte big-endian digest form of a felt, used as ECDSA signing input.
pub fn fr_to_be_bytes(f: &Fr) -> [u8; 32] {
    let bytes = f.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_decimal_equivalence() {
        assert_eq!(fr_from_hex("0xff").unwrap(), fr_from_dec("255").unwrap());
        assert_eq!(fr_from_str("0xff").unwrap(), fr_from_str("255").unwrap());
        assert_eq!(fr_from_str("0").unwrap(), Fr::from(0u64));
    }

    #[test]
    fn test_odd_length_hex() {
        assert_eq!(fr_from_hex("0xf").unwrap(), Fr::from(15u64));
        assert_eq!(fr_from_hex("f").unwrap(), Fr::from(15u64));
    }

    #[test]
    fn test_round_trip() {
        let values = [0u64, 1, 17, 255, 256, 0xdeadbeef, u64::MAX];
        for v in values {
            let f = Fr::from(v);
            assert_eq!(fr_from_hex(&fr_to_hex(&f)).unwrap(), f);
        }
    }

    #[test]
    fn test_zero_renders_as_0x0() {
        assert_eq!(fr_to_hex(&Fr::from(0u64)), "0x0");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(fr_from_hex("0xzz").is_err());
        assert!(fr_from_dec("12a").is_err());
        assert!(fr_from_hex("0x").is_err());
        assert!(fr_from_dec("").is_err());
    }

    #[test]
    fn test_be_bytes_padded() {
        let f = Fr::from(1u64);
        let bytes = fr_to_be_bytes(&f);
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[31], 1);
        assert!(bytes[..31].iter().all(|&b| b == 0));
    }
}
