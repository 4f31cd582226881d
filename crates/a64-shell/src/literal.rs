//! Integer literals accepted by `write` and the byte strings they store.
//!
//! Literals take an optional sign, then `0x`, `0o` or `0b` prefixed digits
//! or plain decimal without leading zeros. A single `_` may separate digits
//! and may follow a radix prefix.

use crate::errors::ShellError;

/// A parsed integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    negative: bool,
    magnitude: u128,
}

impl Literal {
    /// Parses one literal token. Values outside 128 bits are rejected.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let (negative, unsigned) = match token.as_bytes().first()? {
            b'-' => (true, &token[1..]),
            b'+' => (false, &token[1..]),
            _ => (false, token),
        };

        let (radix, digits, prefixed) = match unsigned.get(..2) {
            Some("0x" | "0X") => (16, &unsigned[2..], true),
            Some("0o" | "0O") => (8, &unsigned[2..], true),
            Some("0b" | "0B") => (2, &unsigned[2..], true),
            _ => (10, unsigned, false),
        };
        let digits = if prefixed {
            digits.strip_prefix('_').unwrap_or(digits)
        } else {
            digits
        };

        let magnitude = parse_digits(digits, radix)?;
        if radix == 10 && magnitude != 0 && digits.starts_with('0') {
            return None;
        }
        Some(Self {
            negative,
            magnitude,
        })
    }

    /// Returns `true` for values below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.negative && self.magnitude != 0
    }

    /// Two's-complement bit pattern of the value in 128 bits.
    #[must_use]
    pub const fn bit_pattern(self) -> u128 {
        if self.negative {
            self.magnitude.wrapping_neg()
        } else {
            self.magnitude
        }
    }

    /// Minimal big-endian byte string of a non-negative value; zero is empty.
    #[must_use]
    pub fn minimal_be_bytes(self) -> Vec<u8> {
        let bytes = self.magnitude.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        bytes[skip..].to_vec()
    }
}

fn parse_digits(digits: &str, radix: u32) -> Option<u128> {
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__")
    {
        return None;
    }
    digits
        .chars()
        .filter(|&c| c != '_')
        .try_fold(0u128, |acc, c| {
            let digit = c.to_digit(radix)?;
            acc.checked_mul(u128::from(radix))?.checked_add(u128::from(digit))
        })
}

/// Bytes a `write` to memory stores for `token`.
///
/// A token spelled with a lower-case `0x` prefix is taken as a raw byte
/// string, padded with a trailing `0` nibble when it has an odd number of
/// digits. Any other literal is stored as its minimal big-endian encoding.
///
/// # Errors
///
/// Returns [`ShellError::InvalidValue`] for malformed or negative values and
/// for raw hex strings that do not form whole bytes.
pub fn memory_bytes(token: &str) -> Result<Vec<u8>, ShellError> {
    let literal = Literal::parse(token).ok_or(ShellError::InvalidValue)?;
    if let Some(hex) = token.strip_prefix("0x") {
        return raw_hex_bytes(hex);
    }
    if literal.is_negative() {
        return Err(ShellError::InvalidValue);
    }
    Ok(literal.minimal_be_bytes())
}

fn raw_hex_bytes(hex: &str) -> Result<Vec<u8>, ShellError> {
    let mut digits = hex.to_owned();
    if digits.len() % 2 != 0 {
        digits.push('0');
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let high = char::from(pair[0]).to_digit(16);
            let low = char::from(pair[1]).to_digit(16);
            match (high, low) {
                (Some(high), Some(low)) => u8::try_from((high << 4) | low).ok(),
                _ => None,
            }
            .ok_or(ShellError::InvalidValue)
        })
        .collect()
}

/// Parses a `write` target as a hexadecimal address.
///
/// Surrounding brackets and an `0x` prefix are optional.
#[must_use]
pub fn parse_address(token: &str) -> Option<u64> {
    let trimmed = token.trim_matches(|c| c == '[' || c == ']');
    let digits = match trimmed.get(..2) {
        Some("0x" | "0X") => {
            let rest = &trimmed[2..];
            rest.strip_prefix('_').unwrap_or(rest)
        }
        _ => trimmed,
    };
    let value = parse_digits(digits, 16)?;
    u64::try_from(value).ok()
}
