//! Unit conversion between human-decimal strings and integer base units.
//!
//! Two codecs live here:
//!
//! 1. Decimal-string ↔ `U256` base units with per-token decimals. All pool
//!    and balance arithmetic happens in base units; the string form exists
//!    only for display and user input.
//! 2. A bounded string (≤ [`MAX_PACKED_STR_BYTES`] bytes) ↔ `U256` packing,
//!    used for compact on-chain storage of short identifiers. Bytes are
//!    packed big-endian, so the encoding is order-preserving for
//!    equal-length ASCII strings.
//!
//! Parsing is strict by design: these checks are the synchronous input
//! validation layer, and anything rejected here never reaches the RPC layer.

use ethereum_types::U256;
use thiserror::Error;

/// Decimals of the ALT base asset (and of pool share units).
pub const ALT_DECIMALS: u8 = 18;

/// Longest string the packing codec accepts. 25 bytes leaves the packed
/// value comfortably inside a 32-byte word with room for a length tag on
/// the contract side.
pub const MAX_PACKED_STR_BYTES: usize = 25;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitError {
    #[error("amount is empty")]
    EmptyAmount,

    #[error("malformed amount: {0:?}")]
    MalformedAmount(String),

    #[error("amount {0:?} has more than one decimal separator")]
    TooManySeparators(String),

    #[error("amount has {got} fractional digits but the token only has {decimals}")]
    ExcessPrecision { decimals: u8, got: usize },

    #[error("amount does not fit in 256 bits")]
    AmountOverflow,

    #[error("string is {0} bytes, the packed limit is {MAX_PACKED_STR_BYTES}")]
    StringTooLong(usize),

    #[error("string contains a NUL byte")]
    InteriorNul,

    #[error("packed value does not decode to valid UTF-8")]
    InvalidUtf8,
}

/// Parse a human-decimal amount into base units.
///
/// Accepts `"12"`, `"12.5"`, `"0.000001"`. Rejects empty input, a second
/// separator, non-digit characters, and fractional parts longer than
/// `decimals` — precision the token cannot represent must be an explicit
/// user correction, not a silent truncation.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, UnitError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(UnitError::EmptyAmount);
    }

    let mut parts = amount.split('.');
    let whole = parts.next().unwrap_or_default();
    let frac = parts.next().unwrap_or("");
    if parts.next().is_some() {
        return Err(UnitError::TooManySeparators(amount.to_string()));
    }
    if whole.is_empty() || (amount.contains('.') && frac.is_empty()) {
        return Err(UnitError::MalformedAmount(amount.to_string()));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UnitError::MalformedAmount(amount.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(UnitError::ExcessPrecision {
            decimals,
            got: frac.len(),
        });
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(frac);
    for _ in frac.len()..decimals as usize {
        digits.push('0');
    }

    U256::from_dec_str(&digits).map_err(|_| UnitError::AmountOverflow)
}

/// Render base units as a decimal string, trimming trailing fractional zeros.
pub fn from_base_units(raw: U256, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = raw / divisor;
    let rem = raw % divisor;
    if rem.is_zero() {
        return whole.to_string();
    }
    let digits = rem.to_string();
    let mut frac = "0".repeat(decimals as usize - digits.len());
    frac.push_str(&digits);
    while frac.ends_with('0') {
        frac.pop();
    }
    format!("{whole}.{frac}")
}

/// Pack a short string into a `U256`, big-endian byte order.
pub fn pack_short_string(s: &str) -> Result<U256, UnitError> {
    let bytes = s.as_bytes();
    if bytes.len() > MAX_PACKED_STR_BYTES {
        return Err(UnitError::StringTooLong(bytes.len()));
    }
    if bytes.contains(&0) {
        return Err(UnitError::InteriorNul);
    }
    let mut acc = U256::zero();
    for &b in bytes {
        acc = (acc << 8) | U256::from(b);
    }
    Ok(acc)
}

/// Recover the string packed by [`pack_short_string`].
pub fn unpack_short_string(mut packed: U256) -> Result<String, UnitError> {
    let mut bytes = Vec::with_capacity(MAX_PACKED_STR_BYTES);
    while !packed.is_zero() {
        bytes.push((packed.low_u64() & 0xff) as u8);
        packed = packed >> 8;
    }
    bytes.reverse();
    String::from_utf8(bytes).map_err(|_| UnitError::InvalidUtf8)
}
