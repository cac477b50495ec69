//! Address parsing helpers.
//!
//! On-chain addresses arrive as 40-hex strings in mixed case (registry
//! literals, RPC responses, user input). Comparison is case-insensitive,
//! so everything is normalized to `H160` at the parse boundary.

use ethereum_types::H160;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must be 40 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("address contains non-hex characters: {0}")]
    InvalidHex(String),
}

/// Parse a 40-hex address, with or without the `0x` prefix, any case.
pub fn parse_address(s: &str) -> Result<H160, AddressError> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    if digits.len() != 40 {
        return Err(AddressError::InvalidLength(digits.len()));
    }
    let bytes = hex::decode(digits).map_err(|_| AddressError::InvalidHex(s.to_string()))?;
    Ok(H160::from_slice(&bytes))
}

/// Case-insensitive address equality on the string form.
///
/// Malformed input on either side compares unequal rather than erroring;
/// callers that need the failure use [`parse_address`] directly.
pub fn same_address(a: &str, b: &str) -> bool {
    match (parse_address(a), parse_address(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
