//! Account address type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// An account address as handed to the engine by the (already authenticated) caller.
///
/// The engine does not derive or verify addresses; it only requires them to be
/// non-empty and free of whitespace so they can serve as stable store keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Maximum accepted length in bytes. Keeps composite store keys bounded.
    pub const MAX_LEN: usize = 128;

    /// Create an address from a raw string without validation.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parse and validate an address.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let addr = Self(raw.to_string());
        if addr.is_valid() {
            Ok(addr)
        } else {
            Err(TypesError::InvalidAddress(raw.to_string()))
        }
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this address is well-formed.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= Self::MAX_LEN
            && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_empty_and_whitespace() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("0xabc def").is_err());
        assert!(Address::parse("0xabcdef").is_ok());
    }

    #[test]
    fn parse_rejects_overlong() {
        let long = "a".repeat(Address::MAX_LEN + 1);
        assert!(matches!(
            Address::parse(&long),
            Err(TypesError::InvalidAddress(_))
        ));
    }
}
