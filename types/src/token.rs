//! Treasury token symbols.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Symbol of an asset held by the treasury (e.g. `ETH`, `USDC`).
///
/// Symbols are normalised to upper case so `usdc` and `USDC` name the same asset.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Token(String);

impl Token {
    pub const MAX_LEN: usize = 16;

    pub fn new(symbol: &str) -> Self {
        Self(symbol.trim().to_ascii_uppercase())
    }

    /// Parse a symbol, rejecting empty, overlong or non-alphanumeric input.
    pub fn parse(symbol: &str) -> Result<Self, TypesError> {
        let token = Self::new(symbol);
        if token.0.is_empty()
            || token.0.len() > Self::MAX_LEN
            || !token.0.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(TypesError::InvalidToken(symbol.to_string()));
        }
        Ok(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_case_insensitive() {
        assert_eq!(Token::new("usdc"), Token::new("USDC"));
        assert_eq!(Token::parse(" eth ").unwrap().as_str(), "ETH");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Token::parse("").is_err());
        assert!(Token::parse("US-DC").is_err());
        assert!(Token::parse("ABCDEFGHIJKLMNOPQ").is_err());
    }
}
