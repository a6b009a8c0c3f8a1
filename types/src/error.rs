//! Validation errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("invalid token symbol: {0:?}")]
    InvalidToken(String),

    #[error("invalid percentage {value}: must be within {min}..={max}")]
    InvalidPercentage { value: u32, min: u32, max: u32 },

    #[error("invalid governance parameters: {0}")]
    InvalidParams(String),
}
