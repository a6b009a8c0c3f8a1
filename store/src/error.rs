use thiserror::Error;

/// Failure of a single store call. Reads of absent keys are not errors;
/// they return `None` or an empty list.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule was violated: a second vote by the same voter on a
    /// proposal, or a treasury entry id that already exists.
    #[error("already recorded: {0}")]
    Duplicate(String),

    #[error("storage backend failure: {0}")]
    Backend(String),

    /// A stored key or value does not have the shape this backend writes.
    #[error("malformed stored data: {0}")]
    Malformed(String),

    /// Stored records contradict each other.
    #[error("inconsistent governance state: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Whether the call was refused by a uniqueness rule rather than failing.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}
