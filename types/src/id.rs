//! Generation-ordered record identifiers.
//!
//! Identifiers are allocated from persisted sequences, so a larger id always
//! means a later record. The big-endian byte form keeps that order in
//! byte-sorted stores.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub fn value(&self) -> u64 {
                self.0
            }

            /// Big-endian key bytes (sort order equals numeric order).
            pub fn to_key(&self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            pub fn from_key(bytes: [u8; 8]) -> Self {
                Self(u64::from_be_bytes(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

sequential_id!(
    /// Identifier of a governance proposal.
    ProposalId,
    "prop"
);
sequential_id!(
    /// Identifier of a cast vote.
    VoteId,
    "vote"
);
sequential_id!(
    /// Identifier of a treasury ledger entry.
    EntryId,
    "tx"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_bytes_preserve_order() {
        let a = ProposalId::new(9);
        let b = ProposalId::new(256);
        assert!(a.to_key() < b.to_key());
        assert_eq!(ProposalId::from_key(b.to_key()), b);
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(ProposalId::new(3).to_string(), "prop-3");
        assert_eq!(EntryId::new(12).to_string(), "tx-12");
    }
}
