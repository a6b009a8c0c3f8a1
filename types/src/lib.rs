//! Fundamental types for the Agora governance engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, identifiers, token amounts, timestamps, the clock abstraction and
//! governance parameters.

pub mod address;
pub mod amount;
pub mod error;
pub mod id;
pub mod params;
pub mod time;
pub mod token;

pub use address::Address;
pub use amount::TokenAmount;
pub use error::TypesError;
pub use id::{EntryId, ProposalId, VoteId};
pub use params::GovernanceParams;
pub use time::{Clock, SystemClock, Timestamp};
pub use token::Token;
