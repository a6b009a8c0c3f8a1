//! Shared helpers for the Agora governance engine.

pub mod time;

pub use time::{format_duration, parse_duration, DurationParseError};
