//! Pre-built [`tracing::Span`] constructors for governance node operations.
//!
//! Consistent span names and field sets make ticks and the proposals they
//! touch easy to filter and correlate in any tracing backend.

use tracing::{info_span, Span};

/// Span covering one scheduler tick over all pending proposals.
pub fn tick_span(sequence: u64) -> Span {
    info_span!("governance_tick", tick = sequence)
}

/// Span covering node startup checks (migration, integrity, reconciliation).
pub fn startup_span(storage: &str) -> Span {
    info_span!("node_startup", storage = %storage)
}
