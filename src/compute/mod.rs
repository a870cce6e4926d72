//! Recomputes node values from overrides and reduces them to scope totals.
pub mod aggregate;
pub mod overrides;

pub use aggregate::{aggregate, ScopeTotals};
pub use overrides::{apply_overrides, Override, OverrideOutcome, Overrides};
