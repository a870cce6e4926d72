//! Scope attribution core.
//!
//! Turns the result of a supply-chain graph traversal into a table of nodes
//! classified into reporting scopes 1, 2 and 3, lets users override supply
//! amounts and burden intensities, and recomputes burdens and scope totals.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod error;
pub mod ingest;
pub mod session;
pub mod store;
pub mod validation;

#[cfg(feature = "python")]
pub mod bindings;

pub use analysis::{resolve_branches, BranchIndex};
pub use compute::{aggregate, apply_overrides, Override, OverrideOutcome, Overrides, ScopeTotals};
pub use config::AttributionConfig;
pub use error::AttributionError;
pub use ingest::{ingest, RawEdge, RawNode, RawTraversal};
pub use session::Session;
pub use store::{ActivityRef, Edge, EdgeTable, Node, NodeRow, NodeTable, Scope, ScopeRule, Uid};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Defines the compiled `_core` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<bindings::python::PySession>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
