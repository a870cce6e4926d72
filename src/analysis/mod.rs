//! Structural analysis of the traversal tree.
pub mod branches;
pub mod topology;

pub use branches::{resolve_branches, BranchIndex};
pub use topology::{downstream_from, SupplyGraph};
