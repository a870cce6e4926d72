//! Node/edge records and the immutable tables built from them.
pub mod table;
pub mod types;

pub use table::{EdgeTable, NodeTable};
pub use types::{ActivityRef, Branch, Edge, Node, NodeRow, Scope, ScopeRule, Uid};
