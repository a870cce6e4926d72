//! table.rs
//! Dense row storage with a uid -> position arena.

use super::types::{Edge, Node, Uid};
use crate::error::AttributionError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable snapshot of all nodes of one traversal.
///
/// Rows keep the traversal order. The uid index is shared between snapshots
/// derived from the same ingest, since overrides change values but never the
/// set of rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "Vec<Node>", try_from = "Vec<Node>")]
pub struct NodeTable {
    rows: Vec<Node>,
    index: Arc<HashMap<Uid, usize>>,
}

impl NodeTable {
    pub fn new() -> Self { Self::default() }

    /// Builds a table, rejecting duplicate uids.
    pub fn from_nodes(rows: Vec<Node>) -> Result<Self, AttributionError> {
        let mut index = HashMap::with_capacity(rows.len());
        for (pos, node) in rows.iter().enumerate() {
            if index.insert(node.uid, pos).is_some() {
                return Err(AttributionError::MalformedTraversal {
                    uid: node.uid,
                    detail: "uid appears more than once".into(),
                });
            }
        }
        Ok(Self { rows, index: Arc::new(index) })
    }

    /// Same rows, new values. Positions must line up with `self`.
    pub(crate) fn derive(&self, rows: Vec<Node>) -> Self {
        debug_assert_eq!(rows.len(), self.rows.len());
        Self { rows, index: Arc::clone(&self.index) }
    }

    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
    pub fn nodes(&self) -> &[Node] { &self.rows }
    pub fn iter(&self) -> std::slice::Iter<'_, Node> { self.rows.iter() }
    pub fn contains(&self, uid: Uid) -> bool { self.index.contains_key(&uid) }

    #[inline(always)]
    pub fn position(&self, uid: Uid) -> Option<usize> {
        self.index.get(&uid).copied()
    }

    #[inline(always)]
    pub fn get(&self, uid: Uid) -> Option<&Node> {
        self.position(uid).map(|pos| &self.rows[pos])
    }

    pub fn max_depth(&self) -> u32 {
        self.rows.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn total_burden(&self) -> f64 {
        self.rows.iter().map(|n| n.burden_direct).sum()
    }
}

impl From<NodeTable> for Vec<Node> {
    fn from(table: NodeTable) -> Self { table.rows }
}

impl TryFrom<Vec<Node>> for NodeTable {
    type Error = AttributionError;
    fn try_from(rows: Vec<Node>) -> Result<Self, Self::Error> { Self::from_nodes(rows) }
}

impl PartialEq for NodeTable {
    fn eq(&self, other: &Self) -> bool { self.rows == other.rows }
}

impl<'a> IntoIterator for &'a NodeTable {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;
    fn into_iter(self) -> Self::IntoIter { self.rows.iter() }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeTable {
    edges: Vec<Edge>,
}

impl EdgeTable {
    pub fn new(edges: Vec<Edge>) -> Self { Self { edges } }
    pub fn len(&self) -> usize { self.edges.len() }
    pub fn is_empty(&self) -> bool { self.edges.is_empty() }
    pub fn edges(&self) -> &[Edge] { &self.edges }
    pub fn iter(&self) -> std::slice::Iter<'_, Edge> { self.edges.iter() }
}
