//! branches.rs
//! Resolves the root -> node ancestor chain of every node.
//!
//! The tree is stored as a parent arena indexed by table position, plus the
//! linked-list child adjacency used for downward walks. Branches are memoized:
//! a walk stops at the first ancestor whose branch is already known, so the
//! total work is proportional to the size of the output.

use crate::error::AttributionError;
use crate::store::{Branch, EdgeTable, NodeTable, Uid};
use std::collections::HashMap;
use tracing::debug;

const NO_NODE: u32 = u32::MAX;

#[derive(Debug, Clone, Default)]
pub struct BranchIndex {
    root: Option<Uid>,
    uids: Vec<Uid>,
    positions: HashMap<Uid, usize>,

    // Parent arena (producer -> consumer)
    parents: Vec<u32>,

    // Adjacency List (Children)
    first_child: Vec<u32>,
    child_targets: Vec<u32>,
    next_child: Vec<u32>,

    branches: Vec<Branch>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    OnChain,
    Resolved,
}

/// Derives the branch of every node in `nodes` from `edges`.
///
/// Fails with `CycleDetected` if a walk does not reach a resolved ancestor or
/// the root within `max_depth + 1` steps, and with `MalformedTraversal` if the
/// edges do not form a single tree over the table.
pub fn resolve_branches(nodes: &NodeTable, edges: &EdgeTable) -> Result<BranchIndex, AttributionError> {
    let count = nodes.len();
    let uids: Vec<Uid> = nodes.iter().map(|n| n.uid).collect();
    let positions: HashMap<Uid, usize> = uids.iter().enumerate().map(|(i, &u)| (u, i)).collect();

    let locate = |uid: Uid, edge_desc: &dyn Fn() -> String| {
        positions.get(&uid).copied().ok_or_else(|| AttributionError::MalformedTraversal {
            uid,
            detail: format!("edge {} references a node missing from the table", edge_desc()),
        })
    };

    // 1. Parent arena + child adjacency.
    // Edges are linked in reverse so each child list reads in traversal order.
    let mut parents = vec![NO_NODE; count];
    let mut first_child = vec![NO_NODE; count];
    let mut child_targets = Vec::with_capacity(edges.len());
    let mut next_child = Vec::with_capacity(edges.len());

    for edge in edges.iter().rev() {
        let desc = || format!("{} -> {}", edge.producer, edge.consumer);
        let p = locate(edge.producer, &desc)?;
        let c = locate(edge.consumer, &desc)?;
        if parents[p] != NO_NODE {
            return Err(AttributionError::MalformedTraversal {
                uid: edge.producer,
                detail: "node supplies more than one consumer".into(),
            });
        }
        parents[p] = c as u32;

        let new_edge = child_targets.len() as u32;
        child_targets.push(p as u32);
        next_child.push(first_child[c]);
        first_child[c] = new_edge;
    }

    // 2. The root is the only node without a consumer.
    let tops: Vec<usize> = (0..count).filter(|&i| parents[i] == NO_NODE).collect();
    let root = match tops.as_slice() {
        [] if count == 0 => None,
        [] => {
            return Err(AttributionError::CycleDetected { uid: uids[0], limit: nodes.max_depth() as usize + 1 });
        }
        [only] => Some(*only),
        several => {
            let root = several.iter().copied().find(|&i| nodes.nodes()[i].depth == 1).unwrap_or(several[0]);
            let detached = several.iter().copied().find(|&i| i != root).unwrap_or(root);
            return Err(AttributionError::MalformedTraversal {
                uid: uids[detached],
                detail: format!("subtree is detached from root {}", uids[root]),
            });
        }
    };

    // 3. Memoized upward walks.
    let limit = nodes.max_depth() as usize + 1;
    let mut state = vec![VisitState::None; count];
    let mut branches: Vec<Branch> = vec![Branch::new(); count];
    let mut chain: Vec<usize> = Vec::new();

    for start in 0..count {
        if state[start] == VisitState::Resolved {
            continue;
        }
        chain.clear();
        let mut cursor = start;

        let mut current = loop {
            if state[cursor] == VisitState::OnChain || chain.len() >= limit {
                return Err(AttributionError::CycleDetected { uid: uids[start], limit });
            }
            state[cursor] = VisitState::OnChain;
            chain.push(cursor);

            let parent = parents[cursor];
            if parent == NO_NODE {
                // Only the root is parentless once step 2 passed.
                break Branch::new();
            }
            let parent = parent as usize;
            if state[parent] == VisitState::Resolved {
                break branches[parent].clone();
            }
            cursor = parent;
        };

        for &pos in chain.iter().rev() {
            current.push(uids[pos]);
            let depth = nodes.nodes()[pos].depth as usize;
            if current.len() != depth {
                return Err(AttributionError::MalformedTraversal {
                    uid: uids[pos],
                    detail: format!("depth {} disagrees with branch length {}", depth, current.len()),
                });
            }
            branches[pos] = current.clone();
            state[pos] = VisitState::Resolved;
        }
    }

    debug!(nodes = count, max_depth = limit.saturating_sub(1), "resolved branches");

    Ok(BranchIndex {
        root: root.map(|i| uids[i]),
        uids,
        positions,
        parents,
        first_child,
        child_targets,
        next_child,
        branches,
    })
}

impl BranchIndex {
    pub fn root(&self) -> Option<Uid> { self.root }
    pub fn len(&self) -> usize { self.uids.len() }
    pub fn is_empty(&self) -> bool { self.uids.is_empty() }
    pub fn position(&self, uid: Uid) -> Option<usize> { self.positions.get(&uid).copied() }

    /// `[root, ..., uid]`, or `None` for an unknown uid.
    pub fn branch(&self, uid: Uid) -> Option<&[Uid]> {
        self.position(uid).map(|pos| self.branches[pos].as_slice())
    }

    #[inline(always)]
    pub fn branch_at(&self, pos: usize) -> &[Uid] {
        &self.branches[pos]
    }

    #[inline(always)]
    pub fn uid_at(&self, pos: usize) -> Uid {
        self.uids[pos]
    }

    /// The consumer this node supplies; `None` for the root.
    pub fn parent(&self, uid: Uid) -> Option<Uid> {
        let pos = self.position(uid)?;
        match self.parents[pos] {
            NO_NODE => None,
            p => Some(self.uids[p as usize]),
        }
    }

    /// Direct suppliers of `uid`, in traversal order.
    pub fn children(&self, uid: Uid) -> Vec<Uid> {
        let mut out = Vec::new();
        if let Some(pos) = self.position(uid) {
            let mut edge_idx = self.first_child[pos];
            while edge_idx != NO_NODE {
                out.push(self.uids[self.child_targets[edge_idx as usize] as usize]);
                edge_idx = self.next_child[edge_idx as usize];
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (Uid, &[Uid])> + '_ {
        self.uids.iter().copied().zip(self.branches.iter().map(|b| b.as_slice()))
    }

    /// True if this index was resolved for exactly the rows of `table`, in order.
    pub fn matches(&self, table: &NodeTable) -> bool {
        self.uids.len() == table.len() && self.uids.iter().zip(table.iter()).all(|(&u, n)| u == n.uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ActivityRef, Edge, Node, Scope};

    fn node(uid: i64, depth: u32) -> Node {
        Node {
            uid: Uid(uid),
            activity: ActivityRef(uid),
            depth,
            scope: if depth == 1 { Scope::Scope1 } else { Scope::Scope3 },
            supply_amount: 1.0,
            burden_intensity: 1.0,
            burden_direct: 1.0,
            edited: false,
        }
    }

    fn edge(producer: i64, consumer: i64) -> Edge {
        Edge { producer: Uid(producer), consumer: Uid(consumer) }
    }

    fn uids(raw: &[i64]) -> Vec<Uid> {
        raw.iter().map(|&u| Uid(u)).collect()
    }

    #[test]
    fn test_branches_of_small_tree() {
        // 0 <- 1 <- 3, 0 <- 2. Listed leaf-first so memoization has to kick in.
        let table = NodeTable::from_nodes(vec![node(3, 3), node(1, 2), node(0, 1), node(2, 2)]).unwrap();
        let edges = EdgeTable::new(vec![edge(1, 0), edge(2, 0), edge(3, 1)]);

        let index = resolve_branches(&table, &edges).unwrap();
        assert_eq!(index.root(), Some(Uid(0)));
        assert_eq!(index.branch(Uid(0)).unwrap(), uids(&[0]).as_slice());
        assert_eq!(index.branch(Uid(3)).unwrap(), uids(&[0, 1, 3]).as_slice());
        assert_eq!(index.branch(Uid(2)).unwrap(), uids(&[0, 2]).as_slice());
        assert_eq!(index.parent(Uid(3)), Some(Uid(1)));
        assert_eq!(index.parent(Uid(0)), None);
        assert_eq!(index.children(Uid(0)), uids(&[1, 2]));
        assert!(index.matches(&table));
    }

    #[test]
    fn test_single_node_tree() {
        let table = NodeTable::from_nodes(vec![node(0, 1)]).unwrap();
        let index = resolve_branches(&table, &EdgeTable::default()).unwrap();
        assert_eq!(index.branch(Uid(0)).unwrap(), uids(&[0]).as_slice());
        assert!(index.children(Uid(0)).is_empty());
    }

    #[test]
    fn test_cycle_is_detected_not_truncated() {
        // Root 0 plus a loop 1 -> 2 -> 1 that never reaches it.
        let table = NodeTable::from_nodes(vec![node(0, 1), node(1, 2), node(2, 3)]).unwrap();
        let edges = EdgeTable::new(vec![edge(1, 2), edge(2, 1)]);

        let err = resolve_branches(&table, &edges).unwrap_err();
        assert!(matches!(err, AttributionError::CycleDetected { limit: 4, .. }), "{:?}", err);
    }

    #[test]
    fn test_full_cycle_without_root() {
        let table = NodeTable::from_nodes(vec![node(1, 1), node(2, 2)]).unwrap();
        let edges = EdgeTable::new(vec![edge(1, 2), edge(2, 1)]);
        assert!(matches!(resolve_branches(&table, &edges), Err(AttributionError::CycleDetected { .. })));
    }

    #[test]
    fn test_producer_with_two_consumers_is_malformed() {
        let table = NodeTable::from_nodes(vec![node(0, 1), node(1, 2), node(2, 2)]).unwrap();
        let edges = EdgeTable::new(vec![edge(1, 0), edge(2, 0), edge(2, 1)]);
        let err = resolve_branches(&table, &edges).unwrap_err();
        assert!(matches!(err, AttributionError::MalformedTraversal { uid: Uid(2), .. }), "{:?}", err);
    }

    #[test]
    fn test_detached_node_is_malformed() {
        let table = NodeTable::from_nodes(vec![node(0, 1), node(1, 2), node(7, 2)]).unwrap();
        let edges = EdgeTable::new(vec![edge(1, 0)]);
        let err = resolve_branches(&table, &edges).unwrap_err();
        assert!(matches!(err, AttributionError::MalformedTraversal { uid: Uid(7), .. }), "{:?}", err);
    }

    #[test]
    fn test_depth_mismatch_is_malformed() {
        let table = NodeTable::from_nodes(vec![node(0, 1), node(1, 3)]).unwrap();
        let edges = EdgeTable::new(vec![edge(1, 0)]);
        assert!(matches!(
            resolve_branches(&table, &edges),
            Err(AttributionError::MalformedTraversal { uid: Uid(1), .. })
        ));
    }
}
