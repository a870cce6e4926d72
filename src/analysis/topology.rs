use crate::store::{EdgeTable, NodeTable, Uid};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use std::collections::HashSet;

/// The traversal tree as a petgraph graph, oriented consumer -> producer,
/// i.e. in the direction a supply override propagates.
#[derive(Debug, Clone, Default)]
pub struct SupplyGraph {
    graph: DiGraphMap<Uid, ()>,
}

impl SupplyGraph {
    pub fn build(nodes: &NodeTable, edges: &EdgeTable) -> Self {
        let mut graph = DiGraphMap::with_capacity(nodes.len(), edges.len());
        for node in nodes {
            graph.add_node(node.uid);
        }
        for edge in edges.iter() {
            graph.add_edge(edge.consumer, edge.producer, ());
        }
        Self { graph }
    }
}

/// Identifies all nodes downstream (upstream in supply-chain terms) from the
/// given start nodes, start nodes included. Unknown uids are skipped.
pub fn downstream_from(graph: &SupplyGraph, start_nodes: &[Uid]) -> HashSet<Uid> {
    let mut visited = HashSet::new();
    for &start in start_nodes {
        if !graph.graph.contains_node(start) || visited.contains(&start) {
            continue;
        }
        let mut dfs = Dfs::new(&graph.graph, start);
        while let Some(node) = dfs.next(&graph.graph) {
            visited.insert(node);
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ActivityRef, Edge, Node, Scope};

    fn table(raw: &[(i64, u32)]) -> NodeTable {
        NodeTable::from_nodes(
            raw.iter()
                .map(|&(uid, depth)| Node {
                    uid: Uid(uid),
                    activity: ActivityRef(0),
                    depth,
                    scope: Scope::Scope3,
                    supply_amount: 0.0,
                    burden_intensity: 0.0,
                    burden_direct: 0.0,
                    edited: false,
                })
                .collect(),
        )
        .unwrap()
    }

    fn edges(raw: &[(i64, i64)]) -> EdgeTable {
        EdgeTable::new(raw.iter().map(|&(p, c)| Edge { producer: Uid(p), consumer: Uid(c) }).collect())
    }

    #[test]
    fn test_downstream_of_subtree() {
        // 0 <- 1 <- 2, 0 <- 3
        let graph = SupplyGraph::build(&table(&[(0, 1), (1, 2), (2, 3), (3, 2)]), &edges(&[(1, 0), (2, 1), (3, 0)]));

        let sub = downstream_from(&graph, &[Uid(1)]);
        assert_eq!(sub, [Uid(1), Uid(2)].into_iter().collect());

        let all = downstream_from(&graph, &[Uid(0), Uid(42)]);
        assert_eq!(all.len(), 4);

        let leaf = downstream_from(&graph, &[Uid(3)]);
        assert_eq!(leaf, [Uid(3)].into_iter().collect());
    }

    #[test]
    fn test_overlapping_starts_are_merged() {
        let graph = SupplyGraph::build(&table(&[(0, 1), (1, 2), (2, 3)]), &edges(&[(1, 0), (2, 1)]));
        let merged = downstream_from(&graph, &[Uid(2), Uid(1)]);
        assert_eq!(merged, [Uid(1), Uid(2)].into_iter().collect());
    }
}
