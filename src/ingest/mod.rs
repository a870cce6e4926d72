//! Normalizes a raw traversal result into typed node and edge tables.
//!
//! Ingest is the only place where scope classification happens and the only
//! place where burden values are derived from emission scores. Everything
//! downstream works on the resulting immutable tables.

pub mod raw;

pub use raw::{RawEdge, RawNode, RawTraversal};

use crate::config::AttributionConfig;
use crate::error::AttributionError;
use crate::store::{Edge, EdgeTable, Node, NodeTable, ScopeRule, Uid};
use std::collections::HashSet;
use tracing::debug;

/// Below this many raw edges the traversal found no upstream flow at all:
/// the only edge is the link from the root to the virtual super-root.
const MIN_UPSTREAM_EDGES: usize = 2;

/// Builds the node and edge tables for one traversal.
///
/// # Returns
/// - `Ok((nodes, edges))` with the sentinel node and its edges removed.
/// - `Err(MissingRoot)` if the configured root is not among the nodes.
/// - `Err(MalformedTraversal)` if an edge references an unknown node, a uid is
///   duplicated, or a node carries values that cannot be attributed.
pub fn ingest(raw: &RawTraversal, config: &AttributionConfig) -> Result<(NodeTable, EdgeTable), AttributionError> {
    let rule = &config.scope_rule;
    let sentinel = config.sentinel_uid;

    let real_nodes: Vec<&RawNode> = raw.nodes.iter().filter(|n| n.uid != sentinel).collect();
    let root = real_nodes
        .iter()
        .find(|n| n.uid == rule.root_uid)
        .ok_or(AttributionError::MissingRoot(rule.root_uid))?;

    // Endpoints are checked up front so the degenerate path rejects them too.
    let known: HashSet<Uid> = real_nodes.iter().map(|n| n.uid).collect();
    for edge in &raw.edges {
        for uid in [edge.producer, edge.consumer] {
            if uid != sentinel && !known.contains(&uid) {
                return Err(AttributionError::MalformedTraversal {
                    uid,
                    detail: format!(
                        "edge {} -> {} references a node missing from the traversal",
                        edge.producer, edge.consumer
                    ),
                });
            }
        }
    }

    if raw.edges.len() < MIN_UPSTREAM_EDGES {
        debug!(
            dropped = real_nodes.len() - 1,
            "traversal has no upstream flow; keeping the root only"
        );
        let table = NodeTable::from_nodes(vec![normalize(root, rule)?])?;
        return Ok((table, EdgeTable::default()));
    }

    let rows = real_nodes
        .iter()
        .map(|n| normalize(n, rule))
        .collect::<Result<Vec<_>, _>>()?;
    let table = NodeTable::from_nodes(rows)?;

    let mut edges = Vec::with_capacity(raw.edges.len());
    for edge in &raw.edges {
        if edge.producer == sentinel || edge.consumer == sentinel {
            continue;
        }
        edges.push(Edge { producer: edge.producer, consumer: edge.consumer });
    }

    debug!(nodes = table.len(), edges = edges.len(), "ingested traversal");
    Ok((table, EdgeTable::new(edges)))
}

fn normalize(raw: &RawNode, rule: &ScopeRule) -> Result<Node, AttributionError> {
    let malformed = |detail: String| AttributionError::MalformedTraversal { uid: raw.uid, detail };

    if !raw.supply_amount.is_finite() || raw.supply_amount < 0.0 {
        return Err(malformed(format!("supply amount {} is not a finite non-negative number", raw.supply_amount)));
    }
    let outside = raw.direct_emissions_score_outside_specific_flows;
    if !raw.direct_emissions_score.is_finite() || !outside.is_finite() {
        return Err(malformed("direct emission scores must be finite".into()));
    }
    if raw.direct_emissions_score < 0.0 {
        return Err(malformed(format!(
            "direct emission score {} is negative; burden intensity must be non-negative",
            raw.direct_emissions_score
        )));
    }
    if raw.uid == rule.root_uid && raw.depth != 1 {
        return Err(malformed(format!("root must have depth 1, found {}", raw.depth)));
    }
    if raw.depth == 0 {
        return Err(malformed("depth must be at least 1".into()));
    }

    Ok(Node {
        uid: raw.uid,
        activity: raw.activity,
        depth: raw.depth,
        scope: rule.classify(raw.uid, raw.activity),
        supply_amount: raw.supply_amount,
        burden_intensity: Node::intensity_of(raw.direct_emissions_score, raw.supply_amount),
        burden_direct: raw.direct_emissions_score + outside,
        edited: false,
    })
}
