//! An analysis session as an immutable value.
//!
//! The structural parts (ingested table, edges, branches, graph) are shared
//! between all snapshots of a session; every edit produces a new `Session`
//! holding a freshly computed table, so earlier snapshots stay valid for undo
//! and comparison and sessions can be handed across threads.

use crate::analysis::{downstream_from, resolve_branches, BranchIndex, SupplyGraph};
use crate::compute::{aggregate, apply_overrides, Override, Overrides, ScopeTotals};
use crate::config::AttributionConfig;
use crate::display::trace;
use crate::error::AttributionError;
use crate::ingest::{ingest, RawTraversal};
use crate::store::{ActivityRef, EdgeTable, NodeRow, NodeTable, Uid};
use crate::validation::{ValidationError, Validator};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Session {
    config: Arc<AttributionConfig>,
    base: Arc<NodeTable>,
    edges: Arc<EdgeTable>,
    branches: Arc<BranchIndex>,
    graph: Arc<SupplyGraph>,

    overrides: Overrides,
    current: Arc<NodeTable>,
    totals: ScopeTotals,
    warnings: Vec<AttributionError>,
}

impl Session {
    /// Ingests a traversal and resolves its branches. The returned session
    /// carries no overrides.
    pub fn start(raw: &RawTraversal, config: AttributionConfig) -> Result<Self, AttributionError> {
        config.validate()?;
        let (nodes, edges) = ingest(raw, &config)?;
        let branches = resolve_branches(&nodes, &edges)?;
        let graph = SupplyGraph::build(&nodes, &edges);
        let totals = aggregate(&nodes);
        debug!(nodes = nodes.len(), total = totals.total, "session started");

        let base = Arc::new(nodes);
        Ok(Self {
            config: Arc::new(config),
            current: Arc::clone(&base),
            base,
            edges: Arc::new(edges),
            branches: Arc::new(branches),
            graph: Arc::new(graph),
            overrides: Overrides::new(),
            totals,
            warnings: Vec::new(),
        })
    }

    /// Replaces the whole override set. Overrides always apply to the
    /// ingested table, never on top of a previous snapshot.
    pub fn with_overrides(&self, overrides: Overrides) -> Result<Self, AttributionError> {
        let outcome = apply_overrides(&self.base, &self.branches, &overrides)?;
        let totals = aggregate(&outcome.table);
        debug!(overrides = overrides.len(), warnings = outcome.warnings.len(), total = totals.total, "overrides applied");

        Ok(Self {
            config: Arc::clone(&self.config),
            base: Arc::clone(&self.base),
            edges: Arc::clone(&self.edges),
            branches: Arc::clone(&self.branches),
            graph: Arc::clone(&self.graph),
            overrides,
            current: Arc::new(outcome.table),
            totals,
            warnings: outcome.warnings,
        })
    }

    /// Adds one cell edit on top of the current override set.
    pub fn with_edit(&self, uid: Uid, edit: Override) -> Result<Self, AttributionError> {
        let mut overrides = self.overrides.clone();
        overrides.merge(uid, edit);
        self.with_overrides(overrides)
    }

    /// Reverts every edit made to `uid`.
    pub fn without_edit(&self, uid: Uid) -> Result<Self, AttributionError> {
        let mut overrides = self.overrides.clone();
        overrides.clear(uid);
        self.with_overrides(overrides)
    }

    /// Takes the rows of an edited table as submitted by the presentation
    /// layer and keeps only the cells that differ from the traversal.
    pub fn with_edited_rows(&self, rows: impl IntoIterator<Item = (Uid, Override)>) -> Result<Self, AttributionError> {
        self.with_overrides(Overrides::from_edits(&self.base, rows))
    }

    pub fn config(&self) -> &AttributionConfig { &self.config }
    pub fn base(&self) -> &NodeTable { &self.base }
    pub fn table(&self) -> &NodeTable { &self.current }
    pub fn edges(&self) -> &EdgeTable { &self.edges }
    pub fn branches(&self) -> &BranchIndex { &self.branches }
    pub fn overrides(&self) -> &Overrides { &self.overrides }
    pub fn totals(&self) -> &ScopeTotals { &self.totals }

    /// Recoverable problems from the last override application.
    pub fn warnings(&self) -> &[AttributionError] { &self.warnings }

    /// The current table joined with branches, for tabular display.
    pub fn rows(&self) -> Vec<NodeRow> {
        self.current
            .iter()
            .enumerate()
            .map(|(pos, n)| NodeRow {
                uid: n.uid,
                activity: n.activity,
                depth: n.depth,
                scope: n.scope.number(),
                branch: self.branches.branch_at(pos).to_vec(),
                supply_amount: n.supply_amount,
                burden_intensity: n.burden_intensity,
                burden_direct: n.burden_direct,
                edited: n.edited,
            })
            .collect()
    }

    pub fn rows_json(&self) -> Result<String, AttributionError> {
        Ok(serde_json::to_string(&self.rows())?)
    }

    /// Rows whose supply would be rescaled by a supply override on `uid`,
    /// given the overrides already in place. Descendants shielded by a nearer
    /// supply override are excluded.
    pub fn affected_by(&self, uid: Uid) -> Vec<Uid> {
        let has_supply_override = |u: &Uid| self.overrides.get(*u).is_some_and(|o| o.supply_amount.is_some());

        let mut affected: Vec<Uid> = downstream_from(&self.graph, &[uid])
            .into_iter()
            .filter(|&n| {
                n == uid
                    || self.branches.branch(n).is_some_and(|branch| {
                        let below = branch.iter().skip_while(|&&b| b != uid).skip(1);
                        !below.into_iter().any(has_supply_override)
                    })
            })
            .collect();
        affected.sort();
        affected
    }

    pub fn trace(&self, labels: Option<&HashMap<ActivityRef, String>>) -> String {
        trace::format_tree(&self.current, &self.branches, labels)
    }

    /// Checks the invariants of the current snapshot. The product rule is
    /// enforced once any override took effect.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let validator = Validator::new(&self.current, &self.branches);
        if self.current.iter().any(|n| n.edited) {
            validator.with_product_rule().validate()
        } else {
            validator.validate()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{RawEdge, RawNode};

    fn raw() -> RawTraversal {
        let node = |uid: i64, depth: u32, supply: f64, direct: f64| RawNode {
            uid: Uid(uid),
            activity: ActivityRef(uid),
            depth,
            supply_amount: supply,
            direct_emissions_score: direct,
            direct_emissions_score_outside_specific_flows: 0.0,
        };
        let edge = |p: i64, c: i64| RawEdge { producer: Uid(p), consumer: Uid(c) };
        RawTraversal {
            nodes: vec![node(-1, 0, 1.0, 0.0), node(0, 1, 10.0, 10.0), node(1, 2, 5.0, 10.0), node(2, 3, 2.0, 2.0), node(3, 2, 4.0, 4.0)],
            edges: vec![edge(0, -1), edge(1, 0), edge(2, 1), edge(3, 0)],
        }
    }

    #[test]
    fn test_snapshots_are_independent() {
        let start = Session::start(&raw(), AttributionConfig::default()).unwrap();
        let edited = start.with_edit(Uid(1), Override::supply(10.0)).unwrap();

        assert_eq!(start.table().get(Uid(2)).unwrap().supply_amount, 2.0);
        assert_eq!(edited.table().get(Uid(2)).unwrap().supply_amount, 4.0);
        assert_eq!(edited.totals().total, 10.0 + 20.0 + 4.0 + 4.0);
        assert!(edited.validate().is_ok());

        let reverted = edited.without_edit(Uid(1)).unwrap();
        assert_eq!(reverted.table(), start.table());
        assert_eq!(reverted.totals(), start.totals());
    }

    #[test]
    fn test_edits_accumulate() {
        let session = Session::start(&raw(), AttributionConfig::default())
            .unwrap()
            .with_edit(Uid(1), Override::supply(10.0))
            .unwrap()
            .with_edit(Uid(1), Override::intensity(1.0))
            .unwrap();

        let child = session.table().get(Uid(1)).unwrap();
        assert_eq!((child.supply_amount, child.burden_intensity, child.burden_direct), (10.0, 1.0, 10.0));
    }

    #[test]
    fn test_affected_by_respects_nearer_overrides() {
        let session = Session::start(&raw(), AttributionConfig::default()).unwrap();
        assert_eq!(session.affected_by(Uid(0)), vec![Uid(0), Uid(1), Uid(2), Uid(3)]);
        assert_eq!(session.affected_by(Uid(1)), vec![Uid(1), Uid(2)]);

        let shielded = session.with_edit(Uid(1), Override::supply(1.0)).unwrap();
        assert_eq!(shielded.affected_by(Uid(0)), vec![Uid(0), Uid(3)]);
        assert!(shielded.affected_by(Uid(42)).is_empty());
    }

    #[test]
    fn test_rows_carry_branches() {
        let session = Session::start(&raw(), AttributionConfig::default()).unwrap();
        let rows = session.rows();
        assert_eq!(rows.len(), 4);
        let grandchild = rows.iter().find(|r| r.uid == Uid(2)).unwrap();
        assert_eq!(grandchild.branch, vec![Uid(0), Uid(1), Uid(2)]);
        assert_eq!(grandchild.scope, 3);

        let json = session.rows_json().unwrap();
        assert!(json.contains("\"branch\":[0,1,2]"));
    }

    #[test]
    fn test_edited_rows_ignore_unchanged_cells() {
        let session = Session::start(&raw(), AttributionConfig::default()).unwrap();
        let submitted = session.rows().into_iter().map(|r| {
            let supply = if r.uid == Uid(3) { 8.0 } else { r.supply_amount };
            (r.uid, Override { supply_amount: Some(supply), burden_intensity: Some(r.burden_intensity) })
        });

        let next = session.with_edited_rows(submitted).unwrap();
        assert_eq!(next.overrides().len(), 1);
        let edited: Vec<Uid> = next.table().iter().filter(|n| n.edited).map(|n| n.uid).collect();
        assert_eq!(edited, vec![Uid(3)]);
    }
}
