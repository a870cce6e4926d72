//! Applies analyst overrides and recomputes the derived columns of every node.
//!
//! Each node is evaluated independently from the prior snapshot and its branch,
//! so evaluation is data-parallel and the input table is never touched.

use crate::analysis::BranchIndex;
use crate::error::{AttributionError, OverrideField};
use crate::store::{Node, NodeTable, Uid};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Replacement values for one node. `None` keeps the traversal value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub supply_amount: Option<f64>,
    pub burden_intensity: Option<f64>,
}

impl Override {
    pub fn supply(value: f64) -> Self {
        Self { supply_amount: Some(value), burden_intensity: None }
    }

    pub fn intensity(value: f64) -> Self {
        Self { supply_amount: None, burden_intensity: Some(value) }
    }

    pub fn is_empty(&self) -> bool {
        self.supply_amount.is_none() && self.burden_intensity.is_none()
    }

    /// Fields set in `newer` win.
    pub fn merged(self, newer: Override) -> Self {
        Self {
            supply_amount: newer.supply_amount.or(self.supply_amount),
            burden_intensity: newer.burden_intensity.or(self.burden_intensity),
        }
    }
}

/// The full set of user edits, keyed by uid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Overrides {
    entries: BTreeMap<Uid, Override>,
}

impl Overrides {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn get(&self, uid: Uid) -> Option<&Override> { self.entries.get(&uid) }
    pub fn iter(&self) -> impl Iterator<Item = (Uid, &Override)> + '_ {
        self.entries.iter().map(|(&uid, o)| (uid, o))
    }

    pub fn with_supply(mut self, uid: Uid, value: f64) -> Self {
        self.merge(uid, Override::supply(value));
        self
    }

    pub fn with_intensity(mut self, uid: Uid, value: f64) -> Self {
        self.merge(uid, Override::intensity(value));
        self
    }

    /// Combines an edit with whatever is already recorded for `uid`.
    pub fn merge(&mut self, uid: Uid, edit: Override) {
        let slot = self.entries.entry(uid).or_default();
        *slot = slot.merged(edit);
        if slot.is_empty() {
            self.entries.remove(&uid);
        }
    }

    /// Drops every edit for `uid`, returning what was recorded.
    pub fn clear(&mut self, uid: Uid) -> Option<Override> {
        self.entries.remove(&uid)
    }

    /// Builds overrides from edited table cells.
    ///
    /// A cell becomes an override only if it differs from the value in
    /// `original`; re-submitting unchanged rows records nothing. Rows for
    /// unknown uids are kept so the engine can report them.
    pub fn from_edits(original: &NodeTable, edits: impl IntoIterator<Item = (Uid, Override)>) -> Self {
        let mut out = Self::new();
        for (uid, edit) in edits {
            let effective = match original.get(uid) {
                Some(node) => Override {
                    supply_amount: edit.supply_amount.filter(|&v| v != node.supply_amount),
                    burden_intensity: edit.burden_intensity.filter(|&v| v != node.burden_intensity),
                },
                None => edit,
            };
            out.merge(uid, effective);
        }
        out
    }
}

impl FromIterator<(Uid, Override)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (Uid, Override)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (uid, edit) in iter {
            out.merge(uid, edit);
        }
        out
    }
}

/// Result of one override application.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideOutcome {
    pub table: NodeTable,
    /// Recoverable problems: unknown targets and rejected values.
    pub warnings: Vec<AttributionError>,
}

/// Applies `overrides` to `table`, returning a new table.
///
/// Supply propagation uses only the nearest overridden ancestor on a node's
/// branch; ratios of further ancestors do not compound.
pub fn apply_overrides(
    table: &NodeTable,
    branches: &BranchIndex,
    overrides: &Overrides,
) -> Result<OverrideOutcome, AttributionError> {
    check_snapshot(table, branches)?;

    let (effective, warnings) = sanitize(table, overrides);

    // Without any effective override the product rule does not take over,
    // which keeps the empty edit set an exact identity.
    if effective.is_empty() {
        let rows = table.iter().map(|n| Node { edited: false, ..n.clone() }).collect();
        return Ok(OverrideOutcome { table: table.derive(rows), warnings });
    }

    let rows: Vec<Node> = table
        .nodes()
        .par_iter()
        .enumerate()
        .map(|(pos, node)| evaluate(table, branches.branch_at(pos), node, &effective))
        .collect();

    Ok(OverrideOutcome { table: table.derive(rows), warnings })
}

fn check_snapshot(table: &NodeTable, branches: &BranchIndex) -> Result<(), AttributionError> {
    if branches.matches(table) {
        return Ok(());
    }
    let uid = table
        .iter()
        .enumerate()
        .find(|&(pos, n)| pos >= branches.len() || branches.uid_at(pos) != n.uid)
        .map(|(_, n)| n.uid)
        .or_else(|| (branches.len() > table.len()).then(|| branches.uid_at(table.len())))
        .unwrap_or_default();
    Err(AttributionError::InconsistentSnapshot { uid })
}

fn sanitize(table: &NodeTable, overrides: &Overrides) -> (HashMap<Uid, Override>, Vec<AttributionError>) {
    let mut effective = HashMap::with_capacity(overrides.len());
    let mut warnings = Vec::new();

    for (uid, edit) in overrides.iter() {
        if !table.contains(uid) {
            warn!(%uid, "override targets a node missing from the table; ignored");
            warnings.push(AttributionError::UnknownOverrideTarget(uid));
            continue;
        }
        let checked = Override {
            supply_amount: checked_value(uid, OverrideField::SupplyAmount, edit.supply_amount, &mut warnings),
            burden_intensity: checked_value(uid, OverrideField::BurdenIntensity, edit.burden_intensity, &mut warnings),
        };
        if !checked.is_empty() {
            effective.insert(uid, checked);
        }
    }
    (effective, warnings)
}

fn checked_value(uid: Uid, field: OverrideField, value: Option<f64>, warnings: &mut Vec<AttributionError>) -> Option<f64> {
    let value = value?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        warn!(%uid, %field, value, "override value rejected");
        warnings.push(AttributionError::InvalidOverrideValue { uid, field, value });
        None
    }
}

fn evaluate(table: &NodeTable, branch: &[Uid], node: &Node, effective: &HashMap<Uid, Override>) -> Node {
    let own = effective.get(&node.uid);

    let intensity = own.and_then(|o| o.burden_intensity).unwrap_or(node.burden_intensity);
    let supply = match own.and_then(|o| o.supply_amount) {
        Some(direct) => direct,
        None => node.supply_amount * propagated_ratio(table, branch, effective),
    };

    Node {
        supply_amount: supply,
        burden_intensity: intensity,
        burden_direct: supply * intensity,
        edited: own.is_some(),
        ..node.clone()
    }
}

/// Ratio of the nearest ancestor carrying a supply override, or 1.
///
/// An ancestor whose traversal supply is 0 yields 1: there is nothing to scale by.
fn propagated_ratio(table: &NodeTable, branch: &[Uid], effective: &HashMap<Uid, Override>) -> f64 {
    // The node itself is the last element of its branch.
    let ancestors = &branch[..branch.len().saturating_sub(1)];

    for ancestor in ancestors.iter().rev() {
        if let Some(target) = effective.get(ancestor).and_then(|o| o.supply_amount) {
            let original = table.get(*ancestor).map_or(0.0, |a| a.supply_amount);
            if original == 0.0 {
                return 1.0;
            }
            let ratio = target / original;
            return if ratio.is_finite() { ratio } else { 1.0 };
        }
    }
    1.0
}
