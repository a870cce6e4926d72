use crate::store::{NodeTable, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Burden per reporting scope.
///
/// `scope3` is always `total - scope1 - scope2`, never an independent sum, so
/// the three scopes partition the tree total by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeTotals {
    pub scope1: f64,
    pub scope2: f64,
    pub scope3: f64,
    pub total: f64,
}

pub fn aggregate(table: &NodeTable) -> ScopeTotals {
    let mut total = 0.0;
    let mut scope1 = 0.0;
    let mut scope2 = 0.0;

    for node in table {
        total += node.burden_direct;
        match node.scope {
            Scope::Scope1 => scope1 += node.burden_direct,
            Scope::Scope2 => scope2 += node.burden_direct,
            Scope::Scope3 => {}
        }
    }

    ScopeTotals { scope1, scope2, scope3: total - scope1 - scope2, total }
}

impl ScopeTotals {
    pub fn get(&self, scope: Scope) -> f64 {
        match scope {
            Scope::Scope1 => self.scope1,
            Scope::Scope2 => self.scope2,
            Scope::Scope3 => self.scope3,
        }
    }

    /// Fraction of the total per scope, for chart rendering. All zero for an
    /// empty or burden-free tree.
    pub fn shares(&self) -> [(Scope, f64); 3] {
        Scope::ALL.map(|s| (s, if self.total != 0.0 { self.get(s) / self.total } else { 0.0 }))
    }

    /// Burden of the upstream score that the tree does not account for,
    /// i.e. what the traversal cutoff truncated.
    pub fn unattributed(&self, reference_total: f64) -> f64 {
        reference_total - self.total
    }

    /// `{"Scope 1": .., "Scope 2": .., "Scope 3": ..}`
    pub fn labelled(&self) -> BTreeMap<String, f64> {
        Scope::ALL.iter().map(|&s| (s.to_string(), self.get(s))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ActivityRef, Node, Uid};

    fn node(uid: i64, scope: Scope, burden: f64) -> Node {
        Node {
            uid: Uid(uid),
            activity: ActivityRef(uid),
            depth: if scope == Scope::Scope1 { 1 } else { 2 },
            scope,
            supply_amount: 1.0,
            burden_intensity: burden,
            burden_direct: burden,
            edited: false,
        }
    }

    #[test]
    fn test_partition_is_exact() {
        let table = NodeTable::from_nodes(vec![
            node(0, Scope::Scope1, 1.5),
            node(1, Scope::Scope2, 0.25),
            node(2, Scope::Scope3, 4.0),
            node(3, Scope::Scope3, 0.125),
            node(4, Scope::Scope2, 2.0),
        ])
        .unwrap();

        let totals = aggregate(&table);
        assert_eq!(totals.scope1, 1.5);
        assert_eq!(totals.scope2, 2.25);
        assert_eq!(totals.scope3, 4.125);
        assert_eq!(totals.scope1 + totals.scope2 + totals.scope3, table.total_burden());
        assert_eq!(totals.total - totals.scope1 - totals.scope2, totals.scope3);
    }

    #[test]
    fn test_root_only() {
        let table = NodeTable::from_nodes(vec![node(0, Scope::Scope1, 3.0)]).unwrap();
        let totals = aggregate(&table);
        assert_eq!(totals, ScopeTotals { scope1: 3.0, scope2: 0.0, scope3: 0.0, total: 3.0 });
    }

    #[test]
    fn test_shares_and_labels() {
        let table = NodeTable::from_nodes(vec![node(0, Scope::Scope1, 1.0), node(1, Scope::Scope3, 3.0)]).unwrap();
        let totals = aggregate(&table);

        let shares = totals.shares();
        assert_eq!(shares[0], (Scope::Scope1, 0.25));
        assert_eq!(shares[2], (Scope::Scope3, 0.75));
        assert_eq!(totals.labelled().get("Scope 3"), Some(&3.0));
        assert_eq!(totals.unattributed(4.5), 0.5);

        assert!(ScopeTotals::default().shares().iter().all(|&(_, v)| v == 0.0));
    }
}
