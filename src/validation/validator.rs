//! The central validator that orchestrates the execution of all invariant rules.
use super::error::ValidationError;
use super::rules::{tree, values};
use crate::analysis::BranchIndex;
use crate::store::NodeTable;

/// Runs every invariant rule over a node table and its branch index,
/// collecting all violations instead of stopping at the first one.
pub struct Validator<'a> {
    table: &'a NodeTable,
    branches: &'a BranchIndex,
    product_rule: bool,
}

impl<'a> Validator<'a> {
    pub fn new(table: &'a NodeTable, branches: &'a BranchIndex) -> Self {
        Self { table, branches, product_rule: false }
    }

    /// Also require `burden_direct == supply_amount * burden_intensity`.
    /// Ingest-time burden includes flows outside the intensity, so this only
    /// applies to tables produced by an override application.
    pub fn with_product_rule(mut self) -> Self {
        self.product_rule = true;
        self
    }

    /// # Returns
    /// - `Ok(())` if no invariant is violated.
    /// - `Err(Vec<ValidationError>)` containing every violation found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = tree::validate_root(self.table, self.branches);
        let root = self.branches.root();

        // Rules are local to a node and its branch; plain iteration suffices.
        for node in self.table {
            if let Some(err) = tree::validate_branch(node, self.branches.branch(node.uid), root) {
                errors.push(err);
            }
            if let Some(err) = values::validate_values(node) {
                errors.push(err);
            }
            if self.product_rule {
                if let Some(err) = values::validate_product(node) {
                    errors.push(err);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::resolve_branches;
    use crate::store::{ActivityRef, Edge, EdgeTable, Node, Scope, Uid};
    use crate::validation::error::ValidationErrorType;

    fn node(uid: i64, depth: u32, scope: Scope, supply: f64) -> Node {
        Node {
            uid: Uid(uid),
            activity: ActivityRef(uid),
            depth,
            scope,
            supply_amount: supply,
            burden_intensity: 2.0,
            burden_direct: supply * 2.0,
            edited: false,
        }
    }

    fn edges() -> EdgeTable {
        EdgeTable::new(vec![Edge { producer: Uid(1), consumer: Uid(0) }, Edge { producer: Uid(2), consumer: Uid(1) }])
    }

    #[test]
    fn test_valid_tree_passes() {
        let table = NodeTable::from_nodes(vec![
            node(0, 1, Scope::Scope1, 1.0),
            node(1, 2, Scope::Scope2, 2.0),
            node(2, 3, Scope::Scope3, 3.0),
        ])
        .unwrap();
        let branches = resolve_branches(&table, &edges()).unwrap();
        assert_eq!(Validator::new(&table, &branches).with_product_rule().validate(), Ok(()));
    }

    #[test]
    fn test_collects_all_violations() {
        let mut bad_value = node(2, 3, Scope::Scope3, 3.0);
        bad_value.burden_intensity = f64::INFINITY;
        let mut bad_product = node(1, 2, Scope::Scope1, 2.0);
        bad_product.burden_direct = 99.0;

        let table = NodeTable::from_nodes(vec![node(0, 1, Scope::Scope1, 1.0), bad_product, bad_value]).unwrap();
        let branches = resolve_branches(&table, &edges()).unwrap();

        let errors = Validator::new(&table, &branches).with_product_rule().validate().unwrap_err();
        let kinds: Vec<ValidationErrorType> = errors.iter().map(|e| e.error_type).collect();

        assert!(kinds.contains(&ValidationErrorType::RootInvariant)); // stray Scope 1
        assert!(kinds.contains(&ValidationErrorType::ProductMismatch));
        assert!(kinds.contains(&ValidationErrorType::NonFinite));
        assert!(errors.iter().any(|e| e.uid == Uid(2) && e.message.contains("burden_intensity")));
    }

    #[test]
    fn test_branch_of_other_table_is_flagged() {
        let table = NodeTable::from_nodes(vec![node(0, 1, Scope::Scope1, 1.0), node(1, 2, Scope::Scope3, 1.0)]).unwrap();
        let lone_root = NodeTable::from_nodes(vec![node(0, 1, Scope::Scope1, 1.0)]).unwrap();
        let branches = resolve_branches(&lone_root, &EdgeTable::default()).unwrap();

        let errors = Validator::new(&table, &branches).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ValidationErrorType::BranchShape);
        assert_eq!(errors[0].uid, Uid(1));
    }
}
