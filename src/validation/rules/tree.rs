//! Validation rules for the shape of the tree (root and branches).

use crate::analysis::BranchIndex;
use crate::store::{Node, NodeTable, Scope, Uid};
use crate::validation::error::{ValidationError, ValidationErrorType};
use std::collections::HashSet;

/// Exactly one node is the functional unit: depth 1, scope 1, branch `[root]`.
pub(crate) fn validate_root(table: &NodeTable, branches: &BranchIndex) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let roots: Vec<&Node> = table.iter().filter(|n| n.depth == 1).collect();

    if roots.len() != 1 {
        let uid = roots.get(1).copied().or_else(|| table.nodes().first()).map(|n| n.uid).unwrap_or_default();
        errors.push(ValidationError {
            uid,
            error_type: ValidationErrorType::RootInvariant,
            message: format!("Root Error: expected exactly one node at depth 1, found {}.", roots.len()),
        });
        return errors;
    }

    let root = roots[0];
    if root.scope != Scope::Scope1 {
        errors.push(ValidationError {
            uid: root.uid,
            error_type: ValidationErrorType::RootInvariant,
            message: format!("Root Error: root is classified as {} instead of Scope 1.", root.scope),
        });
    }
    if let Some(stray) = table.iter().find(|n| n.scope == Scope::Scope1 && n.uid != root.uid) {
        errors.push(ValidationError {
            uid: stray.uid,
            error_type: ValidationErrorType::RootInvariant,
            message: "Root Error: only the root may be classified as Scope 1.".into(),
        });
    }
    if branches.root() != Some(root.uid) {
        errors.push(ValidationError {
            uid: root.uid,
            error_type: ValidationErrorType::RootInvariant,
            message: format!("Root Error: branch index is rooted at {:?}.", branches.root()),
        });
    }
    errors
}

/// `branch[0] == root`, `branch[-1] == uid`, `len == depth`, no repeats.
pub(crate) fn validate_branch(node: &Node, branch: Option<&[Uid]>, root: Option<Uid>) -> Option<ValidationError> {
    let fail = |message: String| {
        Some(ValidationError { uid: node.uid, error_type: ValidationErrorType::BranchShape, message })
    };

    let Some(branch) = branch else {
        return fail("Branch Error: node has no resolved branch.".into());
    };
    if branch.first().copied() != root {
        return fail(format!("Branch Error: branch {:?} does not start at the root.", branch));
    }
    if branch.last() != Some(&node.uid) {
        return fail(format!("Branch Error: branch {:?} does not end at the node itself.", branch));
    }
    if branch.len() != node.depth as usize {
        return fail(format!("Branch Error: branch length {} differs from depth {}.", branch.len(), node.depth));
    }
    let mut seen = HashSet::with_capacity(branch.len());
    if !branch.iter().all(|u| seen.insert(*u)) {
        return fail(format!("Branch Error: branch {:?} visits a node twice.", branch));
    }
    None
}
