use crate::analysis::BranchIndex;
use crate::store::{ActivityRef, NodeTable, Uid};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the whole supply chain below the root as an indented audit trace.
///
/// `labels` maps activity references to display names resolved by the
/// knowledge source; unresolved activities print as `activity#<id>`.
pub fn format_tree(table: &NodeTable, branches: &BranchIndex, labels: Option<&HashMap<ActivityRef, String>>) -> String {
    let mut tracer = Tracer { table, branches, labels, output: String::new() };

    match branches.root() {
        Some(root) if table.contains(root) => {
            let title = tracer.label(root);
            let _ = writeln!(tracer.output, "SUPPLY CHAIN TRACE for '{}':", title);
            let _ = writeln!(tracer.output, "--------------------------------------------------");
            tracer.trace_node(root, "");
        }
        _ => {
            let _ = writeln!(tracer.output, "Error: Empty or unresolved tree");
        }
    }
    tracer.output
}

/// One-line rendering of a node's branch: `root -> ... -> node`.
pub fn format_branch(table: &NodeTable, branches: &BranchIndex, uid: Uid, labels: Option<&HashMap<ActivityRef, String>>) -> String {
    let tracer = Tracer { table, branches, labels, output: String::new() };
    match branches.branch(uid) {
        Some(branch) => branch.iter().map(|&u| tracer.label(u)).collect::<Vec<_>>().join(" -> "),
        None => format!("Error: Invalid Node ID {}", uid),
    }
}

struct Tracer<'a> {
    table: &'a NodeTable,
    branches: &'a BranchIndex,
    labels: Option<&'a HashMap<ActivityRef, String>>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, uid: Uid, prefix: &str) {
        let Some(node) = self.table.get(uid) else {
            let _ = writeln!(self.output, "{}[?] {}", prefix, uid);
            return;
        };

        let edited = if node.edited { " *edited" } else { "" };
        let label = self.label(uid);
        let _ = writeln!(
            self.output,
            "{}[L{}] {} ({}) supply={:.3} intensity={:.3} burden={:.3}{}",
            prefix,
            node.depth,
            label,
            node.scope,
            node.supply_amount,
            node.burden_intensity,
            node.burden_direct,
            edited
        );

        let children = self.branches.children(uid);
        let stem = self.build_child_stem(prefix);
        for (i, &child) in children.iter().enumerate() {
            let connector = if i == children.len() - 1 { "`-- " } else { "|-- " };
            self.trace_node(child, &format!("{}{}", stem, connector));
        }
    }

    fn label(&self, uid: Uid) -> String {
        let Some(node) = self.table.get(uid) else {
            return uid.to_string();
        };
        self.labels
            .and_then(|l| l.get(&node.activity).cloned())
            .unwrap_or_else(|| node.activity.to_string())
    }

    fn build_child_stem(&self, current_prefix: &str) -> String {
        current_prefix.replace("`-- ", "    ").replace("|-- ", "|   ")
    }
}
