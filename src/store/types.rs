use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Identity of one visit to a process, assigned by the upstream traversal.
///
/// Repeated visits to the same activity get distinct uids, which is what makes
/// the traversal result a tree rather than a general DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub i64);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to the underlying process/activity.
/// Display names are resolved outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityRef(pub i64);

impl fmt::Display for ActivityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "activity#{}", self.0)
    }
}

/// Reporting bucket of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    /// Direct burden of the functional unit itself (the root).
    Scope1,
    /// Energy-related burden (the marker activity, e.g. electricity production).
    Scope2,
    /// Every other upstream contribution.
    Scope3,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Scope1, Scope::Scope2, Scope::Scope3];

    pub fn number(&self) -> u8 {
        match self {
            Scope::Scope1 => 1,
            Scope::Scope2 => 2,
            Scope::Scope3 => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Scope::Scope1),
            2 => Some(Scope::Scope2),
            3 => Some(Scope::Scope3),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope {}", self.number())
    }
}

/// Classification policy injected into ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeRule {
    pub root_uid: Uid,
    /// Activity whose visits are reported as scope 2. `None` puts every
    /// non-root node in scope 3.
    pub marker_activity: Option<ActivityRef>,
}

impl Default for ScopeRule {
    fn default() -> Self {
        Self { root_uid: Uid(0), marker_activity: None }
    }
}

impl ScopeRule {
    pub fn classify(&self, uid: Uid, activity: ActivityRef) -> Scope {
        if uid == self.root_uid {
            Scope::Scope1
        } else if self.marker_activity == Some(activity) {
            Scope::Scope2
        } else {
            Scope::Scope3
        }
    }
}

/// One visit to a process during traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub uid: Uid,
    pub activity: ActivityRef,
    pub depth: u32,
    pub scope: Scope,
    pub supply_amount: f64,
    pub burden_intensity: f64,
    pub burden_direct: f64,
    pub edited: bool,
}

impl Node {
    /// Burden per unit of supply, defined as 0 for an idle node.
    #[inline]
    pub fn intensity_of(score: f64, supply_amount: f64) -> f64 {
        if supply_amount != 0.0 { score / supply_amount } else { 0.0 }
    }

    #[inline]
    pub fn product(&self) -> f64 {
        self.supply_amount * self.burden_intensity
    }
}

/// A producer -> consumer dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub producer: Uid,
    pub consumer: Uid,
}

/// Ancestor chain `[root, ..., node]`. Supply chains are rarely deeper than a
/// handful of tiers, so the chain normally lives inline.
pub type Branch = SmallVec<[Uid; 8]>;

/// Flat presentation record: a node joined with its branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRow {
    pub uid: Uid,
    pub activity: ActivityRef,
    pub depth: u32,
    pub scope: u8,
    pub branch: Vec<Uid>,
    pub supply_amount: f64,
    pub burden_intensity: f64,
    pub burden_direct: f64,
    pub edited: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_rule_classification() {
        let rule = ScopeRule { root_uid: Uid(0), marker_activity: Some(ActivityRef(53)) };

        assert_eq!(rule.classify(Uid(0), ActivityRef(53)), Scope::Scope1); // root wins over marker
        assert_eq!(rule.classify(Uid(7), ActivityRef(53)), Scope::Scope2);
        assert_eq!(rule.classify(Uid(8), ActivityRef(12)), Scope::Scope3);
    }

    #[test]
    fn test_intensity_guards_zero_supply() {
        assert_eq!(Node::intensity_of(5.0, 0.0), 0.0);
        assert_eq!(Node::intensity_of(6.0, 2.0), 3.0);
    }

    #[test]
    fn test_scope_numbering() {
        for scope in Scope::ALL {
            assert_eq!(Scope::from_number(scope.number()), Some(scope));
        }
        assert_eq!(Scope::from_number(4), None);
        assert_eq!(Scope::Scope2.to_string(), "Scope 2");
    }
}
