use crate::compute::{Override, Overrides};
use crate::config::AttributionConfig;
use crate::error::AttributionError;
use crate::ingest::{RawEdge, RawNode, RawTraversal};
use crate::session::Session;
use crate::store::{ActivityRef, Uid};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::collections::{BTreeMap, HashMap, VecDeque};

impl From<AttributionError> for PyErr {
    fn from(err: AttributionError) -> PyErr {
        match err {
            AttributionError::InconsistentSnapshot { .. } => PyRuntimeError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// (uid, activity, depth, supply_amount, direct_emissions_score,
/// direct_emissions_score_outside_specific_flows)
type NodeTuple = (i64, i64, u32, f64, f64, f64);
/// (uid, activity, depth, scope, branch, supply, intensity, burden, edited)
type RowTuple = (i64, i64, u32, u8, Vec<i64>, f64, f64, f64, bool);

/// Snapshots kept for `undo`; the oldest is dropped beyond this.
const HISTORY_LIMIT: usize = 64;

#[pyclass(name = "_Session")]
#[derive(Debug, Clone)]
pub struct PySession {
    current: Session,
    history: VecDeque<Session>,
}

fn raw_traversal(nodes: Vec<NodeTuple>, edges: Vec<(i64, i64)>) -> RawTraversal {
    RawTraversal {
        nodes: nodes
            .into_iter()
            .map(|(uid, activity, depth, supply, score, outside)| RawNode {
                uid: Uid(uid),
                activity: ActivityRef(activity),
                depth,
                supply_amount: supply,
                direct_emissions_score: score,
                direct_emissions_score_outside_specific_flows: outside,
            })
            .collect(),
        edges: edges.into_iter().map(|(p, c)| RawEdge { producer: Uid(p), consumer: Uid(c) }).collect(),
    }
}

#[pymethods]
impl PySession {
    #[new]
    #[pyo3(signature = (nodes, edges, marker_activity=None, root_uid=0))]
    pub fn new(nodes: Vec<NodeTuple>, edges: Vec<(i64, i64)>, marker_activity: Option<i64>, root_uid: i64) -> PyResult<Self> {
        let raw = raw_traversal(nodes, edges);
        let mut config = AttributionConfig::default();
        config.scope_rule.root_uid = Uid(root_uid);
        config.scope_rule.marker_activity = marker_activity.map(ActivityRef);

        Ok(Self { current: Session::start(&raw, config)?, history: VecDeque::new() })
    }

    #[staticmethod]
    #[pyo3(signature = (traversal_json, config_json=None))]
    pub fn from_json(traversal_json: &str, config_json: Option<&str>) -> PyResult<Self> {
        let raw = RawTraversal::from_json_str(traversal_json)?;
        let config = match config_json {
            Some(json) => AttributionConfig::from_json_str(json)?,
            None => AttributionConfig::default(),
        };
        Ok(Self { current: Session::start(&raw, config)?, history: VecDeque::new() })
    }

    /// Replaces the override set. Returns the warnings for overrides that
    /// were skipped.
    pub fn apply_overrides(&mut self, overrides: HashMap<i64, (Option<f64>, Option<f64>)>) -> PyResult<Vec<String>> {
        let overrides: Overrides = overrides
            .into_iter()
            .map(|(uid, (supply_amount, burden_intensity))| (Uid(uid), Override { supply_amount, burden_intensity }))
            .collect();
        let next = self.current.with_overrides(overrides)?;
        Ok(self.push(next))
    }

    #[pyo3(signature = (uid, supply_amount=None, burden_intensity=None))]
    pub fn edit(&mut self, uid: i64, supply_amount: Option<f64>, burden_intensity: Option<f64>) -> PyResult<Vec<String>> {
        let next = self.current.with_edit(Uid(uid), Override { supply_amount, burden_intensity })?;
        Ok(self.push(next))
    }

    /// Steps back to the previous snapshot. False if there is none.
    pub fn undo(&mut self) -> bool {
        match self.history.pop_back() {
            Some(previous) => {
                self.current = previous;
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> Vec<RowTuple> {
        self.current
            .rows()
            .into_iter()
            .map(|r| {
                let branch = r.branch.iter().map(|u| u.0).collect();
                (r.uid.0, r.activity.0, r.depth, r.scope, branch, r.supply_amount, r.burden_intensity, r.burden_direct, r.edited)
            })
            .collect()
    }

    pub fn rows_json(&self) -> PyResult<String> {
        Ok(self.current.rows_json()?)
    }

    pub fn scope_totals(&self) -> BTreeMap<String, f64> {
        self.current.totals().labelled()
    }

    pub fn total(&self) -> f64 { self.current.totals().total }

    pub fn affected_by(&self, uid: i64) -> Vec<i64> {
        self.current.affected_by(Uid(uid)).into_iter().map(|u| u.0).collect()
    }

    pub fn validate(&self) -> PyResult<()> {
        self.current.validate().map_err(|errs| {
            let msg = errs.iter().map(|e| format!("{}: {}", e.uid, e.message)).collect::<Vec<_>>().join("\n");
            PyValueError::new_err(msg)
        })
    }

    #[pyo3(signature = (labels=None))]
    pub fn trace(&self, labels: Option<HashMap<i64, String>>) -> String {
        let labels = labels.map(|l| l.into_iter().map(|(k, v)| (ActivityRef(k), v)).collect::<HashMap<_, _>>());
        self.current.trace(labels.as_ref())
    }

    pub fn node_count(&self) -> usize { self.current.table().len() }

    pub fn history_len(&self) -> usize { self.history.len() }
}

impl PySession {
    fn push(&mut self, next: Session) -> Vec<String> {
        let warnings = next.warnings().iter().map(|w| w.to_string()).collect();
        let previous = std::mem::replace(&mut self.current, next);
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(previous);
        warnings
    }
}
