//! Result recorder: match traces and warnings

use crate::context::VarScope;
use crate::meta::{PatternMeta, Priority};
use crate::model::{CodeGraph, NodeId, Position};
use serde::Serialize;
use std::collections::BTreeMap;

/// Receiver of traces and warnings produced during evaluation
pub trait Recorder {
    /// Start a fresh trace for the next (node, document) evaluation
    fn begin_trace(&mut self);

    fn add_trace_entry(&mut self, node: NodeId, role: &str, pattern_name: &str, depth: usize);

    /// Drop every trace entry recorded for `node`
    fn remove_trace_entry(&mut self, node: NodeId);

    /// Variables of a write-to-graph role that matched on `node`
    fn record_variables(&mut self, _node: NodeId, _role: &str, _variables: &VarScope) {}

    fn emit_warning(
        &mut self,
        graph: &dyn CodeGraph,
        node: NodeId,
        meta: &PatternMeta,
        message: Option<&str>,
    );
}

#[derive(Debug, Clone)]
struct PendingEntry {
    node: NodeId,
    role: String,
    pattern_name: String,
    depth: usize,
}

/// One trace line of a match
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEntry {
    pub node: NodeId,
    pub node_name: String,
    pub role: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pattern_name: String,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// A variable recorded from a write-to-graph role
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedVariable {
    pub node: NodeId,
    pub role: String,
    pub name: String,
    pub value: String,
}

/// A pattern found on a node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub pattern_name: String,
    pub warning_name: String,
    pub text: String,
    pub display_name: String,
    pub category: String,
    pub description: String,
    pub priority: Priority,
    pub role: String,
    pub node: NodeId,
    pub node_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub trace: Vec<TraceEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<RecordedVariable>,
}

/// Default recorder keeping every match in memory
#[derive(Debug, Default)]
pub struct TraceRecorder {
    trace: Vec<PendingEntry>,
    variables: Vec<RecordedVariable>,
    matches: Vec<PatternMatch>,
    counts: BTreeMap<String, usize>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches in the order they were found
    pub fn matches(&self) -> &[PatternMatch] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<PatternMatch> {
        self.matches
    }

    pub fn total_matches(&self) -> usize {
        self.matches.len()
    }

    /// Match count for each pattern name
    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn match_count(&self, pattern_name: &str) -> usize {
        self.counts.get(pattern_name).copied().unwrap_or(0)
    }

    /// Nodes currently in the trace, in insertion order
    pub fn traced_nodes(&self) -> Vec<NodeId> {
        self.trace.iter().map(|e| e.node).collect()
    }
}

impl Recorder for TraceRecorder {
    fn begin_trace(&mut self) {
        self.trace.clear();
        self.variables.clear();
    }

    fn add_trace_entry(&mut self, node: NodeId, role: &str, pattern_name: &str, depth: usize) {
        self.trace.push(PendingEntry {
            node,
            role: role.to_string(),
            pattern_name: pattern_name.to_string(),
            depth,
        });
    }

    fn remove_trace_entry(&mut self, node: NodeId) {
        self.trace.retain(|e| e.node != node);
    }

    fn record_variables(&mut self, node: NodeId, role: &str, variables: &VarScope) {
        for (name, value) in variables {
            if value.is_empty() {
                continue;
            }
            self.variables.push(RecordedVariable {
                node,
                role: role.to_string(),
                name: name.clone(),
                value: value.to_string(),
            });
        }
    }

    fn emit_warning(
        &mut self,
        graph: &dyn CodeGraph,
        node: NodeId,
        meta: &PatternMeta,
        message: Option<&str>,
    ) {
        let trace = self
            .trace
            .iter()
            .map(|e| TraceEntry {
                node: e.node,
                node_name: graph.display_name(e.node),
                role: e.role.clone(),
                pattern_name: e.pattern_name.clone(),
                depth: e.depth,
                position: graph.position(e.node),
            })
            .collect();

        *self.counts.entry(meta.name.clone()).or_insert(0) += 1;
        self.matches.push(PatternMatch {
            pattern_name: meta.name.clone(),
            warning_name: meta.warning_name(),
            text: meta.warning_text(),
            display_name: meta.display_name.clone(),
            category: meta.category.clone(),
            description: meta.description.clone(),
            priority: meta.priority,
            role: meta.role.clone(),
            node,
            node_name: graph.display_name(node),
            position: graph.position(node),
            message: message.map(str::to_string),
            trace,
            variables: std::mem::take(&mut self.variables),
        });
    }
}
