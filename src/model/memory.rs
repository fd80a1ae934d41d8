//! In-memory code graph, loadable from JSON or YAML

use super::edges::{Direction, EdgeKind};
use super::graph::{CodeGraph, Position};
use super::kinds::NodeKind;
use super::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error while building or loading a graph
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Failed to read graph file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse graph JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse graph YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unsupported graph file format: {0}")]
    UnsupportedFormat(String),
    #[error("Node {node}: {message}")]
    InvalidNode { node: NodeId, message: String },
    #[error("Duplicate node id {0}")]
    DuplicateNode(NodeId),
    #[error("Edge {edge} references unknown node {node}")]
    DanglingEdge { edge: String, node: NodeId },
    #[error("Edge {edge} cannot start from node {node} of kind {kind}")]
    InvalidEdge {
        edge: String,
        node: NodeId,
        kind: NodeKind,
    },
}

/// Attribute value as it appears in a graph file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    fn into_text(self) -> String {
        match self {
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Float(f) => f.to_string(),
            AttributeValue::Text(s) => s,
        }
    }
}

/// Serialized node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub metrics: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub position: Option<Position>,
}

/// Serialized edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: NodeId,
    pub kind: String,
    pub to: NodeId,
}

/// Serialized graph document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    attributes: HashMap<String, String>,
    metrics: HashMap<String, String>,
    position: Option<Position>,
}

/// Edges forming the containment tree walked by [`CodeGraph::preorder`]
const TREE_EDGES: [EdgeKind; 2] = [EdgeKind::ScopeHasMember, EdgeKind::MethodHasParameter];

/// Graph kept entirely in memory.
///
/// Preorder is a depth-first walk of the containment tree. Roots (nodes no
/// tree edge points to) and siblings keep the order they were added in.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, NodeData>,
    forward: HashMap<(NodeId, EdgeKind), Vec<NodeId>>,
    reverse: HashMap<(NodeId, EdgeKind), Vec<NodeId>>,
}

/// Builder handle returned by [`MemoryGraph::add_node`]
pub struct NodeBuilder<'a> {
    data: &'a mut NodeData,
}

impl NodeBuilder<'_> {
    /// Set a model attribute
    pub fn attr(self, name: &str, value: impl ToString) -> Self {
        self.data.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Set a derived metric
    pub fn metric(self, name: &str, value: impl ToString) -> Self {
        self.data.metrics.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the source position
    pub fn position(self, position: Position) -> Self {
        self.data.position = Some(position);
        self
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Add (or replace) a node
    pub fn add_node(&mut self, id: NodeId, kind: NodeKind) -> NodeBuilder<'_> {
        if !self.nodes.contains_key(&id) {
            self.order.push(id);
        }
        let data = self.nodes.entry(id).or_insert_with(|| NodeData {
            kind,
            attributes: HashMap::new(),
            metrics: HashMap::new(),
            position: None,
        });
        data.kind = kind;
        NodeBuilder { data }
    }

    /// Add a directed edge; both ends must exist and the edge must be valid on the source kind
    pub fn add_edge(&mut self, from: NodeId, edge: EdgeKind, to: NodeId) -> Result<(), GraphError> {
        let from_kind = self
            .nodes
            .get(&from)
            .map(|d| d.kind)
            .ok_or_else(|| GraphError::DanglingEdge {
                edge: edge.name(),
                node: from,
            })?;
        if !self.nodes.contains_key(&to) {
            return Err(GraphError::DanglingEdge {
                edge: edge.name(),
                node: to,
            });
        }
        if !edge.is_valid_on(from_kind) {
            return Err(GraphError::InvalidEdge {
                edge: edge.name(),
                node: from,
                kind: from_kind,
            });
        }

        self.forward.entry((from, edge)).or_default().push(to);
        self.reverse.entry((to, edge)).or_default().push(from);
        Ok(())
    }

    /// Load a graph from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: &Path) -> Result<Self, GraphError> {
        let content = fs::read_to_string(path).map_err(|source| GraphError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file: GraphFile = match ext {
            "json" => serde_json::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            _ => return Err(GraphError::UnsupportedFormat(ext.to_string())),
        };
        Self::from_graph_file(file)
    }

    /// Parse a graph from a JSON string
    pub fn from_json_str(content: &str) -> Result<Self, GraphError> {
        let file: GraphFile = serde_json::from_str(content)?;
        Self::from_graph_file(file)
    }

    /// Build a graph from its serialized form
    pub fn from_graph_file(file: GraphFile) -> Result<Self, GraphError> {
        let mut graph = Self::new();

        for record in file.nodes {
            if graph.nodes.contains_key(&record.id) {
                return Err(GraphError::DuplicateNode(record.id));
            }
            let kind: NodeKind = record
                .kind
                .parse()
                .map_err(|message| GraphError::InvalidNode {
                    node: record.id,
                    message,
                })?;

            let mut builder = graph.add_node(record.id, kind);
            for (name, value) in record.attributes {
                builder = builder.attr(&name, value.into_text());
            }
            for (name, value) in record.metrics {
                builder = builder.metric(&name, value.into_text());
            }
            if let Some(position) = record.position {
                builder.position(position);
            }
        }

        for record in file.edges {
            let edge: EdgeKind = record
                .kind
                .parse()
                .map_err(|message| GraphError::InvalidNode {
                    node: record.from,
                    message,
                })?;
            graph.add_edge(record.from, edge, record.to)?;
        }

        log::debug!(
            "Loaded graph with {} nodes and {} edge lists",
            graph.order.len(),
            graph.forward.len()
        );
        Ok(graph)
    }
}

impl CodeGraph for MemoryGraph {
    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|d| d.kind)
    }

    fn traverse(&self, node: NodeId, edge: EdgeKind, direction: Direction) -> Vec<NodeId> {
        let map = match direction {
            Direction::Forward => &self.forward,
            Direction::Reverse => &self.reverse,
        };
        map.get(&(node, edge)).cloned().unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.get(&node)?.attributes.get(name).cloned()
    }

    fn derived_metric(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.get(&node)?.metrics.get(name).cloned()
    }

    fn preorder(&self) -> Vec<NodeId> {
        let mut visited = HashSet::with_capacity(self.order.len());
        let mut result = Vec::with_capacity(self.order.len());

        let is_root = |node: &NodeId| {
            TREE_EDGES
                .iter()
                .all(|edge| !self.reverse.contains_key(&(*node, *edge)))
        };
        // containment cycles have no root, their nodes are picked up in insertion order
        let starts = self
            .order
            .iter()
            .filter(|n| is_root(*n))
            .chain(self.order.iter());

        for &start in starts {
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                if !visited.insert(node) {
                    continue;
                }
                result.push(node);
                for edge in TREE_EDGES.iter().rev() {
                    if let Some(children) = self.forward.get(&(node, *edge)) {
                        stack.extend(children.iter().rev().filter(|c| !visited.contains(*c)));
                    }
                }
            }
        }
        result
    }

    fn position(&self, node: NodeId) -> Option<Position> {
        self.nodes.get(&node)?.position.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        graph.add_node(1, NodeKind::Class).attr("name", "Shape");
        graph.add_node(2, NodeKind::Method).attr("name", "area").metric("LOC", 12);
        graph.add_edge(1, EdgeKind::ScopeHasMember, 2).unwrap();
        graph
    }

    #[test]
    fn test_forward_and_reverse() {
        let graph = sample();
        assert_eq!(graph.traverse(1, EdgeKind::ScopeHasMember, Direction::Forward), vec![2]);
        assert_eq!(graph.traverse(2, EdgeKind::ScopeHasMember, Direction::Reverse), vec![1]);
        assert!(graph.traverse(2, EdgeKind::ScopeHasMember, Direction::Forward).is_empty());
    }

    #[test]
    fn test_attributes_and_metrics() {
        let graph = sample();
        assert_eq!(graph.attribute(1, "name").as_deref(), Some("Shape"));
        assert_eq!(graph.derived_metric(2, "LOC").as_deref(), Some("12"));
        assert_eq!(graph.derived_metric(2, "NOA"), None);
        assert_eq!(graph.display_name(2), "area");
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let mut graph = sample();
        let err = graph.add_edge(1, EdgeKind::ScopeHasMember, 99).unwrap_err();
        assert!(matches!(err, GraphError::DanglingEdge { node: 99, .. }));
    }

    #[test]
    fn test_edge_on_wrong_kind_rejected() {
        let mut graph = sample();
        let err = graph.add_edge(2, EdgeKind::ClassIsSubclass, 1).unwrap_err();
        assert!(matches!(err, GraphError::InvalidEdge { node: 2, .. }));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "nodes": [
                {"id": 10, "kind": "ndkPackage", "attributes": {"name": "geo"}},
                {"id": 11, "kind": "Class", "attributes": {"name": "Point", "isAbstract": false},
                 "position": {"path": "geo/point.java", "line": 3, "column": 1, "endLine": 40, "endColumn": 2}}
            ],
            "edges": [{"from": 10, "kind": "Scope_HasMember", "to": 11}]
        }"#;
        let graph = MemoryGraph::from_json_str(json).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.kind(11), Some(NodeKind::Class));
        assert_eq!(graph.attribute(11, "isAbstract").as_deref(), Some("false"));
        assert_eq!(graph.preorder(), vec![10, 11]);
        assert_eq!(graph.position(11).unwrap().line, 3);
    }

    #[test]
    fn test_preorder_follows_containment() {
        let mut graph = MemoryGraph::new();
        graph.add_node(5, NodeKind::Parameter);
        graph.add_node(4, NodeKind::Method);
        graph.add_node(3, NodeKind::Attribute);
        graph.add_node(2, NodeKind::Class);
        graph.add_node(1, NodeKind::Package);
        graph.add_node(9, NodeKind::Type);
        graph.add_edge(1, EdgeKind::ScopeHasMember, 2).unwrap();
        graph.add_edge(2, EdgeKind::ScopeHasMember, 4).unwrap();
        graph.add_edge(2, EdgeKind::ScopeHasMember, 3).unwrap();
        graph.add_edge(4, EdgeKind::MethodHasParameter, 5).unwrap();

        // the parameter is visited under its method, before the next member
        assert_eq!(graph.preorder(), vec![1, 2, 4, 5, 3, 9]);
    }

    #[test]
    fn test_preorder_visits_cycles_once() {
        let mut graph = MemoryGraph::new();
        graph.add_node(1, NodeKind::Class);
        graph.add_node(2, NodeKind::Class);
        graph.add_edge(1, EdgeKind::ScopeHasMember, 2).unwrap();
        graph.add_edge(2, EdgeKind::ScopeHasMember, 1).unwrap();
        assert_eq!(graph.preorder(), vec![1, 2]);
    }

    #[test]
    fn test_unknown_kind_in_json() {
        let json = r#"{"nodes": [{"id": 1, "kind": "ndkWidget"}]}"#;
        assert!(matches!(
            MemoryGraph::from_json_str(json),
            Err(GraphError::InvalidNode { node: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_node_in_json() {
        let json = r#"{"nodes": [{"id": 1, "kind": "Class"}, {"id": 1, "kind": "Method"}]}"#;
        assert!(matches!(
            MemoryGraph::from_json_str(json),
            Err(GraphError::DuplicateNode(1))
        ));
    }
}
