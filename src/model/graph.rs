//! Traversal adapter - the boundary between the engine and a code graph

use super::edges::{Direction, EdgeKind};
use super::kinds::NodeKind;
use super::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source position of a node
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Position {
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [Ln:{}, Col:{} - Ln:{}, Col:{}]",
            self.path, self.line, self.column, self.end_line, self.end_column
        )
    }
}

/// Read-only view of a code graph consumed by the engine
pub trait CodeGraph: Send + Sync {
    /// Kind of a node, `None` if the id is unknown
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Nodes reached from `node` along `edge` in `direction`
    fn traverse(&self, node: NodeId, edge: EdgeKind, direction: Direction) -> Vec<NodeId>;

    /// Stored model attribute (name, isStatic, accessibility, ...)
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Derived metric calculated for the node (LOC, NOA, ...)
    fn derived_metric(&self, node: NodeId, name: &str) -> Option<String>;

    /// All nodes in the fixed traversal order
    fn preorder(&self) -> Vec<NodeId>;

    /// Source position, if the graph records one
    fn position(&self, _node: NodeId) -> Option<Position> {
        None
    }

    /// Kind-subtype test
    fn is_subtype(&self, kind: NodeKind, of: NodeKind) -> bool {
        kind.is_subtype_of(of)
    }

    /// Display name of a node, falling back to its id
    fn display_name(&self, node: NodeId) -> String {
        self.attribute(node, "name")
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| node.to_string())
    }
}
