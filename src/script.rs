//! Script conditions: patterns implemented in code instead of documents
//!
//! A [`ScriptCondition`] filters candidates by node kind and reports a match
//! by returning a message from `visit`. Script files are turned into
//! conditions by a [`ScriptHost`] registered with the loader.

use crate::error::EvalError;
use crate::lim;
use crate::model::{CodeGraph, Direction, EdgeKind, NodeId, NodeKind};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Failure reported by a script
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ScriptError(pub String);

impl From<EvalError> for ScriptError {
    fn from(err: EvalError) -> Self {
        ScriptError(err.to_string())
    }
}

/// A pattern implemented as code
pub trait ScriptCondition: Send + Sync + fmt::Debug {
    /// Only nodes of this kind (or a subtype) are visited
    fn node_kind_filter(&self) -> NodeKind;

    /// `Some(message)` reports a match
    fn visit(&self, node: &NodeBinding<'_>) -> Result<Option<String>, ScriptError>;

    /// Pattern name, if the script declares one
    fn name(&self) -> Option<&str> {
        None
    }
}

/// Turns script files into conditions
pub trait ScriptHost: Send + Sync {
    /// File extensions this host accepts, without the dot
    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn load(&self, path: &Path) -> Result<Box<dyn ScriptCondition>, ScriptError>;
}

/// A graph node handed to a script
#[derive(Clone, Copy)]
pub struct NodeBinding<'g> {
    graph: &'g dyn CodeGraph,
    node: NodeId,
}

impl<'g> NodeBinding<'g> {
    pub fn new(graph: &'g dyn CodeGraph, node: NodeId) -> Self {
        Self { graph, node }
    }

    pub fn id(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> Option<NodeKind> {
        self.graph.kind(self.node)
    }

    /// True when the node is of `kind` or one of its subtypes
    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind().is_some_and(|k| self.graph.is_subtype(k, kind))
    }

    /// LIM attribute or metric value
    pub fn get_value(&self, name: &str) -> Result<String, ScriptError> {
        Ok(lim::value_of(self.graph, self.node, name)?)
    }

    pub fn name(&self) -> String {
        self.graph.display_name(self.node)
    }

    pub fn get_type(&self) -> Option<NodeBinding<'g>> {
        lim::type_of(self.graph, self.node).map(|n| Self::new(self.graph, n))
    }

    pub fn get_class(&self) -> Result<NodeBinding<'g>, ScriptError> {
        let class = lim::navigate(self.graph, self.node, "class")?
            .ok_or_else(|| ScriptError(format!("Node {} has no class", self.node)))?;
        Ok(Self::new(self.graph, class))
    }

    pub fn get_parent(&self) -> Result<NodeBinding<'g>, ScriptError> {
        let parent = lim::navigate(self.graph, self.node, "parent")?.unwrap_or(self.node);
        Ok(Self::new(self.graph, parent))
    }

    /// Nodes reached along `edge`, optionally restricted to `kind`
    pub fn traverse(
        &self,
        edge: EdgeKind,
        kind: Option<NodeKind>,
        direction: Direction,
    ) -> Vec<NodeBinding<'g>> {
        self.graph
            .traverse(self.node, edge, direction)
            .into_iter()
            .map(|n| Self::new(self.graph, n))
            .filter(|b| kind.map_or(true, |k| b.is(k)))
            .collect()
    }

    /// Both nodes resolve to the same type
    pub fn type_equal(&self, other: &NodeBinding<'_>) -> bool {
        match (lim::type_of(self.graph, self.node), lim::type_of(other.graph, other.node)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// The single-type sets of both nodes' types intersect within `depth` levels
    pub fn type_similar(&self, other: &NodeBinding<'_>, depth: u32) -> bool {
        match (lim::type_of(self.graph, self.node), lim::type_of(other.graph, other.node)) {
            (Some(a), Some(b)) => {
                let left = lim::single_types(self.graph, a, depth);
                let right = lim::single_types(other.graph, b, depth);
                !left.is_disjoint(&right)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for NodeBinding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBinding").field("node", &self.node).finish()
    }
}
