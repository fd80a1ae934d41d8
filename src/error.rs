//! Runtime evaluation errors

use crate::formula::FormulaError;
use crate::model::{NodeId, NodeKind};
use thiserror::Error;

/// A runtime inconsistency that aborts evaluation of the current pattern document.
///
/// Ordinary non-matches (empty edges, unbound roles, failing filters) are not
/// errors; they evaluate to `false`.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Node {0} does not exist in the graph")]
    UnknownNode(NodeId),

    #[error("Node {node} is not a Type (found {found})")]
    NotAType { node: NodeId, found: NodeKind },

    #[error("'class' lookup found no Class for node {0}")]
    ClassNotFound(NodeId),

    #[error("Reverse edge 'Member_Instance' on node {0} should exist but it doesn't")]
    MissingInstance(NodeId),

    #[error("'{value}' in '{expression}' does not resolve to a type")]
    TypeNotResolved { expression: String, value: String },

    #[error("Values of different types in '{expression}': {left} and {right}")]
    TypeMismatch {
        expression: String,
        left: String,
        right: String,
    },

    #[error("Operator '{operator}' cannot be applied to strings in '{expression}'")]
    StringOperator { operator: char, expression: String },

    #[error("Variable '{0}' has no value")]
    UnsetVariable(String),

    #[error("Malformed expression: {0}")]
    Malformed(String),

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("Script '{name}' failed: {message}")]
    Script { name: String, message: String },
}
