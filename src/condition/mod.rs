//! Condition tree: the compiled form of a pattern
//!
//! A [`Condition`] is a closed sum type evaluated against one candidate node
//! at a time. Evaluation threads an [`EvaluationContext`] holding role
//! bindings, the currently-in stack and the recorder.

mod formula;
mod navigation;
mod node_type;

pub use formula::{calculate_with, numeric, operand_values, resolve_variable, test_formula};
pub use navigation::Navigation;
pub use node_type::NodeTypeCondition;

use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::formula::Formula;
use crate::model::{CodeGraph, NodeId, NodeKind};
use crate::script::{NodeBinding, ScriptCondition};
use std::fmt;

/// Boolean combinator of a Multi condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiKind {
    And,
    Or,
    Nand,
    Nor,
    Xor,
}

impl MultiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiKind::And => "and",
            MultiKind::Or => "or",
            MultiKind::Nand => "nand",
            MultiKind::Nor => "nor",
            MultiKind::Xor => "xor",
        }
    }

    /// Fold child results
    pub fn fold(&self, results: &[bool]) -> bool {
        let matched = results.iter().filter(|r| **r).count();
        match self {
            MultiKind::And => matched == results.len(),
            MultiKind::Or => matched > 0,
            MultiKind::Nand => matched != results.len(),
            MultiKind::Nor => matched == 0,
            MultiKind::Xor => matched == 1,
        }
    }
}

impl fmt::Display for MultiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MultiKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(MultiKind::And),
            "or" => Ok(MultiKind::Or),
            "nand" => Ok(MultiKind::Nand),
            "nor" => Ok(MultiKind::Nor),
            "xor" => Ok(MultiKind::Xor),
            _ => Err(format!("Unknown combinator: {}", s)),
        }
    }
}

/// A node of the condition tree
#[derive(Debug)]
pub enum Condition {
    NodeType(NodeTypeCondition),
    Multi(MultiKind, Vec<Condition>),
    Not(Box<Condition>),
    /// Every reached node satisfies the NodeType
    All(Navigation, Box<NodeTypeCondition>),
    /// At least one reached node satisfies the NodeType
    Any(Navigation, Box<NodeTypeCondition>),
    /// At least one reached node is of the kind
    Exists(Navigation, NodeKind),
    Formula(Formula),
    Script(Box<dyn ScriptCondition>),
}

impl Condition {
    /// Decide whether `node` matches
    pub fn test(
        &self,
        graph: &dyn CodeGraph,
        node: NodeId,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<bool, EvalError> {
        match self {
            Condition::NodeType(cond) => cond.test(graph, node, ctx),
            Condition::Multi(kind, children) => {
                // every child runs, side effects included
                let mut results = Vec::with_capacity(children.len());
                for child in children {
                    results.push(child.test(graph, node, ctx)?);
                }
                Ok(kind.fold(&results))
            }
            Condition::Not(child) => Ok(!child.test(graph, node, ctx)?),
            Condition::All(nav, cond) => {
                let Some(reached) = nav.reached(graph, node, ctx)? else {
                    return Ok(false);
                };
                for target in reached {
                    if !cond.test(graph, target, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Any(nav, cond) => {
                let Some(reached) = nav.reached(graph, node, ctx)? else {
                    return Ok(false);
                };
                for target in reached {
                    if cond.test(graph, target, ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Exists(nav, kind) => {
                let Some(reached) = nav.reached(graph, node, ctx)? else {
                    return Ok(false);
                };
                Ok(reached.into_iter().any(|target| {
                    graph
                        .kind(target)
                        .is_some_and(|k| graph.is_subtype(k, *kind))
                }))
            }
            Condition::Formula(formula) => test_formula(formula, graph, node, ctx),
            Condition::Script(script) => {
                let Some(kind) = graph.kind(node) else {
                    return Ok(false);
                };
                if !graph.is_subtype(kind, script.node_kind_filter()) {
                    return Ok(false);
                }
                match script.visit(&NodeBinding::new(graph, node)) {
                    Ok(Some(message)) => {
                        ctx.set_message(message);
                        Ok(true)
                    }
                    Ok(None) => Ok(false),
                    Err(err) => Err(EvalError::Script {
                        name: script.name().unwrap_or("script").to_string(),
                        message: err.0,
                    }),
                }
            }
        }
    }

    /// The root NodeType, if this is one
    pub fn as_node_type(&self) -> Option<&NodeTypeCondition> {
        match self {
            Condition::NodeType(cond) => Some(cond),
            _ => None,
        }
    }
}
