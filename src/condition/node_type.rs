//! NodeType condition: kind filter plus role binding

use super::Condition;
use crate::calculate::Code;
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::meta::PatternMeta;
use crate::model::{CodeGraph, NodeId, NodeKind};

/// Matches nodes of a kind (or subtype), binding them to a role while the
/// inner condition is evaluated
#[derive(Debug)]
pub struct NodeTypeCondition {
    pub kind: NodeKind,
    pub filter: Option<Box<Condition>>,
    pub inner: Option<Box<Condition>>,
    pub calculate: Option<Code>,
    pub meta: PatternMeta,
    pub write_to_graph: bool,
}

impl NodeTypeCondition {
    pub fn new(kind: NodeKind, meta: PatternMeta) -> Self {
        Self {
            kind,
            filter: None,
            inner: None,
            calculate: None,
            meta,
            write_to_graph: false,
        }
    }

    pub fn with_filter(mut self, filter: Condition) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn with_inner(mut self, inner: Condition) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    pub fn with_calculate(mut self, code: Code) -> Self {
        self.calculate = Some(code);
        self
    }

    pub fn role(&self) -> &str {
        &self.meta.role
    }

    pub fn test(
        &self,
        graph: &dyn CodeGraph,
        node: NodeId,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<bool, EvalError> {
        let Some(kind) = graph.kind(node) else {
            return Ok(false);
        };
        if !graph.is_subtype(kind, self.kind) {
            return Ok(false);
        }

        if let Some(filter) = &self.filter {
            if !filter.test(graph, node, ctx)? {
                log::trace!("Filter of role '{}' rejected node {}", self.meta.role, node);
                return Ok(false);
            }
        }

        let depth = ctx.depth();
        let role = self.meta.role.as_str();
        ctx.with_role(self.kind, role, node, |ctx| {
            ctx.recorder()
                .add_trace_entry(node, role, &self.meta.name, depth);

            if let Some(code) = &self.calculate {
                code.run(graph, node, ctx)?;
            }

            let matched = match &self.inner {
                Some(inner) => inner.test(graph, node, ctx)?,
                None => true,
            };

            if !matched {
                ctx.recorder().remove_trace_entry(node);
            } else if self.write_to_graph {
                let variables = ctx
                    .table()
                    .get(role)
                    .map(|b| b.variables.clone())
                    .unwrap_or_default();
                ctx.recorder().record_variables(node, role, &variables);
            }
            Ok(matched)
        })
    }
}
