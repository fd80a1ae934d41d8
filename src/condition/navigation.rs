//! Edge navigation shared by All, Any, Exists and Calculate loops

use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::lim;
use crate::model::{CodeGraph, Direction, EdgeKind, NodeId};
use crate::value::Value;

/// Edge to follow, its direction, and an optional origin path (`role[.type|.class]...`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub edge: EdgeKind,
    pub direction: Direction,
    pub from: Vec<String>,
}

impl Navigation {
    pub fn new(edge: EdgeKind, direction: Direction) -> Self {
        Self {
            edge,
            direction,
            from: Vec::new(),
        }
    }

    /// Set the origin from a dotted path
    pub fn with_from(mut self, from: &str) -> Self {
        self.from = from.split('.').map(str::to_string).collect();
        self
    }

    /// Node the edge is followed from; `None` when a role on the path is unbound
    pub fn origin(
        &self,
        graph: &dyn CodeGraph,
        node: NodeId,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Option<NodeId>, EvalError> {
        let Some((first, rest)) = self.from.split_first() else {
            return Ok(Some(node));
        };

        let mut cursor = if ctx.is_role(first) {
            match ctx.bound(first) {
                Some(bound) => bound,
                None => return Ok(None),
            }
        } else if let Some(Value::NodeRef(bound)) = ctx.scope_variable(first) {
            *bound
        } else {
            return Ok(None);
        };

        for step in rest {
            match lim::navigate(graph, cursor, step)? {
                Some(next) => cursor = next,
                None => return Ok(None),
            }
        }
        Ok(Some(cursor))
    }

    /// Nodes reached from the origin; `None` when the origin cannot be resolved
    pub fn reached(
        &self,
        graph: &dyn CodeGraph,
        node: NodeId,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Option<Vec<NodeId>>, EvalError> {
        Ok(self
            .origin(graph, node, ctx)?
            .map(|origin| graph.traverse(origin, self.edge, self.direction)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RoleTable;
    use crate::model::{MemoryGraph, NodeKind};
    use crate::recorder::TraceRecorder;

    fn graph() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        g.add_node(1, NodeKind::Class);
        g.add_node(2, NodeKind::Method);
        g.add_node(3, NodeKind::Attribute);
        g.add_edge(1, EdgeKind::ScopeHasMember, 2).unwrap();
        g.add_edge(1, EdgeKind::ScopeHasMember, 3).unwrap();
        g
    }

    #[test]
    fn test_origin_defaults_to_candidate() {
        let g = graph();
        let mut recorder = TraceRecorder::new();
        let ctx = EvaluationContext::new(vec![RoleTable::new()], &mut recorder);
        let nav = Navigation::new(EdgeKind::ScopeHasMember, Direction::Forward);
        assert_eq!(nav.reached(&g, 1, &ctx).unwrap(), Some(vec![2, 3]));
    }

    #[test]
    fn test_origin_from_role() {
        let g = graph();
        let mut table = RoleTable::new();
        table.register("c", false);
        let mut recorder = TraceRecorder::new();
        let mut ctx = EvaluationContext::new(vec![table], &mut recorder);
        let nav = Navigation::new(EdgeKind::ScopeHasMember, Direction::Reverse).with_from("c");

        assert_eq!(nav.origin(&g, 2, &ctx).unwrap(), None);
        let reached = ctx
            .with_role(NodeKind::Class, "c", 2, |ctx| nav.reached(&g, 3, ctx))
            .unwrap();
        assert_eq!(reached, Some(vec![1]));
    }
}
