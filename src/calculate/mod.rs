//! Calculate blocks: a small imperative language attached to a NodeType
//!
//! A block declares variables in `define` and then runs statements: `for`
//! loops over an edge, `if`/`elseIf`/`else` chains testing conditions, and
//! assignments of the form `lhs = expr`. Variables live in the role table,
//! in the scope of the role the block belongs to.

use crate::condition::{operand_values, Condition, Navigation};
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::formula::{FormulaError, FormulaExpression, FormulaPart, Operator};
use crate::model::{CodeGraph, NodeId};
use crate::value::{default_value_for, Value, ValueFamily, ValueKind};

/// A compiled Calculate block
#[derive(Debug, Default)]
pub struct Code {
    /// Declared variables and their kinds, in declaration order
    pub define: Vec<(String, ValueKind)>,
    pub block: Vec<Statement>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.define.is_empty() && self.block.is_empty()
    }

    /// Initialize the declared variables and run the block for `node`
    pub fn run(
        &self,
        graph: &dyn CodeGraph,
        node: NodeId,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<(), EvalError> {
        for (name, kind) in &self.define {
            ctx.set_scope_variable(name, default_value_for(*kind));
        }
        run_block(&self.block, graph, node, ctx)
    }
}

/// Run statements in order, stopping at the first error
pub fn run_block(
    block: &[Statement],
    graph: &dyn CodeGraph,
    node: NodeId,
    ctx: &mut EvaluationContext<'_>,
) -> Result<(), EvalError> {
    for statement in block {
        statement.run(graph, node, ctx)?;
    }
    Ok(())
}

#[derive(Debug)]
pub enum Statement {
    For(ForLoop),
    If(IfChain),
    Assign(Assignment),
}

impl Statement {
    pub fn run(
        &self,
        graph: &dyn CodeGraph,
        node: NodeId,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<(), EvalError> {
        match self {
            Statement::For(the_loop) => the_loop.run(graph, node, ctx),
            Statement::If(chain) => chain.run(graph, node, ctx),
            Statement::Assign(assignment) => assignment.run(graph, node, ctx),
        }
    }
}

/// `for` over the nodes reached along an edge
#[derive(Debug)]
pub struct ForLoop {
    /// Bound to each reached node in turn
    pub variable: String,
    pub navigation: Navigation,
    /// Reset to Empty on every iteration and never written back
    pub locals: Vec<String>,
    pub block: Vec<Statement>,
}

impl ForLoop {
    pub fn run(
        &self,
        graph: &dyn CodeGraph,
        node: NodeId,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<(), EvalError> {
        let Some(reached) = self.navigation.reached(graph, node, ctx)? else {
            log::debug!(
                "Loop over '{}' has no origin, skipped",
                self.navigation.edge.name()
            );
            return Ok(());
        };

        for target in reached {
            let mut scope = ctx.scope();
            ctx.set_scope_variable(&self.variable, Value::NodeRef(target));
            for local in &self.locals {
                ctx.set_scope_variable(local, Value::Empty);
            }

            let result = run_block(&self.block, graph, node, ctx);

            for (name, value) in ctx.scope() {
                if name == self.variable || self.locals.contains(&name) || value.is_empty() {
                    continue;
                }
                scope.insert(name, value);
            }
            ctx.replace_scope(scope);
            result?;
        }

        ctx.set_scope_variable(&self.variable, Value::Empty);
        Ok(())
    }
}

/// `if` / `elseIf` / `else`
#[derive(Debug, Default)]
pub struct IfChain {
    /// The `if` branch followed by every `elseIf`
    pub branches: Vec<(Condition, Vec<Statement>)>,
    pub otherwise: Vec<Statement>,
}

impl IfChain {
    pub fn run(
        &self,
        graph: &dyn CodeGraph,
        node: NodeId,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<(), EvalError> {
        for (condition, block) in &self.branches {
            // testing must not leave bindings or variables behind
            let holds = ctx.with_snapshot(|ctx| condition.test(graph, node, ctx))?;
            if holds {
                return run_block(block, graph, node, ctx);
            }
        }
        run_block(&self.otherwise, graph, node, ctx)
    }
}

/// `lhs = expr`, where `lhs` is `var` (current scope) or `role.var`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub role: Option<String>,
    pub name: String,
    pub expression: FormulaExpression,
    source: String,
}

impl Assignment {
    /// Parse `lhs = expr`
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let not_assignment = || FormulaError::NotAssignment(source.to_string());

        let (lhs, rhs) = source.split_once('=').ok_or_else(not_assignment)?;
        if rhs.starts_with('=') || lhs.ends_with(['<', '>', '!', '~']) {
            return Err(not_assignment());
        }

        let segments: Vec<&str> = lhs.trim().split('.').collect();
        let valid = |s: &&str| {
            s.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
                && s.chars().all(|c| c.is_alphanumeric() || c == '_')
        };
        if !segments.iter().all(valid) {
            return Err(not_assignment());
        }
        let (role, name) = match segments.as_slice() {
            [name] => (None, name.to_string()),
            [role, name] => (Some(role.to_string()), name.to_string()),
            _ => return Err(not_assignment()),
        };

        let rhs = rhs.trim();
        if rhs.is_empty() {
            return Err(FormulaError::EmptySide(source.to_string()));
        }
        Ok(Self {
            role,
            name,
            expression: FormulaExpression::parse(rhs)?,
            source: source.trim().to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn run(
        &self,
        graph: &dyn CodeGraph,
        node: NodeId,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<(), EvalError> {
        let Some(values) = operand_values(graph, node, &self.expression, ctx)? else {
            log::debug!("'{}' refers to an unbound role, skipped", self.source);
            return Ok(());
        };
        let value = self.evaluate(&values)?;
        log::trace!("{} => {}", self.source, value);

        match &self.role {
            Some(role) => ctx.set_variable(role, &self.name, value),
            None => ctx.set_scope_variable(&self.name, value),
        }
        Ok(())
    }

    fn evaluate(&self, values: &[Value]) -> Result<Value, EvalError> {
        // a lone variable keeps its value, node references included
        if let Some(FormulaPart::Variable(variable)) = self.expression.single_operand() {
            if let Some(value) = values.first() {
                return Ok(match value {
                    Value::Int(i) if variable.negative => Value::Int(-i),
                    Value::Float(f) if variable.negative => Value::Float(-f),
                    other => other.clone(),
                });
            }
        }

        let mut family = None;
        for value in values {
            let current = match value.family() {
                ValueFamily::Empty => {
                    return Err(EvalError::UnsetVariable(self.source.clone()));
                }
                other => other,
            };
            match family {
                None => family = Some(current),
                Some(first) if first != current => {
                    return Err(EvalError::TypeMismatch {
                        expression: self.source.clone(),
                        left: format!("{:?}", first),
                        right: format!("{:?}", current),
                    });
                }
                Some(_) => {}
            }
        }

        match family {
            Some(ValueFamily::Text) => self.concatenate(values),
            Some(ValueFamily::Node) if values.len() > 1 => Err(EvalError::TypeMismatch {
                expression: self.source.clone(),
                left: "Node".to_string(),
                right: "Node".to_string(),
            }),
            _ => {
                let number = crate::condition::calculate_with(&self.expression, values)?;
                Ok(Value::from_number(number))
            }
        }
    }

    fn concatenate(&self, values: &[Value]) -> Result<Value, EvalError> {
        if let Some(op) = self.expression.operators().find(|op| *op != Operator::Add) {
            return Err(EvalError::StringOperator {
                operator: op.symbol(),
                expression: self.source.clone(),
            });
        }
        // postfix keeps operands in their infix order
        let text: String = values.iter().map(|v| v.to_string()).collect();
        Ok(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RoleTable;
    use crate::condition::NodeTypeCondition;
    use crate::formula::Formula;
    use crate::meta::PatternMeta;
    use crate::model::{Direction, EdgeKind, MemoryGraph, NodeKind};
    use crate::recorder::TraceRecorder;

    fn graph() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        g.add_node(1, NodeKind::Class).attr("name", "Shape");
        g.add_node(2, NodeKind::Method).attr("name", "area").metric("LOC", 10);
        g.add_node(3, NodeKind::Method).attr("name", "draw").metric("LOC", 20);
        g.add_node(4, NodeKind::Attribute).attr("name", "size").attr("isStatic", true);
        for member in 2..5 {
            g.add_edge(1, EdgeKind::ScopeHasMember, member).unwrap();
        }
        g
    }

    fn assign(text: &str) -> Statement {
        Statement::Assign(Assignment::parse(text).unwrap())
    }

    fn members_loop(block: Vec<Statement>, locals: &[&str]) -> Statement {
        Statement::For(ForLoop {
            variable: "m".into(),
            navigation: Navigation::new(EdgeKind::ScopeHasMember, Direction::Forward),
            locals: locals.iter().map(|l| l.to_string()).collect(),
            block,
        })
    }

    /// Run `code` for the class with role `c` bound and return the role's variables
    fn run(code: &Code) -> Result<crate::context::VarScope, EvalError> {
        let g = graph();
        let mut table = RoleTable::new();
        table.register("c", true);
        let mut recorder = TraceRecorder::new();
        let mut ctx = EvaluationContext::new(vec![table], &mut recorder);
        ctx.with_role(NodeKind::Class, "c", 1, |ctx| {
            code.run(&g, 1, ctx)?;
            Ok(ctx.scope())
        })
    }

    #[test]
    fn test_parse_assignment() {
        let a = Assignment::parse("total = total + m.LOC").unwrap();
        assert_eq!(a.role, None);
        assert_eq!(a.name, "total");
        assert_eq!(a.expression.to_string(), "total m.LOC +");

        let a = Assignment::parse("c.count = 1").unwrap();
        assert_eq!(a.role.as_deref(), Some("c"));

        assert!(Assignment::parse("total == 1").is_err());
        assert!(Assignment::parse("total <= 1").is_err());
        assert!(Assignment::parse("a.b.c = 1").is_err());
        assert!(Assignment::parse("total =").is_err());
        assert!(Assignment::parse("no assignment").is_err());
    }

    #[test]
    fn test_for_loop_runs_per_node_and_writes_back() {
        let code = Code {
            define: vec![("count".into(), ValueKind::Int), ("total".into(), ValueKind::Int)],
            block: vec![members_loop(
                vec![
                    assign("tmp = 1"),
                    assign("count = count + tmp"),
                    assign("seen = m"),
                ],
                &["tmp"],
            )],
        };
        let scope = run(&code).unwrap();

        assert_eq!(scope.get("count"), Some(&Value::Int(3)));
        assert_eq!(scope.get("m"), Some(&Value::Empty));
        assert_eq!(scope.get("tmp"), None);
        assert_eq!(scope.get("seen"), Some(&Value::NodeRef(4)));
    }

    #[test]
    fn test_loop_variable_navigation() {
        let code = Code {
            define: vec![("total".into(), ValueKind::Int)],
            block: vec![members_loop(
                vec![Statement::If(IfChain {
                    branches: vec![(
                        Condition::Formula(Formula::parse("m.kind == ndkMethod").unwrap()),
                        vec![assign("total = total + m.LOC")],
                    )],
                    otherwise: vec![],
                })],
                &[],
            )],
        };
        let scope = run(&code).unwrap();
        assert_eq!(scope.get("total"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_if_else_chain() {
        let chain = |formula: &str| Code {
            define: vec![("label".into(), ValueKind::String)],
            block: vec![Statement::If(IfChain {
                branches: vec![
                    (
                        Condition::Formula(Formula::parse(formula).unwrap()),
                        vec![assign("label = 'first'")],
                    ),
                    (
                        Condition::Formula(Formula::parse("name == 'Shape'").unwrap()),
                        vec![assign("label = 'second'")],
                    ),
                ],
                otherwise: vec![assign("label = 'none'")],
            })],
        };

        let scope = run(&chain("1 == 1")).unwrap();
        assert_eq!(scope.get("label"), Some(&Value::String("first".into())));
        let scope = run(&chain("1 == 2")).unwrap();
        assert_eq!(scope.get("label"), Some(&Value::String("second".into())));
    }

    #[test]
    fn test_if_condition_changes_are_rolled_back() {
        let g = graph();
        let mut table = RoleTable::new();
        table.register("c", false);
        table.register("k", false);
        let mut recorder = TraceRecorder::new();
        let mut ctx = EvaluationContext::new(vec![table], &mut recorder);

        let class_check = NodeTypeCondition::new(NodeKind::Class, PatternMeta::new("", "k"))
            .with_calculate(Code {
                define: vec![],
                block: vec![assign("flag = 1"), assign("c.label = 'inside'")],
            });
        let code = Code {
            define: vec![("label".into(), ValueKind::String)],
            block: vec![
                assign("label = 'before'"),
                Statement::If(IfChain {
                    branches: vec![(Condition::NodeType(class_check), vec![assign("seen = label")])],
                    otherwise: vec![],
                }),
            ],
        };

        let scope = ctx
            .with_role(NodeKind::Class, "c", 1, |ctx| {
                code.run(&g, 1, ctx)?;
                Ok(ctx.scope())
            })
            .unwrap();
        assert_eq!(scope.get("label"), Some(&Value::String("before".into())));
        assert_eq!(scope.get("seen"), Some(&Value::String("before".into())));
        assert_eq!(ctx.bound("k"), None);
        assert_eq!(ctx.variable("k", "flag"), None);
    }

    #[test]
    fn test_string_concatenation() {
        let code = Code {
            define: vec![("label".into(), ValueKind::String)],
            block: vec![assign("label = 'class ' + name")],
        };
        let scope = run(&code).unwrap();
        assert_eq!(scope.get("label"), Some(&Value::String("class Shape".into())));

        let code = Code {
            define: vec![],
            block: vec![assign("label = 'a' * 'b'")],
        };
        assert!(matches!(run(&code), Err(EvalError::StringOperator { operator: '*', .. })));
    }

    #[test]
    fn test_family_mismatch() {
        let code = Code {
            define: vec![("count".into(), ValueKind::Int)],
            block: vec![assign("count = count + name")],
        };
        assert!(matches!(run(&code), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn test_float_result() {
        let code = Code {
            define: vec![],
            block: vec![assign("ratio = 3 / 2"), assign("whole = 4 / 2")],
        };
        let scope = run(&code).unwrap();
        assert_eq!(scope.get("ratio"), Some(&Value::Float(1.5)));
        assert_eq!(scope.get("whole"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_role_target() {
        let g = graph();
        let mut table = RoleTable::new();
        table.register("c", false);
        table.register("m", false);
        let mut recorder = TraceRecorder::new();
        let mut ctx = EvaluationContext::new(vec![table], &mut recorder);
        let code = Code {
            define: vec![],
            block: vec![assign("c.flag = 7")],
        };
        ctx.with_role(NodeKind::Method, "m", 2, |ctx| code.run(&g, 2, ctx))
            .unwrap();
        assert_eq!(ctx.variable("c", "flag"), Some(&Value::Int(7)));
        assert_eq!(ctx.variable("m", "flag"), None);
    }
}
