//! Variable resolution and formula evaluation

use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::formula::{Formula, FormulaExpression, FormulaPart, Relation, Variable};
use crate::lim;
use crate::model::{CodeGraph, NodeId};
use crate::value::{cast_string_to_value, string_surrogate, Value};

/// Resolve a dotted variable path starting at `node`.
///
/// Leading segments are a role (or a scope variable holding a node) followed by
/// `type`/`class`/`parent` steps. The last segment is looked up as a scope
/// variable, a variable of the cursor's role, a LIM attribute, or a metric.
/// Returns `None` when a role on the path is unbound.
pub fn resolve_variable(
    graph: &dyn CodeGraph,
    node: NodeId,
    variable: &Variable,
    ctx: &EvaluationContext<'_>,
) -> Result<Option<Value>, EvalError> {
    let mut cursor = node;
    let mut cursor_role: Option<&str> = None;

    for (index, segment) in variable.parents.iter().enumerate() {
        if index == 0 && ctx.is_role(segment) {
            match ctx.bound(segment) {
                Some(bound) => {
                    cursor = bound;
                    cursor_role = Some(segment.as_str());
                }
                None => return Ok(None),
            }
            continue;
        }
        if index == 0 {
            if let Some(Value::NodeRef(bound)) = ctx.scope_variable(segment) {
                cursor = *bound;
                continue;
            }
        }
        match lim::navigate(graph, cursor, segment)? {
            Some(next) => {
                cursor = next;
                cursor_role = None;
            }
            None => return Ok(None),
        }
    }

    if variable.is_simple() {
        if let Some(value) = ctx.scope_variable(&variable.name) {
            return Ok(Some(value.clone()));
        }
    }
    if let Some(role) = cursor_role {
        if let Some(value) = ctx.variable(role, &variable.name) {
            return Ok(Some(value.clone()));
        }
    }

    let raw = lim::value_of(graph, cursor, &variable.name)?;
    Ok(Some(cast_string_to_value(&raw)))
}

/// Value of every operand of `expression`, in postfix order; `None` if any is unbound
pub fn operand_values(
    graph: &dyn CodeGraph,
    node: NodeId,
    expression: &FormulaExpression,
    ctx: &EvaluationContext<'_>,
) -> Result<Option<Vec<Value>>, EvalError> {
    let mut values = Vec::new();
    for part in expression.parts() {
        let value = match part {
            FormulaPart::Operator(_) => continue,
            FormulaPart::Number { value, negative } => {
                Value::Int(if *negative { -*value } else { *value })
            }
            FormulaPart::Literal(text) => Value::String(text.clone()),
            FormulaPart::Variable(variable) => {
                match resolve_variable(graph, node, variable, ctx)? {
                    Some(value) => value,
                    None => return Ok(None),
                }
            }
        };
        values.push(value);
    }
    Ok(Some(values))
}

/// Numeric view used by the RPN evaluator; strings map to their surrogate
pub fn numeric(value: &Value) -> f64 {
    match value {
        Value::String(text) => string_surrogate(text),
        Value::Empty => 0.0,
        other => other.as_f64().unwrap_or(0.0),
    }
}

/// Evaluate `expression` numerically over already resolved operand values
pub fn calculate_with(expression: &FormulaExpression, values: &[Value]) -> Result<f64, EvalError> {
    // numbers are pushed by the evaluator itself, only variables and literals are asked for
    let mut operands = expression
        .parts()
        .iter()
        .filter(|p| p.is_operand())
        .zip(values)
        .filter(|(p, _)| !matches!(p, FormulaPart::Number { .. }))
        .map(|(_, v)| v);

    expression.calculate::<EvalError, _>(|_| {
        operands
            .next()
            .map(numeric)
            .ok_or_else(|| EvalError::Malformed(expression.source().to_string()))
    })
}

fn ends_with_type(expression: &FormulaExpression) -> bool {
    expression
        .variables()
        .any(|v| v.name == "type" || v.name == "returnType")
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left.to_string() == right.to_string(),
    }
}

fn as_type_node(graph: &dyn CodeGraph, formula: &Formula, value: &Value) -> Result<NodeId, EvalError> {
    let id = match value {
        Value::NodeRef(id) => Some(*id),
        Value::Int(id) if *id >= 0 => NodeId::try_from(*id).ok(),
        _ => None,
    };
    id.filter(|id| graph.kind(*id).is_some())
        .ok_or_else(|| EvalError::TypeNotResolved {
            expression: formula.to_string(),
            value: value.to_string(),
        })
}

/// Evaluate a compiled formula against `node`
pub fn test_formula(
    formula: &Formula,
    graph: &dyn CodeGraph,
    node: NodeId,
    ctx: &EvaluationContext<'_>,
) -> Result<bool, EvalError> {
    let Some(left) = operand_values(graph, node, &formula.left, ctx)? else {
        return Ok(false);
    };
    let Some(right) = operand_values(graph, node, &formula.right, ctx)? else {
        return Ok(false);
    };

    let single = formula.left.single_operand().is_some() && formula.right.single_operand().is_some();

    if formula.relation == Relation::Similar && single {
        if ends_with_type(&formula.left) || ends_with_type(&formula.right) {
            let l = as_type_node(graph, formula, &left[0])?;
            let r = as_type_node(graph, formula, &right[0])?;
            return lim::types_similar(graph, l, r);
        }
        return Ok(left[0]
            .to_string()
            .eq_ignore_ascii_case(&right[0].to_string()));
    }

    if single && matches!(formula.relation, Relation::Equal | Relation::NotEqual) {
        let equal = values_equal(&left[0], &right[0]);
        return Ok(equal == (formula.relation == Relation::Equal));
    }

    let l = calculate_with(&formula.left, &left)?;
    let r = calculate_with(&formula.right, &right)?;
    log::trace!("{} => {} {} {}", formula, l, formula.relation, r);
    Ok(formula.relation.compare(l, r))
}
