//! Checks run before a node type or formula is compiled

use super::{
    scalar_text, CompileError, Compiler, CONDITIONS, EDGE, FILTERS, FROM, KIND, NAME, PRIORITY,
    ROLE,
};
use crate::formula::{parse_scalar, split_formula, Relation};
use crate::lim::{self, LimAttribute};
use crate::meta::Priority;
use crate::model::NodeKind;
use serde_yaml::Value;

/// Navigation steps allowed inside a dotted reference
const STEPS: [&str; 3] = ["type", "class", "parent"];

/// Last segments that make a side eligible for `~=`
const SIMILAR_TARGETS: [&str; 3] = ["type", "returnType", "name"];

impl Compiler {
    /// Validate the keys of a node type, in a fixed order
    pub(super) fn validate_node(&self, node: &Value) -> Result<(), CompileError> {
        let kind = node.get(KIND).ok_or(CompileError::Missing(KIND))?;
        let kind = scalar_text(kind).ok_or(CompileError::NotText(KIND))?;
        kind.parse::<NodeKind>()
            .map_err(|_| CompileError::UnknownKind(kind.clone()))?;

        for key in [CONDITIONS, FILTERS] {
            if node.get(key).is_some_and(Value::is_null) {
                return Err(CompileError::Empty(key));
            }
        }

        let role = node.get(ROLE).ok_or(CompileError::Missing(ROLE))?;
        let role = scalar_text(role).ok_or(CompileError::NotText(ROLE))?;

        if node.get(NAME).is_none() && node.get(EDGE).is_none() {
            return Err(CompileError::NameOrEdge);
        }
        for key in [NAME, EDGE] {
            if let Some(value) = node.get(key) {
                scalar_text(value).ok_or(CompileError::NotText(key))?;
            }
        }

        if let Some(priority) = node.get(PRIORITY) {
            let priority = scalar_text(priority).ok_or(CompileError::NotText(PRIORITY))?;
            priority
                .parse::<Priority>()
                .map_err(|_| CompileError::InvalidPriority(priority.clone()))?;
        }

        if let Some(from) = node.get(FROM) {
            let from = scalar_text(from).ok_or(CompileError::NotText(FROM))?;
            let mut segments = from.split('.');
            let first = segments.next().unwrap_or_default();
            if !self.roles.contains(first) && !self.variables.contains(first) {
                return Err(CompileError::FromNotRole(from.clone()));
            }
            if let Some(step) = segments.find(|s| *s != "type" && *s != "class") {
                return Err(CompileError::FromStep {
                    role: first.to_string(),
                    step: step.to_string(),
                });
            }
        }

        let role = role.trim_end_matches('*');
        if self.roles.contains(role) {
            return Err(CompileError::DuplicateRole(role.to_string()));
        }
        Ok(())
    }

    /// Validate the references and relation of a scalar formula
    pub(super) fn validate_formula(&self, formula: &str) -> Result<(), CompileError> {
        let scalar = parse_scalar(formula).map_err(|e| CompileError::formula(formula, e))?;
        let left = split_formula(&scalar.left);
        let right = split_formula(&scalar.right);
        if left.is_empty() || right.is_empty() {
            return Err(CompileError::formula(
                formula,
                crate::formula::FormulaError::EmptySide(formula.to_string()),
            ));
        }

        let left_similar = self.check_side(formula, &left)?;
        let right_similar = self.check_side(formula, &right)?;
        if scalar.relation == Relation::Similar && !left_similar && !right_similar {
            return Err(CompileError::SimilarNotAllowed(formula.to_string()));
        }
        if scalar.relation == Relation::Similar
            && refers_to(&left, &["type", "returnType"]) != refers_to(&right, &["type", "returnType"])
            && (refers_to(&left, &["name"]) || refers_to(&right, &["name"]))
        {
            return Err(CompileError::SimilarMixed(formula.to_string()));
        }

        if let ([left], [right]) = (left.as_slice(), right.as_slice()) {
            check_enumerated(formula, last_segment(left), last_segment(right))?;
        }
        Ok(())
    }

    /// Check every reference of one side; true when one of them can take part in `~=`
    pub(super) fn check_side(&self, formula: &str, tokens: &[String]) -> Result<bool, CompileError> {
        let mut similar = false;
        for token in tokens {
            // operators, numbers and literals
            if !token.starts_with(|c: char| c.is_alphabetic() || c == '_') {
                continue;
            }
            let segments: Vec<&str> = token.split('.').collect();
            if segments.iter().any(|s| s.is_empty()) {
                return Err(CompileError::EmptyReference(formula.to_string()));
            }
            let invalid = |segment: &str| CompileError::InvalidReference {
                formula: formula.to_string(),
                segment: segment.to_string(),
            };

            if let [first, middle @ .., last] = segments.as_slice() {
                if !STEPS.contains(first)
                    && !self.roles.contains(first)
                    && !self.variables.contains(*first)
                {
                    return Err(invalid(*first));
                }
                if let Some(step) = middle.iter().find(|s| !STEPS.contains(*s)) {
                    return Err(invalid(*step));
                }
                if !lim::is_lim_name(last)
                    && !self.metrics.is_empty()
                    && !self.metrics.contains(*last)
                    && !self.variables.contains(*last)
                {
                    return Err(invalid(*last));
                }
            }

            if segments
                .last()
                .is_some_and(|last| SIMILAR_TARGETS.contains(last))
            {
                similar = true;
            }
        }
        Ok(similar)
    }
}

/// One of the references of a side ends in one of `targets`
fn refers_to(tokens: &[String], targets: &[&str]) -> bool {
    tokens
        .iter()
        .filter(|t| t.starts_with(|c: char| c.is_alphabetic() || c == '_'))
        .any(|t| targets.contains(&last_segment(t)))
}

fn last_segment(token: &str) -> &str {
    let last = token.rsplit('.').next().unwrap_or(token);
    last.trim_matches(|c| c == '\'' || c == '"')
}

/// With a single token on each side, an attribute with enumerated values can
/// only be compared to one of its values
fn check_enumerated(formula: &str, left: &str, right: &str) -> Result<(), CompileError> {
    let (attribute, other) = match (LimAttribute::from_name(left), LimAttribute::from_name(right)) {
        (Some(attribute), _) => (attribute, right),
        (None, Some(attribute)) => (attribute, left),
        (None, None) => return Ok(()),
    };
    let values = attribute.values();
    if !values.is_empty() && !values.iter().any(|v| v == other) && left != right {
        return Err(CompileError::NotComparable {
            formula: formula.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        });
    }
    Ok(())
}
