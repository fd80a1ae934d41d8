//! Value cells - the evaluation currency shared by formulas and Calculate blocks

use crate::model::NodeId;
use std::fmt;

/// A dynamically typed value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
    /// Reference to a node of the code graph
    NodeRef(NodeId),
    #[default]
    Empty,
}

/// Declared kind of a value (used by `define` blocks)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    String,
    NodeRef,
    Empty,
}

impl std::str::FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int" | "integer" => Ok(ValueKind::Int),
            "float" | "double" | "decimal" => Ok(ValueKind::Float),
            "string" | "text" => Ok(ValueKind::String),
            "node" | "noderef" => Ok(ValueKind::NodeRef),
            "empty" | "any" => Ok(ValueKind::Empty),
            _ => Err(format!("Unknown value type: {}", s)),
        }
    }
}

/// Coarse grouping used when values are combined in one expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFamily {
    Numeric,
    Text,
    Node,
    Empty,
}

impl Value {
    /// Kind of the stored value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::NodeRef(_) => ValueKind::NodeRef,
            Value::Empty => ValueKind::Empty,
        }
    }

    /// Family the value belongs to
    pub fn family(&self) -> ValueFamily {
        match self {
            Value::Int(_) | Value::Float(_) => ValueFamily::Numeric,
            Value::String(_) => ValueFamily::Text,
            Value::NodeRef(_) => ValueFamily::Node,
            Value::Empty => ValueFamily::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Numeric view of the value; node references evaluate to their id
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::NodeRef(id) => Some(*id as f64),
            Value::String(_) | Value::Empty => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::NodeRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Build a value from a computed number, preferring `Int` when there is no fraction
    pub fn from_number(number: f64) -> Self {
        if number.is_finite() && number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
            Value::Int(number as i64)
        } else {
            Value::Float(number)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::NodeRef(id) => write!(f, "node {}", id),
            Value::Empty => Ok(()),
        }
    }
}

/// Convert a raw attribute string into a typed value.
///
/// A leading digit (optionally after `-`) makes a number; it is a float when
/// the text contains `.` or `,`. Anything that fails to parse stays a string.
pub fn cast_string_to_value(raw: &str) -> Value {
    let mut chars = raw.chars();
    let is_number = match chars.next() {
        None => return Value::Empty,
        Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(c) => c.is_ascii_digit(),
    };

    if !is_number {
        return Value::String(raw.to_string());
    }

    if raw.contains('.') || raw.contains(',') {
        match raw.replace(',', ".").parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::String(raw.to_string()),
        }
    } else {
        match raw.parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => Value::String(raw.to_string()),
        }
    }
}

/// Initial value for a declared variable kind
pub fn default_value_for(kind: ValueKind) -> Value {
    match kind {
        ValueKind::Int => Value::Int(0),
        ValueKind::Float => Value::Float(0.0),
        ValueKind::String => Value::String(String::new()),
        ValueKind::NodeRef | ValueKind::Empty => Value::Empty,
    }
}

/// Stable numeric surrogate for a string (32-bit FNV-1a)
pub fn string_surrogate(text: &str) -> f64 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in text.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash as f64
}
