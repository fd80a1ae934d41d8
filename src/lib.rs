//! LIM Patterns - pattern and anti-pattern detection over code graphs
//!
//! Patterns are written as YAML/JSON documents describing a tree of
//! conditions over a language-independent model (LIM) of a program: node
//! kinds, edges between nodes, attributes and derived metrics. Each document
//! is compiled into a condition tree and evaluated against every node of a
//! code graph in preorder.
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> PatternLoader -> Compiler -> PatternDocument
//!                                              |
//!              CodeGraph -> Engine -> Condition tree -> Recorder -> OutputFormatter
//! ```
//!
//! # Writing Patterns
//!
//! ```yaml
//! name: UtilityClass
//! kind: class
//! role: c
//! priority: Major
//! conditions:
//!   all:
//!     edge: Scope_HasMember
//!     kind: method
//!     role: m
//!     filters: "isStatic == true"
//! ```
//!
//! Conditions combine with `and`, `or`, `nand`, `nor`, `xor`, `not`, `all`,
//! `any` and `exists`; leaves are formulas such as `c.LOC > 2 * NOA` or
//! nested node types. A `calculate` block computes variables with `for`
//! loops, `if` chains and assignments before the conditions run.

pub mod calculate;
pub mod compiler;
pub mod condition;
pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod formula;
pub mod lim;
pub mod loader;
pub mod meta;
pub mod model;
pub mod output;
pub mod recorder;
pub mod script;
pub mod value;

// Re-export main types
pub use calculate::Code;
pub use compiler::{compile_document, CompileError, Compiler};
pub use condition::{Condition, MultiKind, Navigation, NodeTypeCondition};
pub use config::{CliOptions, Config, ConfigError, NameFilter, OutputFormat};
pub use context::{EvaluationContext, RoleTable};
pub use document::PatternDocument;
pub use engine::{Engine, RunStats};
pub use error::EvalError;
pub use formula::{Formula, FormulaError, FormulaExpression};
pub use loader::{LoadError, LoadReport, PatternLoader};
pub use meta::{PatternMeta, Priority};
pub use model::{CodeGraph, Direction, EdgeKind, GraphError, MemoryGraph, NodeId, NodeKind};
pub use output::{JsonFormatter, OutputFormatter, TextFormatter};
pub use recorder::{PatternMatch, Recorder, TraceRecorder};
pub use script::{NodeBinding, ScriptCondition, ScriptError, ScriptHost};
pub use value::{Value, ValueKind};
