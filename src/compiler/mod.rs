//! Pattern compiler: turns a parsed pattern document into a condition tree
//!
//! Every NodeType is validated before it is compiled. Its role is
//! registered (unbound) before the children are compiled, and its
//! `(kind, role)` pair stays on the compile-time currently-in stack while
//! they are. A document compiles completely or not at all.

mod calculate;
mod validator;

use crate::condition::{Condition, MultiKind, Navigation, NodeTypeCondition};
use crate::context::RoleTable;
use crate::formula::{Formula, FormulaError};
use crate::meta::{PatternMeta, Priority};
use crate::model::{Direction, EdgeKind, NodeKind};
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub(crate) const KIND: &str = "kind";
pub(crate) const ROLE: &str = "role";
pub(crate) const NAME: &str = "name";
pub(crate) const DISPLAY_NAME: &str = "displayName";
pub(crate) const CATEGORY: &str = "category";
pub(crate) const DESCRIPTION: &str = "description";
pub(crate) const PRIORITY: &str = "priority";
pub(crate) const CONDITIONS: &str = "conditions";
pub(crate) const FILTERS: &str = "filters";
pub(crate) const CALCULATE: &str = "calculate";
pub(crate) const FROM: &str = "from";
pub(crate) const EDGE: &str = "edge";
pub(crate) const DIRECTION: &str = "direction";

/// Extensions of pattern documents that can be referenced as predefined patterns
pub const DOCUMENT_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("'{0}' must be defined!")]
    Missing(&'static str),

    #[error("The value of '{0}' must be a text/string!")]
    NotText(&'static str),

    #[error("A defined '{0}' must not be empty!")]
    Empty(&'static str),

    #[error("Kind '{0}' does not exist in the language-independent model")]
    UnknownKind(String),

    #[error("Node type must contain either 'edge' or 'name'")]
    NameOrEdge,

    #[error("Priority value '{0}' is invalid!")]
    InvalidPriority(String),

    #[error("The value of 'from' must be a 'role' name, found '{0}'")]
    FromNotRole(String),

    #[error("The value after '{role}' must be 'type' or 'class', found '{step}'")]
    FromStep { role: String, step: String },

    #[error("Role '{0}' must be unique!")]
    DuplicateRole(String),

    #[error("Edge '{0}' does not exist")]
    UnknownEdge(String),

    #[error("The value of 'direction' must be 'forward' or 'reverse', found '{0}'")]
    InvalidDirection(String),

    #[error("The value of 'from' must be an existing 'role' name, found '{0}'")]
    FromUnknownRole(String),

    #[error("Edge '{edge}' is invalid on '{kind}'")]
    EdgeNotValid { edge: String, kind: NodeKind },

    #[error("'{0}' must be nested inside a node type")]
    NotNested(String),

    #[error("Formula '{formula}' is invalid: {source}")]
    Formula {
        formula: String,
        source: FormulaError,
    },

    #[error("In '{0}' a reference must point to something!")]
    EmptyReference(String),

    #[error("In '{formula}', '{segment}' is invalid!")]
    InvalidReference { formula: String, segment: String },

    #[error("In '{0}' the '~=' relation is invalid! Only 'type', 'returnType' and 'name' can be compared with '~='")]
    SimilarNotAllowed(String),

    #[error("In '{0}' a type can only be compared with '~=' to another type")]
    SimilarMixed(String),

    #[error("In '{formula}' '{left}' cannot be compared to '{right}'")]
    NotComparable {
        formula: String,
        left: String,
        right: String,
    },

    #[error("'{0}' expects a list of conditions")]
    ExpectedSequence(String),

    #[error("'{0}' expects a map")]
    ExpectedMap(String),

    #[error("A condition must be a formula, a map or a list, found {0}")]
    UnexpectedValue(String),

    #[error("A condition map must have exactly one key, found {0}")]
    KeyCount(usize),

    #[error("The document root must be a node type with a 'kind'")]
    RootNotNodeType,

    #[error("Predefined pattern '{0}' is used but no patterns folder is configured")]
    NoPatternsFolder(String),

    #[error("In '{key} : {file}', {path} file doesn't exist!")]
    PredefinedMissing {
        key: String,
        file: String,
        path: PathBuf,
    },

    #[error("'{0}' Predefined pattern can't be a script!")]
    PredefinedScript(PathBuf),

    #[error("'{0}' Pattern file was empty!")]
    PredefinedEmpty(PathBuf),

    #[error("Failed to read predefined pattern {path}: {source}")]
    PredefinedRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse predefined pattern {path}: {source}")]
    PredefinedParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("'name' must be defined, and its value must be equal to the condition name '{0}'")]
    PredefinedName(String),

    #[error("Predefined pattern kind '{found}' must be equal to the kind '{expected}' where it's called from!")]
    PredefinedKind { expected: NodeKind, found: NodeKind },

    #[error("Invalid calculate block: {0}")]
    Calculate(String),
}

impl CompileError {
    fn formula(formula: &str, source: FormulaError) -> Self {
        CompileError::Formula {
            formula: formula.to_string(),
            source,
        }
    }
}

/// Text of a scalar node (strings, numbers and booleans)
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a map",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Split a (possibly multi-document) pattern file.
///
/// YAML files may hold several `---` separated documents; JSON files hold one.
/// Null documents (empty files, trailing separators) are dropped.
pub fn parse_documents(content: &str, extension: &str) -> Result<Vec<Value>, serde_yaml::Error> {
    use serde::Deserialize;

    let documents = if extension == "json" {
        vec![serde_yaml::from_str::<Value>(content)?]
    } else {
        let mut documents = Vec::new();
        for document in serde_yaml::Deserializer::from_str(content) {
            documents.push(Value::deserialize(document)?);
        }
        documents
    };
    Ok(documents.into_iter().filter(|d| !d.is_null()).collect())
}

/// Compiles the documents of one pattern source.
///
/// Each compiler owns the role table it fills, so independent documents
/// can be compiled in parallel.
#[derive(Debug, Default)]
pub struct Compiler {
    patterns_folder: Option<PathBuf>,
    metrics: BTreeSet<String>,
    roles: RoleTable,
    currently_in: Vec<(NodeKind, String)>,
    /// Names introduced by Calculate blocks (defines, loop variables, locals, assignments)
    variables: BTreeSet<String>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folder predefined pattern references are resolved against
    pub fn with_patterns_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.patterns_folder = Some(folder.into());
        self
    }

    /// Known metric names; when non-empty, dotted references must end in one
    pub fn with_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn into_roles(self) -> RoleTable {
        self.roles
    }

    /// Compile a document root, which must be a NodeType
    pub fn compile(&mut self, document: &Value) -> Result<NodeTypeCondition, CompileError> {
        if document.get(KIND).is_none() {
            return Err(CompileError::RootNotNodeType);
        }
        let root = self.compile_node_type(document)?;
        log::debug!(
            "Compiled pattern '{}' with {} role(s)",
            root.meta.name,
            self.roles.len()
        );
        Ok(root)
    }

    /// Run `f` with `(kind, role)` on top of the currently-in stack
    fn within<T>(
        &mut self,
        kind: NodeKind,
        role: &str,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        let depth = self.currently_in.len();
        self.currently_in.push((kind, role.to_string()));
        let result = f(self);
        self.currently_in.truncate(depth);
        result
    }

    fn text(node: &Value, key: &'static str) -> Option<String> {
        node.get(key).and_then(scalar_text)
    }

    pub(crate) fn compile_node_type(&mut self, node: &Value) -> Result<NodeTypeCondition, CompileError> {
        self.validate_node(node)?;

        // validate_node guarantees kind and role
        let kind_text = Self::text(node, KIND).unwrap_or_default();
        let kind: NodeKind = kind_text
            .parse()
            .map_err(|_| CompileError::UnknownKind(kind_text.clone()))?;
        let raw_role = Self::text(node, ROLE).unwrap_or_default();
        let write_to_graph = raw_role.ends_with('*');
        let role = raw_role.trim_end_matches('*').to_string();

        let name = Self::text(node, NAME).unwrap_or_default();
        let mut meta = PatternMeta::new(&name, &role)
            .with_display_name(&Self::text(node, DISPLAY_NAME).unwrap_or_else(|| name.clone()));
        if let Some(category) = Self::text(node, CATEGORY) {
            meta = meta.with_category(&category);
        }
        if let Some(description) = Self::text(node, DESCRIPTION) {
            meta = meta.with_description(&description);
        }
        if let Some(priority) = Self::text(node, PRIORITY) {
            let priority: Priority = priority
                .parse()
                .map_err(|_| CompileError::InvalidPriority(priority.clone()))?;
            meta = meta.with_priority(priority);
        }

        self.roles.register(&role, write_to_graph);
        log::trace!("Registered role '{}' ({})", role, kind);

        self.within(kind, &role, |compiler| {
            let mut condition = NodeTypeCondition::new(kind, meta);
            condition.write_to_graph = write_to_graph;

            if let Some(calculate) = node.get(CALCULATE) {
                condition = condition.with_calculate(compiler.compile_calculate(calculate)?);
            }
            if let Some(conditions) = node.get(CONDITIONS) {
                condition = condition.with_inner(compiler.compile_value(conditions)?);
            }
            if let Some(filters) = node.get(FILTERS) {
                condition = condition.with_filter(compiler.compile_value(filters)?);
            }
            Ok(condition)
        })
    }

    /// A formula, a map, or a list (implicit And)
    pub(crate) fn compile_value(&mut self, value: &Value) -> Result<Condition, CompileError> {
        match value {
            Value::Mapping(_) => self.compile_map(value),
            Value::Sequence(items) => Ok(Condition::Multi(MultiKind::And, self.compile_list(items)?)),
            Value::Tagged(tagged) => self.compile_value(&tagged.value),
            other => match scalar_text(other) {
                Some(formula) => self.compile_formula(&formula),
                None => Err(CompileError::UnexpectedValue(describe(other).to_string())),
            },
        }
    }

    fn compile_list(&mut self, items: &[Value]) -> Result<Vec<Condition>, CompileError> {
        items.iter().map(|item| self.compile_value(item)).collect()
    }

    fn compile_formula(&mut self, text: &str) -> Result<Condition, CompileError> {
        self.validate_formula(text)?;
        let formula = Formula::parse(text).map_err(|e| CompileError::formula(text, e))?;
        log::trace!("{} => {} {} {}", text, formula.left, formula.relation, formula.right);
        Ok(Condition::Formula(formula))
    }

    fn compile_map(&mut self, node: &Value) -> Result<Condition, CompileError> {
        if node.get(KIND).is_some() {
            return Ok(Condition::NodeType(self.compile_node_type(node)?));
        }

        let Some(map) = node.as_mapping() else {
            return Err(CompileError::UnexpectedValue(describe(node).to_string()));
        };
        if map.len() != 1 {
            return Err(CompileError::KeyCount(map.len()));
        }
        let Some((key, value)) = map.iter().next() else {
            return Err(CompileError::KeyCount(0));
        };
        let key = scalar_text(key).unwrap_or_default();

        let multi = |kind: MultiKind, compiler: &mut Self| match value {
            Value::Sequence(items) => Ok(Condition::Multi(kind, compiler.compile_list(items)?)),
            _ => Err(CompileError::ExpectedSequence(key.clone())),
        };

        match key.as_str() {
            "and" => multi(MultiKind::And, self),
            "or" => multi(MultiKind::Or, self),
            "nand" => multi(MultiKind::Nand, self),
            "nor" => multi(MultiKind::Nor, self),
            "xor" => multi(MultiKind::Xor, self),
            "not" => Ok(Condition::Not(Box::new(self.compile_value(value)?))),
            "all" | "any" => {
                if !value.is_mapping() {
                    return Err(CompileError::ExpectedMap(key.clone()));
                }
                let navigation = self.validate_edge_form(value)?;
                let target = Box::new(self.compile_node_type(value)?);
                Ok(if key == "all" {
                    Condition::All(navigation, target)
                } else {
                    Condition::Any(navigation, target)
                })
            }
            "exists" => {
                if !value.is_mapping() {
                    return Err(CompileError::ExpectedMap(key.clone()));
                }
                let navigation = self.validate_edge_form(value)?;
                let kind = if value.get(ROLE).is_some() {
                    self.compile_node_type(value)?.kind
                } else {
                    let text = Self::text(value, KIND).ok_or(CompileError::Missing(KIND))?;
                    text.parse().map_err(|_| CompileError::UnknownKind(text.clone()))?
                };
                Ok(Condition::Exists(navigation, kind))
            }
            _ => {
                let file = scalar_text(value).ok_or(CompileError::NotText("predefined pattern"))?;
                Ok(Condition::NodeType(self.compile_predefined(&key, &file)?))
            }
        }
    }

    /// Validated edge, direction and origin of an all/any/exists/for block
    pub(crate) fn validate_edge_form(&self, node: &Value) -> Result<Navigation, CompileError> {
        let direction = match node.get(DIRECTION) {
            None => Default::default(),
            Some(value) => {
                let text = scalar_text(value).unwrap_or_default();
                text.parse()
                    .map_err(|_| CompileError::InvalidDirection(text.clone()))?
            }
        };

        let edge_text = match node.get(EDGE) {
            None => return Err(CompileError::Missing(EDGE)),
            Some(value) => scalar_text(value).ok_or(CompileError::NotText(EDGE))?,
        };
        let edge: EdgeKind = edge_text
            .parse()
            .map_err(|_| CompileError::UnknownEdge(edge_text.clone()))?;

        let from = match node.get(FROM) {
            Some(value) => Some(scalar_text(value).ok_or(CompileError::NotText(FROM))?),
            None => None,
        };
        let origin = match &from {
            Some(from) => self.origin_kind(from)?,
            None => match self.currently_in.last() {
                Some((kind, _)) => Some(*kind),
                None => return Err(CompileError::NotNested(edge.name())),
            },
        };

        if let Some(origin) = origin {
            if direction == Direction::Forward && !edge.is_valid_on(origin) {
                return Err(CompileError::EdgeNotValid {
                    edge: edge.name(),
                    kind: origin,
                });
            }
        }

        let navigation = Navigation::new(edge, direction);
        Ok(match from {
            Some(from) => navigation.with_from(&from),
            None => navigation,
        })
    }

    /// Node kind a `from` path points at; `None` for a Calculate variable,
    /// whose node can be of any kind
    fn origin_kind(&self, from: &str) -> Result<Option<NodeKind>, CompileError> {
        let last = from.rsplit('.').next().unwrap_or(from);
        match last {
            "type" => Ok(Some(NodeKind::Type)),
            "class" => Ok(Some(NodeKind::Class)),
            "parent" => Ok(Some(NodeKind::Base)),
            role => {
                if let Some((kind, _)) = self.currently_in.iter().find(|(_, r)| r == role) {
                    Ok(Some(*kind))
                } else if self.variables.contains(role) {
                    Ok(None)
                } else {
                    Err(CompileError::FromUnknownRole(from.to_string()))
                }
            }
        }
    }

    fn compile_predefined(&mut self, key: &str, file: &str) -> Result<NodeTypeCondition, CompileError> {
        let folder = self
            .patterns_folder
            .clone()
            .ok_or_else(|| CompileError::NoPatternsFolder(key.to_string()))?;
        let expected = self
            .currently_in
            .last()
            .map(|(kind, _)| *kind)
            .ok_or_else(|| CompileError::NotNested(key.to_string()))?;

        let path = folder.join(file);
        if !path.is_file() {
            return Err(CompileError::PredefinedMissing {
                key: key.to_string(),
                file: file.to_string(),
                path,
            });
        }
        let document = read_first_document(&path)?;

        if Self::text(&document, NAME).as_deref() != Some(key) {
            return Err(CompileError::PredefinedName(key.to_string()));
        }
        log::debug!("Using predefined pattern '{}' from {}", key, path.display());

        let predefined = self.compile_node_type(&document)?;
        if predefined.kind != expected {
            return Err(CompileError::PredefinedKind {
                expected,
                found: predefined.kind,
            });
        }
        Ok(predefined)
    }
}

fn read_first_document(path: &Path) -> Result<Value, CompileError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !DOCUMENT_EXTENSIONS.contains(&extension) {
        return Err(CompileError::PredefinedScript(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| CompileError::PredefinedRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_documents(&content, extension)
        .map_err(|source| CompileError::PredefinedParse {
            path: path.to_path_buf(),
            source,
        })?
        .into_iter()
        .next()
        .ok_or_else(|| CompileError::PredefinedEmpty(path.to_path_buf()))
}

/// Compile one document into its root condition and role table
pub fn compile_document(
    document: &Value,
    patterns_folder: Option<&Path>,
    metrics: &BTreeSet<String>,
) -> Result<(NodeTypeCondition, RoleTable), CompileError> {
    let mut compiler = Compiler::new().with_metrics(metrics.iter().cloned());
    if let Some(folder) = patterns_folder {
        compiler = compiler.with_patterns_folder(folder);
    }
    let root = compiler.compile(document)?;
    Ok((root, compiler.into_roles()))
}
