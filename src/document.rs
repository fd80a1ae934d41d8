//! A loaded pattern: its root condition, role table and metadata

use crate::condition::{Condition, NodeTypeCondition};
use crate::context::RoleTable;
use crate::meta::PatternMeta;
use crate::script::ScriptCondition;
use std::path::{Path, PathBuf};

/// One compiled pattern document
#[derive(Debug)]
pub struct PatternDocument {
    /// A NodeType for documents, a Script for script files
    pub root: Condition,
    pub roles: RoleTable,
    pub meta: PatternMeta,
    /// File the document came from
    pub source: PathBuf,
    /// Position of the document within a multi-document file
    pub index: usize,
}

impl PatternDocument {
    pub fn from_node_type(root: NodeTypeCondition, roles: RoleTable, source: &Path, index: usize) -> Self {
        Self {
            meta: root.meta.clone(),
            root: Condition::NodeType(root),
            roles,
            source: source.to_path_buf(),
            index,
        }
    }

    /// Scripts without a declared name are named after their file
    pub fn from_script(script: Box<dyn ScriptCondition>, source: &Path) -> Self {
        let name = script
            .name()
            .map(str::to_string)
            .or_else(|| source.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default();
        Self {
            meta: PatternMeta::new(&name, ""),
            root: Condition::Script(script),
            roles: RoleTable::new(),
            source: source.to_path_buf(),
            index: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn is_script(&self) -> bool {
        matches!(self.root, Condition::Script(_))
    }
}
