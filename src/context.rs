//! Role and scope registry threaded through every evaluation
//!
//! Each pattern document has its own [`RoleTable`]. The [`EvaluationContext`]
//! owns the tables of all loaded documents, the currently-in stack, the index
//! of the document being evaluated and the recorder receiving traces.

use crate::error::EvalError;
use crate::model::{NodeId, NodeKind};
use crate::recorder::Recorder;
use crate::value::Value;
use std::collections::BTreeMap;

/// Variables of one role, by name
pub type VarScope = BTreeMap<String, Value>;

/// State of a single role
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleBinding {
    /// Node the role is bound to, `None` while unbound
    pub node: Option<NodeId>,
    /// Declared with a trailing `*`: variables are recorded on a match
    pub write_to_graph: bool,
    pub variables: VarScope,
}

/// Role name to binding, for one pattern document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleTable {
    roles: BTreeMap<String, RoleBinding>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unbound role; returns false if the name is taken
    pub fn register(&mut self, name: &str, write_to_graph: bool) -> bool {
        if self.roles.contains_key(name) {
            return false;
        }
        self.roles.insert(
            name.to_string(),
            RoleBinding {
                node: None,
                write_to_graph,
                variables: VarScope::new(),
            },
        );
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&RoleBinding> {
        self.roles.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RoleBinding> {
        self.roles.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Node bound to a role, `None` when unknown or unbound
    pub fn bound(&self, name: &str) -> Option<NodeId> {
        self.roles.get(name).and_then(|b| b.node)
    }

    /// Bind a role and return its previous binding
    fn bind(&mut self, name: &str, node: Option<NodeId>) -> Option<NodeId> {
        match self.roles.get_mut(name) {
            Some(binding) => std::mem::replace(&mut binding.node, node),
            None => {
                self.roles.insert(
                    name.to_string(),
                    RoleBinding {
                        node,
                        ..Default::default()
                    },
                );
                None
            }
        }
    }

    /// Unbind every role and clear all variables
    pub fn reset(&mut self) {
        for binding in self.roles.values_mut() {
            binding.node = None;
            binding.variables.clear();
        }
    }
}

/// Mutable evaluation state, passed by `&mut` through every `test` and `run`
pub struct EvaluationContext<'a> {
    tables: Vec<RoleTable>,
    document: usize,
    currently_in: Vec<(NodeKind, String)>,
    message: Option<String>,
    recorder: &'a mut dyn Recorder,
}

impl<'a> EvaluationContext<'a> {
    /// One role table per loaded document, in document order
    pub fn new(tables: Vec<RoleTable>, recorder: &'a mut dyn Recorder) -> Self {
        Self {
            tables,
            document: 0,
            currently_in: Vec::new(),
            message: None,
            recorder,
        }
    }

    /// Select the document whose role table is used
    pub fn set_document(&mut self, index: usize) {
        if index >= self.tables.len() {
            self.tables.resize_with(index + 1, RoleTable::new);
        }
        self.document = index;
    }

    pub fn document(&self) -> usize {
        self.document
    }

    pub fn table(&self) -> &RoleTable {
        &self.tables[self.document]
    }

    fn table_mut(&mut self) -> &mut RoleTable {
        &mut self.tables[self.document]
    }

    pub fn recorder(&mut self) -> &mut (dyn Recorder + 'a) {
        &mut *self.recorder
    }

    /// The (kind, role) pairs of the active evaluation path
    pub fn currently_in(&self) -> &[(NodeKind, String)] {
        &self.currently_in
    }

    pub fn depth(&self) -> usize {
        self.currently_in.len()
    }

    /// Role on top of the currently-in stack
    pub fn current_role(&self) -> Option<&str> {
        self.currently_in.last().map(|(_, role)| role.as_str())
    }

    pub fn bound(&self, role: &str) -> Option<NodeId> {
        self.table().bound(role)
    }

    pub fn is_role(&self, name: &str) -> bool {
        self.table().contains(name)
    }

    /// Bind `role` to `node` and push it on the currently-in stack for the
    /// duration of `f`. Binding and stack are restored even when `f` fails.
    pub fn with_role<T>(
        &mut self,
        kind: NodeKind,
        role: &str,
        node: NodeId,
        f: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        let previous = self.table_mut().bind(role, Some(node));
        let stack_len = self.currently_in.len();
        self.currently_in.push((kind, role.to_string()));

        let result = f(self);

        self.currently_in.truncate(stack_len);
        self.table_mut().bind(role, previous);
        result
    }

    /// Variable of a role
    pub fn variable(&self, role: &str, name: &str) -> Option<&Value> {
        self.table().get(role)?.variables.get(name)
    }

    /// Variable of the current role
    pub fn scope_variable(&self, name: &str) -> Option<&Value> {
        let role = self.current_role()?;
        self.variable(role, name)
    }

    pub fn has_scope_variable(&self, name: &str) -> bool {
        self.scope_variable(name).is_some()
    }

    pub fn set_variable(&mut self, role: &str, name: &str, value: Value) {
        let table = self.table_mut();
        if !table.contains(role) {
            table.register(role, false);
        }
        if let Some(binding) = table.get_mut(role) {
            binding.variables.insert(name.to_string(), value);
        }
    }

    /// Set a variable of the current role; a no-op outside any role
    pub fn set_scope_variable(&mut self, name: &str, value: Value) {
        if let Some(role) = self.current_role().map(str::to_string) {
            self.set_variable(&role, name, value);
        }
    }

    /// Variables of the current role
    pub fn scope(&self) -> VarScope {
        self.current_role()
            .and_then(|role| self.table().get(role))
            .map(|b| b.variables.clone())
            .unwrap_or_default()
    }

    /// Replace the variables of the current role
    pub fn replace_scope(&mut self, scope: VarScope) {
        if let Some(role) = self.current_role().map(str::to_string) {
            if let Some(binding) = self.table_mut().get_mut(&role) {
                binding.variables = scope;
            }
        }
    }

    /// Copy of the current document's role table
    pub fn snapshot(&self) -> RoleTable {
        self.table().clone()
    }

    pub fn restore(&mut self, snapshot: RoleTable) {
        *self.table_mut() = snapshot;
    }

    /// Run `f` and restore the role table afterwards, whatever the outcome
    pub fn with_snapshot<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        let snapshot = self.snapshot();
        let result = f(self);
        self.restore(snapshot);
        result
    }

    /// Message surfaced by a script match
    pub fn set_message(&mut self, message: String) {
        self.message = Some(message);
    }

    pub fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }

    /// Unbind all roles and clear variables of the current document
    pub fn reset_document(&mut self) {
        self.currently_in.clear();
        self.message = None;
        self.table_mut().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::TraceRecorder;

    fn table() -> RoleTable {
        let mut table = RoleTable::new();
        assert!(table.register("c", false));
        assert!(table.register("m", true));
        table
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut table = table();
        assert!(!table.register("c", false));
        assert_eq!(table.len(), 2);
        assert!(table.get("m").unwrap().write_to_graph);
    }

    #[test]
    fn test_with_role_restores_binding() {
        let mut recorder = TraceRecorder::new();
        let mut ctx = EvaluationContext::new(vec![table()], &mut recorder);

        let inner = ctx
            .with_role(NodeKind::Class, "c", 7, |ctx| {
                assert_eq!(ctx.bound("c"), Some(7));
                assert_eq!(ctx.current_role(), Some("c"));
                ctx.with_role(NodeKind::Method, "c", 8, |ctx| Ok(ctx.bound("c")))
            })
            .unwrap();

        assert_eq!(inner, Some(8));
        assert_eq!(ctx.bound("c"), None);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_with_role_restores_on_error() {
        let mut recorder = TraceRecorder::new();
        let mut ctx = EvaluationContext::new(vec![table()], &mut recorder);

        let result: Result<(), _> = ctx.with_role(NodeKind::Class, "c", 7, |_| {
            Err(EvalError::ClassNotFound(7))
        });

        assert!(result.is_err());
        assert_eq!(ctx.bound("c"), None);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_scope_variables_follow_current_role() {
        let mut recorder = TraceRecorder::new();
        let mut ctx = EvaluationContext::new(vec![table()], &mut recorder);

        ctx.with_role(NodeKind::Method, "m", 3, |ctx| {
            ctx.set_scope_variable("count", Value::Int(2));
            assert_eq!(ctx.scope_variable("count"), Some(&Value::Int(2)));
            Ok(())
        })
        .unwrap();

        assert_eq!(ctx.variable("m", "count"), Some(&Value::Int(2)));
        assert_eq!(ctx.scope_variable("count"), None);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut recorder = TraceRecorder::new();
        let mut ctx = EvaluationContext::new(vec![table()], &mut recorder);
        ctx.set_variable("c", "x", Value::Int(1));

        ctx.with_snapshot(|ctx| {
            ctx.set_variable("c", "x", Value::Int(5));
            Ok(())
        })
        .unwrap();

        assert_eq!(ctx.variable("c", "x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_documents_have_separate_tables() {
        let mut recorder = TraceRecorder::new();
        let mut ctx = EvaluationContext::new(vec![table(), RoleTable::new()], &mut recorder);
        assert!(ctx.is_role("c"));
        ctx.set_document(1);
        assert!(!ctx.is_role("c"));
        ctx.set_document(0);
        ctx.set_variable("c", "x", Value::Int(1));
        ctx.reset_document();
        assert_eq!(ctx.variable("c", "x"), None);
    }
}
