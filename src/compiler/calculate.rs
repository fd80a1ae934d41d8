//! Compilation of Calculate blocks
//!
//! ```yaml
//! calculate:
//!   define: {count: int}
//!   codeBlock:
//!     - for:
//!         variable: m
//!         edge: Scope_HasMember
//!         local: [loc]
//!         codeBlock:
//!           - "loc = m.LOC"
//!           - if:
//!               condition: "loc > 100"
//!               codeBlock: ["count = count + 1"]
//! ```

use super::{scalar_text, CompileError, Compiler};
use crate::calculate::{Assignment, Code, ForLoop, IfChain, Statement};
use crate::formula::split_formula;
use crate::value::ValueKind;
use serde_yaml::Value;

const DEFINE: &str = "define";
const CODE_BLOCK: &str = "codeBlock";
const VARIABLE: &str = "variable";
const LOCAL: &str = "local";
const CONDITION: &str = "condition";
const ELSE_IF: &str = "elseIf";
const ELSE: &str = "else";

impl Compiler {
    pub(super) fn compile_calculate(&mut self, value: &Value) -> Result<Code, CompileError> {
        if !value.is_mapping() {
            return Err(CompileError::Calculate("'calculate' must be a map".into()));
        }

        let mut code = Code::new();
        if let Some(define) = value.get(DEFINE) {
            let define = define.as_mapping().ok_or_else(|| {
                CompileError::Calculate("'define' must map variable names to types".into())
            })?;
            for (name, kind) in define {
                let name = scalar_text(name)
                    .ok_or_else(|| CompileError::Calculate("variable names must be text".into()))?;
                let kind = scalar_text(kind).unwrap_or_default();
                let kind: ValueKind = kind.parse().map_err(CompileError::Calculate)?;
                self.variables.insert(name.clone());
                code.define.push((name, kind));
            }
        }

        if let Some(block) = value.get(CODE_BLOCK) {
            code.block = self.compile_block(block)?;
        }
        Ok(code)
    }

    fn compile_block(&mut self, value: &Value) -> Result<Vec<Statement>, CompileError> {
        let items = value
            .as_sequence()
            .ok_or_else(|| CompileError::Calculate(format!("'{}' must be a list", CODE_BLOCK)))?;
        items.iter().map(|item| self.compile_statement(item)).collect()
    }

    fn compile_statement(&mut self, value: &Value) -> Result<Statement, CompileError> {
        if let Some(text) = value.as_str() {
            return self.compile_assignment(text).map(Statement::Assign);
        }
        if let Some(body) = value.get("for") {
            return self.compile_for(body).map(Statement::For);
        }
        if let Some(body) = value.get("if") {
            return self.compile_if(body).map(Statement::If);
        }
        Err(CompileError::Calculate(
            "a statement must be an assignment, 'for' or 'if'".into(),
        ))
    }

    fn compile_assignment(&mut self, text: &str) -> Result<Assignment, CompileError> {
        let assignment = Assignment::parse(text).map_err(|e| CompileError::formula(text, e))?;

        match &assignment.role {
            Some(role) if !self.roles.contains(role) => {
                return Err(CompileError::InvalidReference {
                    formula: text.to_string(),
                    segment: role.clone(),
                });
            }
            Some(_) => {}
            None => {
                self.variables.insert(assignment.name.clone());
            }
        }
        self.check_side(text, &split_formula(assignment.expression.source()))?;
        Ok(assignment)
    }

    fn compile_for(&mut self, body: &Value) -> Result<ForLoop, CompileError> {
        let variable = body
            .get(VARIABLE)
            .and_then(scalar_text)
            .ok_or_else(|| CompileError::Calculate("'for' needs a 'variable'".into()))?;
        let navigation = self.validate_edge_form(body)?;

        let locals = match body.get(LOCAL) {
            None => Vec::new(),
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(other) => scalar_text(other).into_iter().collect(),
        };
        self.variables.insert(variable.clone());
        self.variables.extend(locals.iter().cloned());

        let block = match body.get(CODE_BLOCK) {
            Some(block) => self.compile_block(block)?,
            None => Vec::new(),
        };
        Ok(ForLoop {
            variable,
            navigation,
            locals,
            block,
        })
    }

    fn compile_branch(
        &mut self,
        body: &Value,
    ) -> Result<(crate::condition::Condition, Vec<Statement>), CompileError> {
        let condition = body
            .get(CONDITION)
            .ok_or_else(|| CompileError::Calculate("'if' needs a 'condition'".into()))?;
        let condition = self.compile_value(condition)?;
        let block = match body.get(CODE_BLOCK) {
            Some(block) => self.compile_block(block)?,
            None => Vec::new(),
        };
        Ok((condition, block))
    }

    fn compile_if(&mut self, body: &Value) -> Result<IfChain, CompileError> {
        let mut chain = IfChain::default();
        chain.branches.push(self.compile_branch(body)?);

        if let Some(else_ifs) = body.get(ELSE_IF) {
            let else_ifs = else_ifs
                .as_sequence()
                .ok_or_else(|| CompileError::Calculate(format!("'{}' must be a list", ELSE_IF)))?;
            for branch in else_ifs {
                chain.branches.push(self.compile_branch(branch)?);
            }
        }
        if let Some(otherwise) = body.get(ELSE) {
            chain.otherwise = self.compile_block(otherwise)?;
        }
        Ok(chain)
    }
}
