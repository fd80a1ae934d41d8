//! Formula compiler: tokenizer, shunting-yard conversion and RPN evaluation

mod postfix;
mod relation;
mod tokenizer;

pub use postfix::{formula_to_postfix, FormulaExpression, FormulaPart, Operator, Variable};
pub use relation::{parse_scalar, Formula, Relation, ScalarFormula};
pub use tokenizer::{split_formula, TokenClass};

use thiserror::Error;

/// Error while compiling or evaluating a formula
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("Empty expression")]
    Empty,

    #[error("'{0}' must contain only one left and right side, e.g. LOC == 2")]
    SideCount(String),

    #[error("'{0}' has an empty side")]
    EmptySide(String),

    #[error("Unknown relation '{0}'")]
    UnknownRelation(String),

    #[error("Unbalanced parentheses in '{0}'")]
    UnbalancedParens(String),

    #[error("Sign without operand at the end of '{0}'")]
    TrailingSign(String),

    #[error("Operator is missing an operand in '{0}'")]
    MissingOperand(String),

    #[error("Unexpected token '{token}' in '{formula}'")]
    UnexpectedToken { token: String, formula: String },

    #[error("Only integer literals are supported, found '{0}'")]
    NonIntegerLiteral(String),

    #[error("Unterminated string literal in '{0}'")]
    UnterminatedLiteral(String),

    #[error("'{0}' is not an assignment, e.g. count = count + 1")]
    NotAssignment(String),
}
