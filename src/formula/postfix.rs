//! Shunting-yard conversion and RPN evaluation

use super::tokenizer::{split_formula, TokenClass};
use super::FormulaError;
use std::fmt;

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Operator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "+" => Some(Operator::Add),
            "-" => Some(Operator::Sub),
            "*" => Some(Operator::Mul),
            "/" => Some(Operator::Div),
            "^" => Some(Operator::Pow),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
            Operator::Pow => '^',
        }
    }

    /// `^` shares the tier of `*` and `/`
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 1,
            Operator::Mul | Operator::Div | Operator::Pow => 2,
        }
    }

    pub fn apply(&self, left: f64, right: f64) -> f64 {
        match self {
            Operator::Add => left + right,
            Operator::Sub => left - right,
            Operator::Mul => left * right,
            Operator::Div => left / right,
            Operator::Pow => left.powf(right),
        }
    }
}

/// Dotted reference such as `c.type.name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Leading segments: roles or `type`/`class`/`parent` steps
    pub parents: Vec<String>,
    pub name: String,
    pub negative: bool,
}

impl Variable {
    pub fn parse(token: &str, negative: bool) -> Self {
        let mut segments: Vec<String> = token.split('.').map(str::to_string).collect();
        let name = segments.pop().unwrap_or_default();
        Self {
            parents: segments,
            name,
            negative,
        }
    }

    /// The path as written, without sign
    pub fn path(&self) -> String {
        let mut path = self.parents.join(".");
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(&self.name);
        path
    }

    pub fn is_simple(&self) -> bool {
        self.parents.is_empty()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str(&self.path())
    }
}

/// One element of a postfix expression
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaPart {
    Operator(Operator),
    Number { value: i64, negative: bool },
    Variable(Variable),
    Literal(String),
}

impl FormulaPart {
    pub fn is_operand(&self) -> bool {
        !matches!(self, FormulaPart::Operator(_))
    }
}

impl fmt::Display for FormulaPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaPart::Operator(op) => write!(f, "{}", op.symbol()),
            FormulaPart::Number { value, negative } => {
                write!(f, "{}{}", if *negative { "-" } else { "" }, value)
            }
            FormulaPart::Variable(v) => write!(f, "{}", v),
            FormulaPart::Literal(s) => write!(f, "'{}'", s),
        }
    }
}

enum Stacked {
    /// Open parenthesis; `negate` when a unary minus preceded it
    Open { negate: bool },
    Op(Operator),
}

fn operand(token: &str, negative: bool, formula: &str) -> Result<FormulaPart, FormulaError> {
    let first = token.chars().next().unwrap_or(' ');

    if first == '\'' || first == '"' {
        if token.len() < 2 || !token.ends_with(first) {
            return Err(FormulaError::UnterminatedLiteral(formula.to_string()));
        }
        if negative {
            return Err(FormulaError::UnexpectedToken {
                token: format!("-{}", token),
                formula: formula.to_string(),
            });
        }
        return Ok(FormulaPart::Literal(token[1..token.len() - 1].to_string()));
    }

    if first.is_ascii_digit() {
        if !token.chars().all(|c| c.is_ascii_digit()) {
            return Err(FormulaError::NonIntegerLiteral(token.to_string()));
        }
        let value = token
            .parse::<i64>()
            .map_err(|_| FormulaError::NonIntegerLiteral(token.to_string()))?;
        return Ok(FormulaPart::Number { value, negative });
    }

    Ok(FormulaPart::Variable(Variable::parse(token, negative)))
}

/// Convert tokens to postfix order.
///
/// A synthetic `)` closes the input against the `(` the operator stack starts
/// with. Binary `+`/`-` pop every operator down to the nearest `(`; `*`, `/`
/// and `^` pop only operators of their own tier, so all operators are
/// left-associative. A unary minus negates the next operand, or the whole
/// group when it precedes a `(`.
pub fn formula_to_postfix(tokens: &[String], formula: &str) -> Result<Vec<FormulaPart>, FormulaError> {
    let mut output = Vec::new();
    let mut stack = vec![Stacked::Open { negate: false }];
    let mut previous = TokenClass::Start;
    let mut negative = false;
    // operands available on the evaluation stack
    let mut depth: usize = 0;

    let closing = ")".to_string();
    for token in tokens.iter().chain(std::iter::once(&closing)) {
        match token.as_str() {
            "(" => {
                if !previous.expects_operand() {
                    return Err(FormulaError::UnexpectedToken {
                        token: token.clone(),
                        formula: formula.to_string(),
                    });
                }
                stack.push(Stacked::Open { negate: negative });
                negative = false;
                previous = TokenClass::OpenParen;
            }
            ")" => {
                if negative {
                    return Err(FormulaError::TrailingSign(formula.to_string()));
                }
                if previous == TokenClass::Start {
                    return Err(FormulaError::Empty);
                }
                if previous.expects_operand() {
                    return Err(FormulaError::MissingOperand(formula.to_string()));
                }
                loop {
                    match stack.pop() {
                        Some(Stacked::Op(op)) => {
                            output.push(FormulaPart::Operator(op));
                            depth -= 1;
                        }
                        Some(Stacked::Open { negate }) => {
                            if negate {
                                output.push(FormulaPart::Number {
                                    value: 1,
                                    negative: true,
                                });
                                output.push(FormulaPart::Operator(Operator::Mul));
                            }
                            break;
                        }
                        None => return Err(FormulaError::UnbalancedParens(formula.to_string())),
                    }
                }
                previous = TokenClass::CloseParen;
            }
            other => match Operator::from_token(other) {
                Some(op) if previous.expects_operand() => {
                    match op {
                        Operator::Sub => negative = !negative,
                        Operator::Add => {}
                        _ => return Err(FormulaError::MissingOperand(formula.to_string())),
                    }
                }
                Some(op) => {
                    while let Some(Stacked::Op(top)) = stack.last() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        output.push(FormulaPart::Operator(*top));
                        depth -= 1;
                        stack.pop();
                    }
                    stack.push(Stacked::Op(op));
                    previous = TokenClass::Operator;
                }
                None => {
                    if !previous.expects_operand() {
                        return Err(FormulaError::UnexpectedToken {
                            token: other.to_string(),
                            formula: formula.to_string(),
                        });
                    }
                    output.push(operand(other, negative, formula)?);
                    negative = false;
                    depth += 1;
                    previous = TokenClass::Operand;
                }
            },
        }
    }

    if !stack.is_empty() {
        return Err(FormulaError::UnbalancedParens(formula.to_string()));
    }
    debug_assert_eq!(depth, 1);
    Ok(output)
}

/// Compiled arithmetic expression in postfix order
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaExpression {
    source: String,
    parts: Vec<FormulaPart>,
}

impl FormulaExpression {
    /// Tokenize and compile an infix expression
    pub fn parse(infix: &str) -> Result<Self, FormulaError> {
        let tokens = split_formula(infix);
        let parts = formula_to_postfix(&tokens, infix)?;
        Ok(Self {
            source: infix.to_string(),
            parts,
        })
    }

    /// The infix text the expression was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[FormulaPart] {
        &self.parts
    }

    /// The operand when the expression is a single token
    pub fn single_operand(&self) -> Option<&FormulaPart> {
        match self.parts.as_slice() {
            [part] => Some(part),
            _ => None,
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.parts.iter().filter_map(|p| match p {
            FormulaPart::Variable(v) => Some(v),
            _ => None,
        })
    }

    pub fn operators(&self) -> impl Iterator<Item = Operator> + '_ {
        self.parts.iter().filter_map(|p| match p {
            FormulaPart::Operator(op) => Some(*op),
            _ => None,
        })
    }

    /// Evaluate the expression.
    ///
    /// Numbers are handled here; `resolve` supplies the unsigned numeric value
    /// of every variable and literal. The right operand is popped first.
    pub fn calculate<E, F>(&self, mut resolve: F) -> Result<f64, E>
    where
        E: From<FormulaError>,
        F: FnMut(&FormulaPart) -> Result<f64, E>,
    {
        let mut stack: Vec<f64> = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            match part {
                FormulaPart::Operator(op) => {
                    let right = stack.pop();
                    let left = stack.pop();
                    match (left, right) {
                        (Some(left), Some(right)) => stack.push(op.apply(left, right)),
                        _ => return Err(FormulaError::MissingOperand(self.source.clone()).into()),
                    }
                }
                FormulaPart::Number { value, negative } => {
                    let value = *value as f64;
                    stack.push(if *negative { -value } else { value });
                }
                FormulaPart::Variable(v) => {
                    let value = resolve(part)?;
                    stack.push(if v.negative { -value } else { value });
                }
                FormulaPart::Literal(_) => stack.push(resolve(part)?),
            }
        }

        match stack.as_slice() {
            [value] => Ok(*value),
            _ => Err(FormulaError::MissingOperand(self.source.clone()).into()),
        }
    }
}

impl fmt::Display for FormulaExpression {
    /// Postfix rendering, space separated
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        f.write_str(&parts.join(" "))
    }
}
