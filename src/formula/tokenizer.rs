//! Formula tokenizer

/// Class of the previously emitted token, driving unary sign detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Start,
    Operand,
    Operator,
    OpenParen,
    CloseParen,
}

impl TokenClass {
    /// A `+`/`-` seen in this state is a sign, not a binary operator
    pub fn expects_operand(&self) -> bool {
        matches!(self, TokenClass::Start | TokenClass::Operator | TokenClass::OpenParen)
    }
}

/// True for characters that always form a token of their own
pub fn is_separator(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '^' | '(' | ')')
}

/// Split an infix expression into tokens.
///
/// Each of `+ - * / ^ ( )` is its own token and runs of other characters are
/// coalesced. A quoted literal (`'...'` or `"..."`) is kept whole, quotes
/// included. Whitespace separates tokens and is dropped.
pub fn split_formula(formula: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in formula.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        if c == '\'' || c == '"' {
            quote = Some(c);
            current.push(c);
        } else if is_separator(c) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(c.to_string());
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
